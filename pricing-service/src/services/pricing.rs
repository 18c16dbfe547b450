//! Rule evaluator: composes pricing rules night by night, then applies the
//! promotion discount and taxes to produce a quote.
//!
//! Evaluation is pure. It reads a [`RuleSet`] and never mutates rule rows.

use chrono::{NaiveDate, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use service_core::error::AppError;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::models::{
    validate_cents, AdjustmentType, AppliedPromotion, NightlyRate, PricingRule, Promotion, Quote,
    RuleSet, StackMode, Stay, TaxLine, TaxRule, TaxRuleType, Temporal,
};

/// Everything the evaluator needs to know about the requested stay.
#[derive(Debug, Clone)]
pub struct PricingRequest {
    pub site_class_id: Option<String>,
    pub site_id: Option<String>,
    pub stay: Stay,
    pub lead_time_days: i64,
    pub occupancy_fraction: Option<Decimal>,
    /// Explicit nightly base. When absent, active nightly seasonal rates
    /// supply it.
    pub base_rate_cents: Option<i64>,
    pub tax_waiver_signed: bool,
}

/// Round a cent amount half away from zero.
pub(crate) fn round_cents(amount: Decimal) -> i64 {
    amount
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .unwrap_or(if amount.is_sign_negative() { i64::MIN } else { i64::MAX })
}

/// Active rules with a well-formed temporal predicate, ordered by priority
/// ascending. The sort is stable, so equal priorities keep creation order.
fn candidate_rules(rules: &[PricingRule]) -> Vec<(&PricingRule, Temporal)> {
    let mut candidates: Vec<(&PricingRule, Temporal)> = rules
        .iter()
        .filter(|rule| rule.active)
        .filter_map(|rule| match rule.temporal() {
            Ok(temporal) => Some((rule, temporal)),
            Err(e) => {
                warn!(rule_id = %rule.id, error = %e, "Skipping malformed pricing rule");
                None
            }
        })
        .collect();
    candidates.sort_by_key(|(rule, _)| rule.priority);
    candidates
}

/// Amounts beyond what the rule bounds allow; only reachable through rows
/// written before those bounds existed.
fn out_of_range(what: &str) -> AppError {
    AppError::BadRequest(anyhow::anyhow!("{} is out of range", what))
}

/// Tightest cap so far and the rule that set it. Ties keep the earlier rule.
fn tighten(
    current: &mut Option<(i64, Uuid)>,
    cap: i64,
    rule_id: Uuid,
    tighter: fn(i64, i64) -> bool,
) {
    match current {
        Some((value, _)) if !tighter(cap, *value) => {}
        _ => *current = Some((cap, rule_id)),
    }
}

/// Compose the adjustment for one night.
///
/// Percent rules contribute `base * value`, flat rules `value` cents, so
/// `base * (1 + total)` and `base + total` both reduce to `base + sum`.
/// Caps come from every matching rule (tightest wins) and bound the final
/// rate, which never drops below zero. A cap that changed the rate is
/// credited to its rule in `cap_rule_ids`.
fn compose_night(
    candidates: &[(&PricingRule, Temporal)],
    site_class_id: Option<&str>,
    night: NaiveDate,
    base_cents: i64,
) -> Result<NightlyRate, AppError> {
    let base = Decimal::from(base_cents);
    let mut total = Decimal::ZERO;
    let mut applied: Vec<Uuid> = Vec::new();
    let mut min_cap: Option<(i64, Uuid)> = None;
    let mut max_cap: Option<(i64, Uuid)> = None;

    for (rule, temporal) in candidates {
        if !rule.applies_to_site_class(site_class_id) || !temporal.matches(night) {
            continue;
        }
        if let Some(cap) = rule.min_rate_cap_cents {
            tighten(&mut min_cap, cap, rule.id, |new, old| new > old);
        }
        if let Some(cap) = rule.max_rate_cap_cents {
            tighten(&mut max_cap, cap, rule.id, |new, old| new < old);
        }
        // zero is an explicit no-op
        if rule.adjustment_value.is_zero() {
            continue;
        }

        let contribution = match rule.adjustment_type {
            AdjustmentType::Percent => base
                .checked_mul(rule.adjustment_value)
                .ok_or_else(|| out_of_range("Pricing adjustment"))?,
            AdjustmentType::Flat => rule.adjustment_value,
        };

        match rule.stack_mode {
            StackMode::Additive => {
                total = total
                    .checked_add(contribution)
                    .ok_or_else(|| out_of_range("Pricing adjustment"))?;
                applied.push(rule.id);
            }
            StackMode::Max => {
                if contribution.abs() > total.abs() {
                    total = contribution;
                    applied.clear();
                    applied.push(rule.id);
                }
            }
            StackMode::Override => {
                total = contribution;
                applied.clear();
                applied.push(rule.id);
            }
        }
    }

    let adjustment_cents = round_cents(total);
    let composed = base_cents.saturating_add(adjustment_cents);
    let mut rate = composed;
    let mut cap_rule_ids = Vec::new();
    if let Some((min, rule_id)) = min_cap {
        if rate < min {
            rate = min;
            cap_rule_ids.push(rule_id);
        }
    }
    if let Some((max, rule_id)) = max_cap {
        if rate > max {
            rate = max;
            cap_rule_ids.push(rule_id);
        }
    }
    rate = rate.max(0);

    Ok(NightlyRate {
        date: night,
        base_cents,
        adjustment_cents,
        rate_cents: rate,
        capped: rate != composed,
        applied_rule_ids: applied,
        cap_rule_ids,
    })
}

/// Checked sum of cent amounts.
fn sum_cents(amounts: impl IntoIterator<Item = i64>, what: &str) -> Result<i64, AppError> {
    amounts
        .into_iter()
        .try_fold(0i64, |acc, amount| acc.checked_add(amount))
        .ok_or_else(|| out_of_range(what))
}

/// Nightly base for `night`: the explicit rate, else the first active
/// nightly seasonal rate covering it.
fn resolve_base_rate(
    rules: &RuleSet,
    explicit: Option<i64>,
    night: NaiveDate,
    nights: i64,
) -> Result<i64, AppError> {
    if let Some(base) = explicit {
        return Ok(base);
    }
    rules
        .seasonal_rates
        .iter()
        .find(|rate| rate.covers(night, nights))
        .map(|rate| rate.amount_cents)
        .ok_or_else(|| {
            AppError::BadRequest(anyhow::anyhow!(
                "No base rate for {}: pass baseRateCents or configure a nightly seasonal rate",
                night
            ))
        })
}

/// Whether a base rate can be resolved for every night of the stay.
pub fn has_base_rate(rules: &RuleSet, request: &PricingRequest) -> bool {
    let nights = request.stay.nights();
    request.stay.each_night().all(|night| {
        resolve_base_rate(rules, request.base_rate_cents, night, nights).is_ok()
    })
}

/// Taxes for a stay. A matching exemption waives everything unless it
/// needs a signed waiver the guest has not given.
fn evaluate_taxes(
    tax_rules: &[TaxRule],
    nights: i64,
    taxable_cents: i64,
    waiver_signed: bool,
) -> Result<(Vec<TaxLine>, Option<Uuid>), AppError> {
    let matching: Vec<&TaxRule> = tax_rules
        .iter()
        .filter(|rule| rule.is_active && rule.applies_to_length(nights))
        .collect();

    let exemption = matching.iter().find(|rule| {
        rule.rule_type == TaxRuleType::Exemption && (!rule.requires_waiver || waiver_signed)
    });
    if let Some(exemption) = exemption {
        debug!(tax_rule_id = %exemption.id, "Stay is tax exempt");
        return Ok((Vec::new(), Some(exemption.id)));
    }

    let mut lines = Vec::with_capacity(matching.len());
    for rule in matching {
        let amount_cents = match (rule.rule_type, rule.rate) {
            (TaxRuleType::Percentage, Some(rate)) => round_cents(
                Decimal::from(taxable_cents)
                    .checked_mul(rate)
                    .ok_or_else(|| out_of_range("Tax amount"))?
                    / Decimal::ONE_HUNDRED,
            ),
            (TaxRuleType::Flat, Some(rate)) => round_cents(rate),
            (TaxRuleType::Exemption, _) => continue,
            (_, None) => {
                warn!(tax_rule_id = %rule.id, "Skipping tax rule without a rate");
                continue;
            }
        };
        lines.push(TaxLine {
            tax_rule_id: rule.id,
            name: rule.name.clone(),
            rule_type: rule.rule_type,
            rate: rule.rate,
            amount_cents,
        });
    }
    Ok((lines, None))
}

/// Price a stay against a campground's rules.
///
/// `promotion` must already have been validated by the caller.
#[instrument(
    skip(rules, request, promotion),
    fields(campground_id = %rules.campground_id(), nights = request.stay.nights())
)]
pub fn price_stay(
    rules: &RuleSet,
    request: &PricingRequest,
    promotion: Option<&Promotion>,
) -> Result<Quote, AppError> {
    if let Some(base) = request.base_rate_cents {
        validate_cents("baseRateCents", base)?;
    }

    let nights = request.stay.nights();
    let candidates = candidate_rules(&rules.pricing_rules);
    let site_class = request.site_class_id.as_deref();

    let nightly = request
        .stay
        .each_night()
        .map(|night| {
            let base = resolve_base_rate(rules, request.base_rate_cents, night, nights)?;
            compose_night(&candidates, site_class, night, base)
        })
        .collect::<Result<Vec<_>, AppError>>()?;

    let subtotal_cents = sum_cents(nightly.iter().map(|n| n.rate_cents), "Stay subtotal")?;

    let applied_promotion = promotion.map(|promo| AppliedPromotion {
        promotion_id: promo.id,
        code: promo.code.clone(),
        discount_cents: promo.discount_cents(subtotal_cents),
    });
    let discount_cents = applied_promotion
        .as_ref()
        .map_or(0, |p| p.discount_cents);
    let taxable_cents = subtotal_cents - discount_cents;

    let (taxes, tax_exemption_rule_id) = evaluate_taxes(
        &rules.tax_rules,
        nights,
        taxable_cents,
        request.tax_waiver_signed,
    )?;
    let tax_total_cents = sum_cents(taxes.iter().map(|t| t.amount_cents), "Tax total")?;
    let total_cents = sum_cents([taxable_cents, tax_total_cents], "Quote total")?;
    let average_nightly_cents = round_cents(Decimal::from(subtotal_cents) / Decimal::from(nights));

    let quote = Quote {
        id: Uuid::new_v4(),
        campground_id: rules.campground_id(),
        site_class_id: request.site_class_id.clone(),
        site_id: request.site_id.clone(),
        arrival_date: request.stay.arrival,
        departure_date: request.stay.departure,
        nights,
        lead_time_days: request.lead_time_days,
        occupancy_fraction: request.occupancy_fraction,
        nightly,
        subtotal_cents,
        promotion: applied_promotion,
        discount_cents,
        taxes,
        tax_exemption_rule_id,
        tax_total_cents,
        total_cents,
        average_nightly_cents,
        created_utc: Utc::now(),
    };

    debug!(
        subtotal_cents = quote.subtotal_cents,
        total_cents = quote.total_cents,
        "Stay priced"
    );
    Ok(quote)
}
