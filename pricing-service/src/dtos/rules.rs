//! Create/update payloads and responses for the rule families.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use validator::Validate;

use super::{default_true, double_option};
use crate::models::{
    AdjustmentType, Blackout, BlackoutPatch, BlackoutStatus, ClosureReason, DateRange, DowMask,
    NewBlackout, NewPricingRule, NewPromotion, NewSeasonalRate, NewStayRule, NewTaxRule,
    PricingRule, PricingRulePatch, PricingRuleType, Promotion, PromotionPatch, PromotionType,
    RateType, SeasonalRate, SeasonalRatePatch, StackMode, StayRulePatch, TaxRule, TaxRulePatch,
    TaxRuleType,
};
use crate::services::canonical::{
    cents, from_canonical, from_canonical_signed, to_canonical, to_canonical_signed, Direction,
    ValueUnit,
};

/// Pick the canonical value or compile the human entry. Sending both is
/// ambiguous and rejected.
fn compile(
    field: &str,
    canonical: Option<Decimal>,
    entry: Option<&str>,
    unit: ValueUnit,
) -> Result<Option<Decimal>, AppError> {
    match (canonical, entry) {
        (Some(_), Some(_)) => Err(AppError::BadRequest(anyhow::anyhow!(
            "Send either {} or {}Entry, not both",
            field,
            field
        ))),
        (Some(value), None) => Ok(Some(value)),
        (None, Some(raw)) => to_canonical(unit, raw).map(Some),
        (None, None) => Ok(None),
    }
}

fn required<T>(value: Option<T>, field: &str) -> Result<T, AppError> {
    value.ok_or_else(|| {
        AppError::BadRequest(anyhow::anyhow!("{} or {}Entry is required", field, field))
    })
}

fn tax_unit(rule_type: TaxRuleType) -> ValueUnit {
    match rule_type {
        TaxRuleType::Flat => ValueUnit::Cents,
        TaxRuleType::Percentage | TaxRuleType::Exemption => ValueUnit::WholePercent,
    }
}

fn adjustment_unit(adjustment_type: AdjustmentType) -> ValueUnit {
    match adjustment_type {
        AdjustmentType::Percent => ValueUnit::PercentFraction,
        AdjustmentType::Flat => ValueUnit::Cents,
    }
}

fn promotion_unit(promotion_type: PromotionType) -> ValueUnit {
    match promotion_type {
        PromotionType::Percentage => ValueUnit::WholePercent,
        PromotionType::Flat => ValueUnit::Cents,
    }
}

fn compile_adjustment(
    canonical: Option<Decimal>,
    entry: Option<&str>,
    direction: Option<Direction>,
    adjustment_type: AdjustmentType,
) -> Result<Option<Decimal>, AppError> {
    let unit = adjustment_unit(adjustment_type);
    match (entry, direction) {
        (Some(raw), Some(direction)) if canonical.is_none() => {
            to_canonical_signed(unit, raw, direction).map(Some)
        }
        _ => compile("adjustmentValue", canonical, entry, unit),
    }
}

// =============================================================================
// Tax rules
// =============================================================================

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaxRuleRequest {
    #[validate(length(min = 1, max = 200, message = "Name is required"))]
    pub name: String,
    #[serde(rename = "type")]
    pub rule_type: TaxRuleType,
    pub rate: Option<Decimal>,
    pub rate_entry: Option<String>,
    #[validate(range(min = 1, message = "minNights must be at least 1"))]
    pub min_nights: Option<i32>,
    #[validate(range(min = 1, message = "maxNights must be at least 1"))]
    pub max_nights: Option<i32>,
    #[serde(default)]
    pub requires_waiver: bool,
    pub waiver_text: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl CreateTaxRuleRequest {
    pub fn into_new(self) -> Result<NewTaxRule, AppError> {
        let rate = compile(
            "rate",
            self.rate,
            self.rate_entry.as_deref(),
            tax_unit(self.rule_type),
        )?;
        Ok(NewTaxRule {
            name: self.name,
            rule_type: self.rule_type,
            rate,
            min_nights: self.min_nights,
            max_nights: self.max_nights,
            requires_waiver: self.requires_waiver,
            waiver_text: self.waiver_text,
            is_active: self.is_active,
        })
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaxRuleRequest {
    #[validate(length(min = 1, max = 200, message = "Name cannot be blank"))]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub rule_type: Option<TaxRuleType>,
    #[serde(default, deserialize_with = "double_option")]
    pub rate: Option<Option<Decimal>>,
    pub rate_entry: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub min_nights: Option<Option<i32>>,
    #[serde(default, deserialize_with = "double_option")]
    pub max_nights: Option<Option<i32>>,
    pub requires_waiver: Option<bool>,
    #[serde(default, deserialize_with = "double_option")]
    pub waiver_text: Option<Option<String>>,
    pub is_active: Option<bool>,
}

impl UpdateTaxRuleRequest {
    /// The entry is compiled against the type the rule will have after
    /// the update.
    pub fn into_patch(self, current: &TaxRule) -> Result<TaxRulePatch, AppError> {
        let unit = tax_unit(self.rule_type.unwrap_or(current.rule_type));
        let rate = match (self.rate, self.rate_entry.as_deref()) {
            (None, Some(raw)) => Some(Some(to_canonical(unit, raw)?)),
            (Some(_), Some(_)) => {
                return Err(AppError::BadRequest(anyhow::anyhow!(
                    "Send either rate or rateEntry, not both"
                )));
            }
            (rate, None) => rate,
        };
        Ok(TaxRulePatch {
            name: self.name,
            rule_type: self.rule_type,
            rate,
            min_nights: self.min_nights,
            max_nights: self.max_nights,
            requires_waiver: self.requires_waiver,
            waiver_text: self.waiver_text,
            is_active: self.is_active,
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxRuleResponse {
    #[serde(flatten)]
    pub rule: TaxRule,
    /// The rate as staff would type it: "7.5" percent or "2.50" dollars.
    pub display: Option<String>,
}

impl From<TaxRule> for TaxRuleResponse {
    fn from(rule: TaxRule) -> Self {
        let display = rule
            .rate
            .map(|rate| from_canonical(tax_unit(rule.rule_type), rate));
        Self { rule, display }
    }
}

// =============================================================================
// Pricing rules
// =============================================================================

fn default_stack_mode() -> StackMode {
    StackMode::Additive
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePricingRuleRequest {
    #[validate(length(min = 1, max = 200, message = "Name is required"))]
    pub name: String,
    #[serde(rename = "type")]
    pub rule_type: PricingRuleType,
    #[serde(default)]
    pub priority: i32,
    #[serde(default = "default_stack_mode")]
    pub stack_mode: StackMode,
    pub adjustment_type: AdjustmentType,
    pub adjustment_value: Option<Decimal>,
    /// Unsigned human value ("10" for ten percent, "15.00" for fifteen
    /// dollars) combined with `direction`.
    pub adjustment_entry: Option<String>,
    pub direction: Option<Direction>,
    pub site_class_id: Option<String>,
    pub dow_mask: Option<DowMask>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    #[validate(range(min = 0, message = "minRateCapCents cannot be negative"))]
    pub min_rate_cap_cents: Option<i64>,
    #[validate(range(min = 0, message = "maxRateCapCents cannot be negative"))]
    pub max_rate_cap_cents: Option<i64>,
    #[serde(default = "default_true")]
    pub active: bool,
}

impl CreatePricingRuleRequest {
    pub fn into_new(self) -> Result<NewPricingRule, AppError> {
        let adjustment_value = required(
            compile_adjustment(
                self.adjustment_value,
                self.adjustment_entry.as_deref(),
                self.direction,
                self.adjustment_type,
            )?,
            "adjustmentValue",
        )?;
        Ok(NewPricingRule {
            name: self.name,
            rule_type: self.rule_type,
            priority: self.priority,
            stack_mode: self.stack_mode,
            adjustment_type: self.adjustment_type,
            adjustment_value,
            site_class_id: self.site_class_id,
            dow_mask: self.dow_mask,
            start_date: self.start_date,
            end_date: self.end_date,
            min_rate_cap_cents: self.min_rate_cap_cents,
            max_rate_cap_cents: self.max_rate_cap_cents,
            active: self.active,
        })
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePricingRuleRequest {
    #[validate(length(min = 1, max = 200, message = "Name cannot be blank"))]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub rule_type: Option<PricingRuleType>,
    pub priority: Option<i32>,
    pub stack_mode: Option<StackMode>,
    pub adjustment_type: Option<AdjustmentType>,
    pub adjustment_value: Option<Decimal>,
    pub adjustment_entry: Option<String>,
    pub direction: Option<Direction>,
    #[serde(default, deserialize_with = "double_option")]
    pub site_class_id: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub dow_mask: Option<Option<DowMask>>,
    #[serde(default, deserialize_with = "double_option")]
    pub start_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "double_option")]
    pub end_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "double_option")]
    pub min_rate_cap_cents: Option<Option<i64>>,
    #[serde(default, deserialize_with = "double_option")]
    pub max_rate_cap_cents: Option<Option<i64>>,
    pub active: Option<bool>,
}

impl UpdatePricingRuleRequest {
    pub fn into_patch(self, current: &PricingRule) -> Result<PricingRulePatch, AppError> {
        let adjustment_value = compile_adjustment(
            self.adjustment_value,
            self.adjustment_entry.as_deref(),
            self.direction,
            self.adjustment_type.unwrap_or(current.adjustment_type),
        )?;
        Ok(PricingRulePatch {
            name: self.name,
            rule_type: self.rule_type,
            priority: self.priority,
            stack_mode: self.stack_mode,
            adjustment_type: self.adjustment_type,
            adjustment_value,
            site_class_id: self.site_class_id,
            dow_mask: self.dow_mask,
            start_date: self.start_date,
            end_date: self.end_date,
            min_rate_cap_cents: self.min_rate_cap_cents,
            max_rate_cap_cents: self.max_rate_cap_cents,
            active: self.active,
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingRuleResponse {
    #[serde(flatten)]
    pub rule: PricingRule,
    /// Unsigned adjustment as staff typed it.
    pub display: String,
    pub direction: Direction,
}

impl From<PricingRule> for PricingRuleResponse {
    fn from(rule: PricingRule) -> Self {
        let (display, direction) =
            from_canonical_signed(adjustment_unit(rule.adjustment_type), rule.adjustment_value);
        Self {
            rule,
            display,
            direction,
        }
    }
}

// =============================================================================
// Seasonal rates
// =============================================================================

fn compile_amount(amount_cents: Option<i64>, entry: Option<&str>) -> Result<Option<i64>, AppError> {
    compile(
        "amountCents",
        amount_cents.map(Decimal::from),
        entry,
        ValueUnit::Cents,
    )?
    .map(cents)
    .transpose()
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateSeasonalRateRequest {
    #[validate(length(min = 1, max = 200, message = "Name is required"))]
    pub name: String,
    pub color: Option<String>,
    pub rate_type: RateType,
    pub amount_cents: Option<i64>,
    pub amount_entry: Option<String>,
    #[validate(range(min = 1, message = "minNights must be at least 1"))]
    pub min_nights: Option<i32>,
    #[serde(default)]
    pub date_ranges: Vec<DateRange>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl CreateSeasonalRateRequest {
    pub fn into_new(self) -> Result<NewSeasonalRate, AppError> {
        let amount_cents = required(
            compile_amount(self.amount_cents, self.amount_entry.as_deref())?,
            "amountCents",
        )?;
        Ok(NewSeasonalRate {
            name: self.name,
            color: self.color,
            rate_type: self.rate_type,
            amount_cents,
            min_nights: self.min_nights,
            date_ranges: self.date_ranges,
            is_active: self.is_active,
        })
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSeasonalRateRequest {
    #[validate(length(min = 1, max = 200, message = "Name cannot be blank"))]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub color: Option<Option<String>>,
    pub rate_type: Option<RateType>,
    pub amount_cents: Option<i64>,
    pub amount_entry: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub min_nights: Option<Option<i32>>,
    pub date_ranges: Option<Vec<DateRange>>,
    pub is_active: Option<bool>,
}

impl UpdateSeasonalRateRequest {
    pub fn into_patch(self) -> Result<SeasonalRatePatch, AppError> {
        Ok(SeasonalRatePatch {
            amount_cents: compile_amount(self.amount_cents, self.amount_entry.as_deref())?,
            name: self.name,
            color: self.color,
            rate_type: self.rate_type,
            min_nights: self.min_nights,
            date_ranges: self.date_ranges,
            is_active: self.is_active,
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeasonalRateResponse {
    #[serde(flatten)]
    pub rate: SeasonalRate,
    pub display: String,
}

impl From<SeasonalRate> for SeasonalRateResponse {
    fn from(rate: SeasonalRate) -> Self {
        let display = from_canonical(ValueUnit::Cents, Decimal::from(rate.amount_cents));
        Self { rate, display }
    }
}

// =============================================================================
// Stay rules
// =============================================================================

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateStayRuleRequest {
    #[validate(length(min = 1, max = 200, message = "Name is required"))]
    pub name: String,
    #[validate(range(min = 1, message = "minNights must be at least 1"))]
    pub min_nights: i32,
    #[validate(range(min = 1, message = "maxNights must be at least 1"))]
    pub max_nights: i32,
    #[serde(default)]
    pub site_classes: Vec<String>,
    #[serde(default)]
    pub date_ranges: Vec<DateRange>,
    #[serde(default)]
    #[validate(range(min = 0, message = "ignoreDaysBefore cannot be negative"))]
    pub ignore_days_before: i32,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl From<CreateStayRuleRequest> for NewStayRule {
    fn from(req: CreateStayRuleRequest) -> Self {
        NewStayRule {
            name: req.name,
            min_nights: req.min_nights,
            max_nights: req.max_nights,
            site_classes: req.site_classes,
            date_ranges: req.date_ranges,
            ignore_days_before: req.ignore_days_before,
            is_active: req.is_active,
        }
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStayRuleRequest {
    #[validate(length(min = 1, max = 200, message = "Name cannot be blank"))]
    pub name: Option<String>,
    pub min_nights: Option<i32>,
    pub max_nights: Option<i32>,
    pub site_classes: Option<Vec<String>>,
    pub date_ranges: Option<Vec<DateRange>>,
    pub ignore_days_before: Option<i32>,
    pub is_active: Option<bool>,
}

impl From<UpdateStayRuleRequest> for StayRulePatch {
    fn from(req: UpdateStayRuleRequest) -> Self {
        StayRulePatch {
            name: req.name,
            min_nights: req.min_nights,
            max_nights: req.max_nights,
            site_classes: req.site_classes,
            date_ranges: req.date_ranges,
            ignore_days_before: req.ignore_days_before,
            is_active: req.is_active,
        }
    }
}

// =============================================================================
// Blackouts
// =============================================================================

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateBlackoutRequest {
    pub site_id: Option<String>,
    #[serde(default)]
    pub site_class_ids: Vec<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: ClosureReason,
    #[validate(length(max = 2000, message = "Note is too long"))]
    pub note: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl From<CreateBlackoutRequest> for NewBlackout {
    fn from(req: CreateBlackoutRequest) -> Self {
        NewBlackout {
            site_id: req.site_id,
            site_class_ids: req.site_class_ids,
            start_date: req.start_date,
            end_date: req.end_date,
            reason: req.reason,
            note: req.note,
            is_active: req.is_active,
        }
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBlackoutRequest {
    #[serde(default, deserialize_with = "double_option")]
    pub site_id: Option<Option<String>>,
    pub site_class_ids: Option<Vec<String>>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub reason: Option<ClosureReason>,
    #[serde(default, deserialize_with = "double_option")]
    pub note: Option<Option<String>>,
    pub is_active: Option<bool>,
}

impl From<UpdateBlackoutRequest> for BlackoutPatch {
    fn from(req: UpdateBlackoutRequest) -> Self {
        BlackoutPatch {
            site_id: req.site_id,
            site_class_ids: req.site_class_ids,
            start_date: req.start_date,
            end_date: req.end_date,
            reason: req.reason,
            note: req.note,
            is_active: req.is_active,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlackoutResponse {
    #[serde(flatten)]
    pub blackout: Blackout,
    pub status: BlackoutStatus,
}

impl BlackoutResponse {
    pub fn new(blackout: Blackout, today: NaiveDate) -> Self {
        let status = blackout.status(today);
        Self { blackout, status }
    }
}

// =============================================================================
// Promotions
// =============================================================================

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePromotionRequest {
    #[validate(length(min = 1, max = 50, message = "Code must be 1-50 characters"))]
    pub code: String,
    #[serde(rename = "type")]
    pub promotion_type: PromotionType,
    pub value: Option<Decimal>,
    pub value_entry: Option<String>,
    pub valid_from: Option<NaiveDate>,
    pub valid_to: Option<NaiveDate>,
    #[validate(range(min = 0, message = "usageLimit cannot be negative"))]
    pub usage_limit: Option<i32>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub description: Option<String>,
}

impl CreatePromotionRequest {
    pub fn into_new(self) -> Result<NewPromotion, AppError> {
        let value = required(
            compile(
                "value",
                self.value,
                self.value_entry.as_deref(),
                promotion_unit(self.promotion_type),
            )?,
            "value",
        )?;
        Ok(NewPromotion {
            code: self.code,
            promotion_type: self.promotion_type,
            value,
            valid_from: self.valid_from,
            valid_to: self.valid_to,
            usage_limit: self.usage_limit,
            is_active: self.is_active,
            description: self.description,
        })
    }
}

/// `usageCount` is not accepted here; only redemption moves it.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePromotionRequest {
    #[validate(length(min = 1, max = 50, message = "Code must be 1-50 characters"))]
    pub code: Option<String>,
    #[serde(rename = "type")]
    pub promotion_type: Option<PromotionType>,
    pub value: Option<Decimal>,
    pub value_entry: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub valid_from: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "double_option")]
    pub valid_to: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "double_option")]
    pub usage_limit: Option<Option<i32>>,
    pub is_active: Option<bool>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
}

impl UpdatePromotionRequest {
    pub fn into_patch(self, current: &Promotion) -> Result<PromotionPatch, AppError> {
        let value = compile(
            "value",
            self.value,
            self.value_entry.as_deref(),
            promotion_unit(self.promotion_type.unwrap_or(current.promotion_type)),
        )?;
        Ok(PromotionPatch {
            code: self.code,
            promotion_type: self.promotion_type,
            value,
            valid_from: self.valid_from,
            valid_to: self.valid_to,
            usage_limit: self.usage_limit,
            is_active: self.is_active,
            description: self.description,
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PromotionResponse {
    #[serde(flatten)]
    pub promotion: Promotion,
    pub display: String,
}

impl From<Promotion> for PromotionResponse {
    fn from(promotion: Promotion) -> Self {
        let display = from_canonical(promotion_unit(promotion.promotion_type), promotion.value);
        Self { promotion, display }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_tax_rate_entry_round_trips_for_display() {
        let req: CreateTaxRuleRequest = serde_json::from_value(serde_json::json!({
            "name": "State lodging tax",
            "type": "percentage",
            "rateEntry": "7.5"
        }))
        .unwrap();
        let rule = TaxRule::new(Uuid::new_v4(), req.into_new().unwrap()).unwrap();
        assert_eq!(rule.rate, Some(dec("7.5")));

        let response = TaxRuleResponse::from(rule);
        assert_eq!(response.display.as_deref(), Some("7.5"));
    }

    #[test]
    fn test_rate_and_entry_together_are_rejected() {
        let req: CreateTaxRuleRequest = serde_json::from_value(serde_json::json!({
            "name": "Resort fee",
            "type": "flat",
            "rate": 250,
            "rateEntry": "2.50"
        }))
        .unwrap();
        assert!(matches!(req.into_new(), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_percent_off_entry_is_stored_negative() {
        let req: CreatePricingRuleRequest = serde_json::from_value(serde_json::json!({
            "name": "Early Bird",
            "type": "demand",
            "adjustmentType": "percent",
            "adjustmentEntry": "10",
            "direction": "discount"
        }))
        .unwrap();
        let new_rule = req.into_new().unwrap();
        assert_eq!(new_rule.adjustment_value, dec("-0.1"));
        assert_eq!(new_rule.stack_mode, StackMode::Additive);
        assert!(new_rule.active);

        let rule = PricingRule::new(Uuid::new_v4(), new_rule).unwrap();
        let response = PricingRuleResponse::from(rule);
        assert_eq!(response.display, "10");
        assert_eq!(response.direction, Direction::Discount);
    }

    #[test]
    fn test_pricing_rule_requires_some_value() {
        let req: CreatePricingRuleRequest = serde_json::from_value(serde_json::json!({
            "name": "Holiday",
            "type": "holiday",
            "adjustmentType": "flat"
        }))
        .unwrap();
        assert!(matches!(req.into_new(), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_amount_entry_compiles_to_cents() {
        let req: CreateSeasonalRateRequest = serde_json::from_value(serde_json::json!({
            "name": "Summer",
            "rateType": "nightly",
            "amountEntry": "$45.50",
            "dateRanges": [{ "start": "2026-06-01", "end": "2026-08-31" }]
        }))
        .unwrap();
        let new_rate = req.into_new().unwrap();
        assert_eq!(new_rate.amount_cents, 4550);

        let rate = SeasonalRate::new(Uuid::new_v4(), new_rate).unwrap();
        assert_eq!(SeasonalRateResponse::from(rate).display, "45.50");
    }

    #[test]
    fn test_update_entry_uses_the_post_update_type() {
        let rule = TaxRule::new(
            Uuid::new_v4(),
            NewTaxRule {
                name: "Lodging".to_string(),
                rule_type: TaxRuleType::Percentage,
                rate: Some(dec("5")),
                min_nights: None,
                max_nights: None,
                requires_waiver: false,
                waiver_text: None,
                is_active: true,
            },
        )
        .unwrap();
        let req = UpdateTaxRuleRequest {
            rule_type: Some(TaxRuleType::Flat),
            rate_entry: Some("3.00".to_string()),
            ..Default::default()
        };
        let patch = req.into_patch(&rule).unwrap();
        assert_eq!(patch.rate, Some(Some(dec("300"))));
    }

    #[test]
    fn test_update_without_value_leaves_it_untouched() {
        let req: UpdatePromotionRequest =
            serde_json::from_value(serde_json::json!({ "isActive": false })).unwrap();
        let promotion = Promotion::new(
            Uuid::new_v4(),
            NewPromotion {
                code: "SUMMER20".to_string(),
                promotion_type: PromotionType::Percentage,
                value: dec("20"),
                valid_from: None,
                valid_to: None,
                usage_limit: Some(5),
                is_active: true,
                description: None,
            },
        )
        .unwrap();
        let patch = req.into_patch(&promotion).unwrap();
        assert_eq!(patch.value, None);
        assert_eq!(patch.is_active, Some(false));
    }

    #[test]
    fn test_blackout_response_carries_status() {
        let blackout = Blackout::new(
            Uuid::new_v4(),
            NewBlackout {
                site_id: None,
                site_class_ids: vec![],
                start_date: NaiveDate::from_ymd_opt(2026, 7, 1).unwrap(),
                end_date: NaiveDate::from_ymd_opt(2026, 7, 4).unwrap(),
                reason: ClosureReason::Event,
                note: None,
                is_active: true,
            },
        )
        .unwrap();
        let response =
            BlackoutResponse::new(blackout, NaiveDate::from_ymd_opt(2026, 7, 2).unwrap());
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["status"], "active");
        assert_eq!(json["reason"], "event");
        assert_eq!(json["startDate"], "2026-07-01");
    }
}
