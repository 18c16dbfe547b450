//! Constraint checker: decides whether a stay may be booked.
//!
//! Checks run in a fixed order (blackouts, stay length, promotion) and the
//! first failure is the one reported.

use chrono::NaiveDate;
use service_core::error::AppError;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::models::{normalize_code, Promotion, RuleSet, Stay, Violation};

/// Campground-wide stay limits used when no stay rule matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StayDefaults {
    pub min_nights: i32,
    pub max_nights: i32,
}

impl Default for StayDefaults {
    fn default() -> Self {
        Self {
            min_nights: 1,
            max_nights: 28,
        }
    }
}

impl StayDefaults {
    pub fn new(min_nights: i32, max_nights: i32) -> Result<Self, AppError> {
        if min_nights < 1 || min_nights > max_nights {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "Default stay limits must satisfy 1 <= min ({}) <= max ({})",
                min_nights,
                max_nights
            )));
        }
        Ok(Self {
            min_nights,
            max_nights,
        })
    }
}

#[derive(Debug, Clone)]
pub struct AdmissionRequest {
    pub site_class_id: Option<String>,
    pub site_id: Option<String>,
    pub stay: Stay,
    pub lead_time_days: i64,
    pub promotion_code: Option<String>,
    /// Date promotion windows are checked against.
    pub as_of: NaiveDate,
}

/// Effective `[min, max]` nights and the rules that produced each bound.
/// `None` sources mean the campground default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NightBounds {
    pub min_nights: i32,
    pub max_nights: i32,
    pub min_rule_id: Option<Uuid>,
    pub max_rule_id: Option<Uuid>,
    /// Every stay rule that contributed to the bounds.
    pub rule_ids: Vec<Uuid>,
}

#[derive(Debug, Clone)]
pub struct AdmissionDecision {
    pub bounds: NightBounds,
    pub outcome: Result<Option<Promotion>, Violation>,
}

impl AdmissionDecision {
    pub fn admitted(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// First active closure that covers the requested site and any stayed night.
pub fn check_blackouts(
    rules: &RuleSet,
    site_id: Option<&str>,
    site_class_id: Option<&str>,
    stay: &Stay,
) -> Result<(), Violation> {
    match rules
        .blackouts
        .iter()
        .find(|b| b.is_active && b.overlaps(stay) && b.applies_to(site_id, site_class_id))
    {
        Some(blackout) => Err(Violation::Blackout {
            blackout_id: blackout.id,
            start_date: blackout.start_date,
            end_date: blackout.end_date,
            reason: blackout.reason,
        }),
        None => Ok(()),
    }
}

/// Intersect the bounds of every active, in-scope, non-bypassed stay rule.
pub fn effective_bounds(
    rules: &RuleSet,
    site_class_id: Option<&str>,
    stay: &Stay,
    lead_time_days: i64,
    defaults: StayDefaults,
) -> NightBounds {
    let mut bounds: Option<NightBounds> = None;

    for rule in rules.stay_rules.iter().filter(|r| r.is_active) {
        if !rule.applies_to(site_class_id, stay) {
            continue;
        }
        if rule.bypassed_for(lead_time_days) {
            debug!(stay_rule_id = %rule.id, lead_time_days, "Stay rule bypassed for short lead time");
            continue;
        }
        match bounds.as_mut() {
            None => {
                bounds = Some(NightBounds {
                    min_nights: rule.min_nights,
                    max_nights: rule.max_nights,
                    min_rule_id: Some(rule.id),
                    max_rule_id: Some(rule.id),
                    rule_ids: vec![rule.id],
                });
            }
            Some(b) => {
                if rule.min_nights > b.min_nights {
                    b.min_nights = rule.min_nights;
                    b.min_rule_id = Some(rule.id);
                }
                if rule.max_nights < b.max_nights {
                    b.max_nights = rule.max_nights;
                    b.max_rule_id = Some(rule.id);
                }
                b.rule_ids.push(rule.id);
            }
        }
    }

    bounds.unwrap_or(NightBounds {
        min_nights: defaults.min_nights,
        max_nights: defaults.max_nights,
        min_rule_id: None,
        max_rule_id: None,
        rule_ids: Vec::new(),
    })
}

pub fn check_stay_length(bounds: &NightBounds, nights: i64) -> Result<(), Violation> {
    if nights < bounds.min_nights as i64 {
        return Err(Violation::StayTooShort {
            nights,
            min_nights: bounds.min_nights,
            rule_id: bounds.min_rule_id,
        });
    }
    if nights > bounds.max_nights as i64 {
        return Err(Violation::StayTooLong {
            nights,
            max_nights: bounds.max_nights,
            rule_id: bounds.max_rule_id,
        });
    }
    Ok(())
}

/// Look up a code and check it is currently redeemable.
pub fn check_promotion<'a>(
    rules: &'a RuleSet,
    code: &str,
    as_of: NaiveDate,
) -> Result<&'a Promotion, Violation> {
    let code = normalize_code(code);
    let promotion = rules
        .promotion_by_code(&code)
        .ok_or_else(|| Violation::PromotionUnknown { code: code.clone() })?;
    promotion.check_redeemable(as_of)?;
    Ok(promotion)
}

/// Run every check in order. Bounds are always reported, even on rejection.
#[instrument(
    skip(rules, request),
    fields(campground_id = %rules.campground_id(), nights = request.stay.nights())
)]
pub fn admit(
    rules: &RuleSet,
    request: &AdmissionRequest,
    defaults: StayDefaults,
) -> AdmissionDecision {
    let site_class = request.site_class_id.as_deref();
    let bounds = effective_bounds(
        rules,
        site_class,
        &request.stay,
        request.lead_time_days,
        defaults,
    );

    let outcome = check_blackouts(rules, request.site_id.as_deref(), site_class, &request.stay)
        .and_then(|_| check_stay_length(&bounds, request.stay.nights()))
        .and_then(|_| {
            request
                .promotion_code
                .as_deref()
                .filter(|code| !code.trim().is_empty())
                .map(|code| check_promotion(rules, code, request.as_of).cloned())
                .transpose()
        });

    match &outcome {
        Ok(_) => debug!("Stay admitted"),
        Err(violation) => debug!(violation = violation.kind(), "Stay rejected"),
    }

    AdmissionDecision { bounds, outcome }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        Blackout, ClosureReason, DateRange, NewBlackout, NewPromotion, NewStayRule,
        PromotionType, StayRule,
    };
    use rust_decimal::Decimal;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn request(site_class: &str, nights: i64, lead_time_days: i64) -> AdmissionRequest {
        let arrival = date("2026-07-10");
        AdmissionRequest {
            site_class_id: Some(site_class.to_string()),
            site_id: Some("A1".to_string()),
            stay: Stay::new(arrival, arrival + chrono::Duration::days(nights)).unwrap(),
            lead_time_days,
            promotion_code: None,
            as_of: date("2026-06-20"),
        }
    }

    fn rv_rule(cg: Uuid) -> StayRule {
        StayRule::new(
            cg,
            NewStayRule {
                name: "RV minimum".to_string(),
                min_nights: 7,
                max_nights: 21,
                site_classes: vec!["RV".to_string()],
                date_ranges: vec![],
                ignore_days_before: 14,
                is_active: true,
            },
        )
        .unwrap()
    }

    fn park_wide_closure(cg: Uuid) -> Blackout {
        Blackout::new(
            cg,
            NewBlackout {
                site_id: None,
                site_class_ids: vec![],
                start_date: date("2026-07-01"),
                end_date: date("2026-07-31"),
                reason: ClosureReason::Maintenance,
                note: Some("Water main".to_string()),
                is_active: true,
            },
        )
        .unwrap()
    }

    fn set(
        cg: Uuid,
        stay_rules: Vec<StayRule>,
        blackouts: Vec<Blackout>,
        promotions: Vec<Promotion>,
    ) -> RuleSet {
        RuleSet::assemble(cg, vec![], vec![], vec![], stay_rules, blackouts, promotions).unwrap()
    }

    #[test]
    fn test_defaults_apply_without_stay_rules() {
        let cg = Uuid::new_v4();
        let decision = admit(&set(cg, vec![], vec![], vec![]), &request("TENT", 3, 20), StayDefaults::default());
        assert!(decision.admitted());
        assert_eq!((decision.bounds.min_nights, decision.bounds.max_nights), (1, 28));
        assert!(decision.bounds.rule_ids.is_empty());
    }

    #[test]
    fn test_rv_rule_enforced_unless_bypassed() {
        let cg = Uuid::new_v4();
        let rule = rv_rule(cg);
        let rules = set(cg, vec![rule.clone()], vec![], vec![]);

        let decision = admit(&rules, &request("RV", 3, 20), StayDefaults::default());
        assert_eq!(
            decision.outcome.unwrap_err(),
            Violation::StayTooShort {
                nights: 3,
                min_nights: 7,
                rule_id: Some(rule.id)
            }
        );

        let decision = admit(&rules, &request("RV", 3, 5), StayDefaults::default());
        assert!(decision.admitted());
        assert_eq!((decision.bounds.min_nights, decision.bounds.max_nights), (1, 28));
    }

    #[test]
    fn test_bounds_intersect_tightest() {
        let cg = Uuid::new_v4();
        let rv = rv_rule(cg);
        let mut peak = rv_rule(cg);
        peak.id = Uuid::new_v4();
        peak.min_nights = 3;
        peak.max_nights = 14;
        peak.site_classes = vec![];
        peak.date_ranges = vec![DateRange::new(date("2026-07-01"), date("2026-07-31"))];
        let rules = set(cg, vec![rv.clone(), peak.clone()], vec![], vec![]);

        let bounds = effective_bounds(
            &rules,
            Some("RV"),
            &request("RV", 10, 30).stay,
            30,
            StayDefaults::default(),
        );
        assert_eq!((bounds.min_nights, bounds.max_nights), (7, 14));
        assert_eq!(bounds.min_rule_id, Some(rv.id));
        assert_eq!(bounds.max_rule_id, Some(peak.id));

        let decision = admit(&rules, &request("RV", 15, 30), StayDefaults::default());
        assert!(matches!(
            decision.outcome,
            Err(Violation::StayTooLong { max_nights: 14, .. })
        ));
    }

    #[test]
    fn test_blackout_takes_precedence() {
        let cg = Uuid::new_v4();
        let closure = park_wide_closure(cg);
        let rules = set(cg, vec![], vec![closure.clone()], vec![]);
        let decision = admit(&rules, &request("TENT", 3, 20), StayDefaults::default());
        match decision.outcome {
            Err(Violation::Blackout { blackout_id, .. }) => assert_eq!(blackout_id, closure.id),
            other => panic!("expected blackout, got {other:?}"),
        }
    }

    #[test]
    fn test_inactive_or_other_site_blackout_ignored() {
        let cg = Uuid::new_v4();
        let mut off = park_wide_closure(cg);
        off.is_active = false;
        let mut other_site = park_wide_closure(cg);
        other_site.id = Uuid::new_v4();
        other_site.site_id = Some("B7".to_string());
        let rules = set(cg, vec![], vec![off, other_site], vec![]);
        assert!(admit(&rules, &request("TENT", 3, 20), StayDefaults::default()).admitted());
    }

    fn summer20(cg: Uuid, usage_count: i32) -> Promotion {
        let mut promo = Promotion::new(
            cg,
            NewPromotion {
                code: "SUMMER20".to_string(),
                promotion_type: PromotionType::Percentage,
                value: Decimal::from(20),
                valid_from: None,
                valid_to: None,
                usage_limit: Some(5),
                is_active: true,
                description: None,
            },
        )
        .unwrap();
        promo.usage_count = usage_count;
        promo
    }

    #[test]
    fn test_exhausted_promotion_rejected() {
        let cg = Uuid::new_v4();
        let rules = set(cg, vec![], vec![], vec![summer20(cg, 5)]);
        let mut req = request("TENT", 3, 20);
        req.promotion_code = Some("summer20".to_string());
        let decision = admit(&rules, &req, StayDefaults::default());
        assert_eq!(
            decision.outcome.unwrap_err(),
            Violation::PromotionUsageLimitExceeded {
                code: "SUMMER20".to_string(),
                usage_limit: 5
            }
        );
    }

    #[test]
    fn test_valid_promotion_carried_on_admission() {
        let cg = Uuid::new_v4();
        let rules = set(cg, vec![], vec![], vec![summer20(cg, 2)]);
        let mut req = request("TENT", 3, 20);
        req.promotion_code = Some(" Summer20 ".to_string());
        let decision = admit(&rules, &req, StayDefaults::default());
        let promotion = decision.outcome.unwrap().unwrap();
        assert_eq!(promotion.code, "SUMMER20");

        req.promotion_code = Some("WINTER".to_string());
        assert!(matches!(
            admit(&rules, &req, StayDefaults::default()).outcome,
            Err(Violation::PromotionUnknown { .. })
        ));
    }

    #[test]
    fn test_defaults_validated() {
        assert!(StayDefaults::new(0, 28).is_err());
        assert!(StayDefaults::new(10, 5).is_err());
        assert_eq!(StayDefaults::new(1, 28).unwrap(), StayDefaults::default());
    }
}
