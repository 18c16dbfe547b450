//! Domain models for pricing-service.

mod blackout;
mod common;
mod pricing_rule;
mod promotion;
mod quote;
mod rule_set;
mod seasonal_rate;
mod stay_rule;
mod tax_rule;
mod violation;

use uuid::Uuid;

pub use blackout::{
    Blackout, BlackoutPatch, BlackoutStatus, ClosureReason, NewBlackout,
};
pub(crate) use common::validate_cents;
pub use common::{DateRange, DowMask, Stay, MAX_AMOUNT_CENTS, MAX_PERCENT_FRACTION};
pub use pricing_rule::{
    AdjustmentType, NewPricingRule, PricingRule, PricingRulePatch, PricingRuleType, StackMode,
    Temporal,
};
pub use promotion::{normalize_code, NewPromotion, Promotion, PromotionPatch, PromotionType};
pub use quote::{AppliedPromotion, NightlyRate, Quote, TaxLine};
pub use rule_set::RuleSet;
pub use seasonal_rate::{NewSeasonalRate, RateType, SeasonalRate, SeasonalRatePatch};
pub use stay_rule::{NewStayRule, StayRule, StayRulePatch};
pub use tax_rule::{NewTaxRule, TaxRule, TaxRulePatch, TaxRuleType};
pub use violation::Violation;

/// Common surface of every tenant-scoped rule row.
pub trait RuleEntity: Clone + Send + Sync + 'static {
    fn id(&self) -> Uuid;
    fn campground_id(&self) -> Uuid;
    fn is_active(&self) -> bool;
}

/// Filters accepted by every list operation.
#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    pub active: Option<bool>,
    /// Pricing rules only.
    pub site_class_id: Option<String>,
    /// Blackouts only; evaluated against `today`.
    pub status: Option<BlackoutStatus>,
}

impl ListFilter {
    pub fn active(active: bool) -> Self {
        Self {
            active: Some(active),
            ..Default::default()
        }
    }

    pub fn admits<T: RuleEntity>(&self, row: &T) -> bool {
        self.active.map_or(true, |active| row.is_active() == active)
    }
}
