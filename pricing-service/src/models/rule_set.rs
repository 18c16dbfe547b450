//! A single campground's rules, loaded together for evaluation.

use service_core::error::AppError;
use uuid::Uuid;

use super::{
    Blackout, PricingRule, Promotion, RuleEntity, SeasonalRate, StayRule, TaxRule,
};

/// Read-only snapshot handed to the evaluator and the constraint checker.
/// Every row belongs to `campground_id`.
#[derive(Debug, Clone)]
pub struct RuleSet {
    campground_id: Uuid,
    pub pricing_rules: Vec<PricingRule>,
    pub tax_rules: Vec<TaxRule>,
    pub seasonal_rates: Vec<SeasonalRate>,
    pub stay_rules: Vec<StayRule>,
    pub blackouts: Vec<Blackout>,
    pub promotions: Vec<Promotion>,
}

impl RuleSet {
    /// Assemble a rule set, refusing rows that belong to another campground.
    pub fn assemble(
        campground_id: Uuid,
        pricing_rules: Vec<PricingRule>,
        tax_rules: Vec<TaxRule>,
        seasonal_rates: Vec<SeasonalRate>,
        stay_rules: Vec<StayRule>,
        blackouts: Vec<Blackout>,
        promotions: Vec<Promotion>,
    ) -> Result<Self, AppError> {
        ensure_tenant(campground_id, &pricing_rules)?;
        ensure_tenant(campground_id, &tax_rules)?;
        ensure_tenant(campground_id, &seasonal_rates)?;
        ensure_tenant(campground_id, &stay_rules)?;
        ensure_tenant(campground_id, &blackouts)?;
        ensure_tenant(campground_id, &promotions)?;
        Ok(Self {
            campground_id,
            pricing_rules,
            tax_rules,
            seasonal_rates,
            stay_rules,
            blackouts,
            promotions,
        })
    }

    pub fn campground_id(&self) -> Uuid {
        self.campground_id
    }

    pub fn promotion_by_code(&self, code: &str) -> Option<&Promotion> {
        self.promotions.iter().find(|p| p.code == code)
    }
}

fn ensure_tenant<T: RuleEntity>(campground_id: Uuid, rows: &[T]) -> Result<(), AppError> {
    match rows.iter().find(|r| r.campground_id() != campground_id) {
        Some(row) => Err(AppError::Forbidden(anyhow::anyhow!(
            "Rule {} belongs to a different campground",
            row.id()
        ))),
        None => Ok(()),
    }
}
