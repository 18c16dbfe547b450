//! Rule entity store abstraction.
//!
//! Every method takes the tenant's campground id and filters by it, so a row
//! owned by another campground reads as missing. Updates replace the stored
//! row wholesale (last write wins), except `usage_count` on promotions,
//! which only [`RuleStore::redeem_promotion`] moves.

use async_trait::async_trait;
use chrono::NaiveDate;
use service_core::error::AppError;
use uuid::Uuid;

use crate::models::{
    Blackout, ListFilter, PricingRule, Promotion, Quote, RuleSet, SeasonalRate, StayRule, TaxRule,
};

#[async_trait]
pub trait RuleStore: Send + Sync + 'static {
    // Tax rules
    async fn insert_tax_rule(&self, rule: TaxRule) -> Result<TaxRule, AppError>;
    async fn get_tax_rule(&self, campground_id: Uuid, id: Uuid) -> Result<Option<TaxRule>, AppError>;
    async fn list_tax_rules(
        &self,
        campground_id: Uuid,
        filter: &ListFilter,
    ) -> Result<Vec<TaxRule>, AppError>;
    async fn update_tax_rule(&self, rule: TaxRule) -> Result<TaxRule, AppError>;
    /// Fails with `Conflict` once an issued quote has used the rule.
    async fn delete_tax_rule(&self, campground_id: Uuid, id: Uuid) -> Result<(), AppError>;

    // Pricing rules, listed by priority then creation order
    async fn insert_pricing_rule(&self, rule: PricingRule) -> Result<PricingRule, AppError>;
    async fn get_pricing_rule(
        &self,
        campground_id: Uuid,
        id: Uuid,
    ) -> Result<Option<PricingRule>, AppError>;
    async fn list_pricing_rules(
        &self,
        campground_id: Uuid,
        filter: &ListFilter,
    ) -> Result<Vec<PricingRule>, AppError>;
    async fn update_pricing_rule(&self, rule: PricingRule) -> Result<PricingRule, AppError>;
    /// Fails with `Conflict` once an issued quote has used the rule.
    async fn delete_pricing_rule(&self, campground_id: Uuid, id: Uuid) -> Result<(), AppError>;

    // Seasonal rates
    async fn insert_seasonal_rate(&self, rate: SeasonalRate) -> Result<SeasonalRate, AppError>;
    async fn get_seasonal_rate(
        &self,
        campground_id: Uuid,
        id: Uuid,
    ) -> Result<Option<SeasonalRate>, AppError>;
    async fn list_seasonal_rates(
        &self,
        campground_id: Uuid,
        filter: &ListFilter,
    ) -> Result<Vec<SeasonalRate>, AppError>;
    async fn update_seasonal_rate(&self, rate: SeasonalRate) -> Result<SeasonalRate, AppError>;
    async fn delete_seasonal_rate(&self, campground_id: Uuid, id: Uuid) -> Result<(), AppError>;

    // Stay rules
    async fn insert_stay_rule(&self, rule: StayRule) -> Result<StayRule, AppError>;
    async fn get_stay_rule(&self, campground_id: Uuid, id: Uuid)
        -> Result<Option<StayRule>, AppError>;
    async fn list_stay_rules(
        &self,
        campground_id: Uuid,
        filter: &ListFilter,
    ) -> Result<Vec<StayRule>, AppError>;
    async fn update_stay_rule(&self, rule: StayRule) -> Result<StayRule, AppError>;
    async fn delete_stay_rule(&self, campground_id: Uuid, id: Uuid) -> Result<(), AppError>;

    // Blackouts; `filter.status` is evaluated against `today`
    async fn insert_blackout(&self, blackout: Blackout) -> Result<Blackout, AppError>;
    async fn get_blackout(&self, campground_id: Uuid, id: Uuid)
        -> Result<Option<Blackout>, AppError>;
    async fn list_blackouts(
        &self,
        campground_id: Uuid,
        filter: &ListFilter,
        today: NaiveDate,
    ) -> Result<Vec<Blackout>, AppError>;
    async fn update_blackout(&self, blackout: Blackout) -> Result<Blackout, AppError>;
    async fn delete_blackout(&self, campground_id: Uuid, id: Uuid) -> Result<(), AppError>;

    // Promotions; codes are unique per campground (`Conflict` otherwise)
    async fn insert_promotion(&self, promotion: Promotion) -> Result<Promotion, AppError>;
    async fn get_promotion(
        &self,
        campground_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Promotion>, AppError>;
    async fn list_promotions(
        &self,
        campground_id: Uuid,
        filter: &ListFilter,
    ) -> Result<Vec<Promotion>, AppError>;
    async fn update_promotion(&self, promotion: Promotion) -> Result<Promotion, AppError>;
    /// Fails with `Conflict` once the promotion has been redeemed.
    async fn delete_promotion(&self, campground_id: Uuid, id: Uuid) -> Result<(), AppError>;
    /// Atomically check redeemability on `as_of` and increment
    /// `usage_count`. Rejections are `ConstraintViolation`s.
    async fn redeem_promotion(
        &self,
        campground_id: Uuid,
        code: &str,
        as_of: NaiveDate,
    ) -> Result<Promotion, AppError>;

    // Quotes
    /// Persist an issued quote and record which rules it used.
    async fn insert_quote(&self, quote: Quote) -> Result<Quote, AppError>;
    async fn get_quote(&self, campground_id: Uuid, id: Uuid) -> Result<Option<Quote>, AppError>;

    async fn health_check(&self) -> Result<(), AppError>;

    /// Load everything the evaluator and constraint checker read for one
    /// campground. Inactive promotions are kept so they can be reported as
    /// inactive rather than unknown.
    async fn load_rule_set(&self, campground_id: Uuid) -> Result<RuleSet, AppError> {
        let active = ListFilter::active(true);
        RuleSet::assemble(
            campground_id,
            self.list_pricing_rules(campground_id, &active).await?,
            self.list_tax_rules(campground_id, &active).await?,
            self.list_seasonal_rates(campground_id, &active).await?,
            self.list_stay_rules(campground_id, &active).await?,
            self.list_blackouts(campground_id, &active, chrono::Utc::now().date_naive())
                .await?,
            self.list_promotions(campground_id, &ListFilter::default())
                .await?,
        )
    }
}

/// `NotFound` for a rule id that is absent in this campground.
pub(crate) fn not_found(family: &str, id: Uuid) -> AppError {
    AppError::NotFound(anyhow::anyhow!("{} {} not found", family, id))
}

pub(crate) fn in_use(family: &str, id: Uuid) -> AppError {
    AppError::Conflict(anyhow::anyhow!(
        "{} {} has usage history; set isActive=false instead of deleting it",
        family,
        id
    ))
}

pub(crate) fn duplicate_code(code: &str) -> AppError {
    AppError::Conflict(anyhow::anyhow!(
        "Promotion code {} already exists for this campground",
        code
    ))
}
