//! In-process rule store, used when no database is configured and in tests.

use async_trait::async_trait;
use chrono::NaiveDate;
use service_core::error::AppError;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use tracing::{info, instrument};
use uuid::Uuid;

use super::store::{duplicate_code, in_use, not_found, RuleStore};
use crate::models::{
    normalize_code, Blackout, ListFilter, PricingRule, Promotion, Quote, RuleEntity, SeasonalRate,
    StayRule, TaxRule, Violation,
};

/// One rule family, kept in insertion order.
struct Table<T> {
    family: &'static str,
    rows: RwLock<Vec<T>>,
}

impl<T: RuleEntity> Table<T> {
    fn new(family: &'static str) -> Self {
        Self {
            family,
            rows: RwLock::new(Vec::new()),
        }
    }

    async fn insert(&self, row: T) -> T {
        self.rows.write().await.push(row.clone());
        row
    }

    async fn get(&self, campground_id: Uuid, id: Uuid) -> Option<T> {
        self.rows
            .read()
            .await
            .iter()
            .find(|r| r.campground_id() == campground_id && r.id() == id)
            .cloned()
    }

    async fn list(&self, campground_id: Uuid, keep: impl Fn(&T) -> bool) -> Vec<T> {
        self.rows
            .read()
            .await
            .iter()
            .filter(|r| r.campground_id() == campground_id && keep(r))
            .cloned()
            .collect()
    }

    async fn update(&self, row: T) -> Result<T, AppError> {
        let mut rows = self.rows.write().await;
        let slot = rows
            .iter_mut()
            .find(|r| r.campground_id() == row.campground_id() && r.id() == row.id())
            .ok_or_else(|| not_found(self.family, row.id()))?;
        *slot = row.clone();
        Ok(row)
    }

    async fn delete(&self, campground_id: Uuid, id: Uuid) -> Result<(), AppError> {
        let mut rows = self.rows.write().await;
        let index = rows
            .iter()
            .position(|r| r.campground_id() == campground_id && r.id() == id)
            .ok_or_else(|| not_found(self.family, id))?;
        rows.remove(index);
        Ok(())
    }
}

pub struct MemoryStore {
    tax_rules: Table<TaxRule>,
    pricing_rules: Table<PricingRule>,
    seasonal_rates: Table<SeasonalRate>,
    stay_rules: Table<StayRule>,
    blackouts: Table<Blackout>,
    promotions: Table<Promotion>,
    quotes: RwLock<HashMap<Uuid, Quote>>,
    /// Rule ids referenced by at least one issued quote.
    used_rules: RwLock<HashSet<Uuid>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        info!("Using in-memory rule store");
        Self {
            tax_rules: Table::new("Tax rule"),
            pricing_rules: Table::new("Pricing rule"),
            seasonal_rates: Table::new("Seasonal rate"),
            stay_rules: Table::new("Stay rule"),
            blackouts: Table::new("Blackout"),
            promotions: Table::new("Promotion"),
            quotes: RwLock::new(HashMap::new()),
            used_rules: RwLock::new(HashSet::new()),
        }
    }

    async fn ensure_unused<T: RuleEntity>(
        &self,
        table: &Table<T>,
        campground_id: Uuid,
        id: Uuid,
    ) -> Result<(), AppError> {
        if table.get(campground_id, id).await.is_some() && self.used_rules.read().await.contains(&id)
        {
            return Err(in_use(table.family, id));
        }
        Ok(())
    }
}

#[async_trait]
impl RuleStore for MemoryStore {
    async fn insert_tax_rule(&self, rule: TaxRule) -> Result<TaxRule, AppError> {
        Ok(self.tax_rules.insert(rule).await)
    }

    async fn get_tax_rule(&self, campground_id: Uuid, id: Uuid) -> Result<Option<TaxRule>, AppError> {
        Ok(self.tax_rules.get(campground_id, id).await)
    }

    async fn list_tax_rules(
        &self,
        campground_id: Uuid,
        filter: &ListFilter,
    ) -> Result<Vec<TaxRule>, AppError> {
        Ok(self.tax_rules.list(campground_id, |r| filter.admits(r)).await)
    }

    async fn update_tax_rule(&self, rule: TaxRule) -> Result<TaxRule, AppError> {
        self.tax_rules.update(rule).await
    }

    async fn delete_tax_rule(&self, campground_id: Uuid, id: Uuid) -> Result<(), AppError> {
        self.ensure_unused(&self.tax_rules, campground_id, id).await?;
        self.tax_rules.delete(campground_id, id).await
    }

    async fn insert_pricing_rule(&self, rule: PricingRule) -> Result<PricingRule, AppError> {
        Ok(self.pricing_rules.insert(rule).await)
    }

    async fn get_pricing_rule(
        &self,
        campground_id: Uuid,
        id: Uuid,
    ) -> Result<Option<PricingRule>, AppError> {
        Ok(self.pricing_rules.get(campground_id, id).await)
    }

    async fn list_pricing_rules(
        &self,
        campground_id: Uuid,
        filter: &ListFilter,
    ) -> Result<Vec<PricingRule>, AppError> {
        let mut rules = self
            .pricing_rules
            .list(campground_id, |r| {
                filter.admits(r)
                    && filter
                        .site_class_id
                        .as_deref()
                        .map_or(true, |class| r.site_class_id.as_deref() == Some(class))
            })
            .await;
        rules.sort_by_key(|r| r.priority);
        Ok(rules)
    }

    async fn update_pricing_rule(&self, rule: PricingRule) -> Result<PricingRule, AppError> {
        self.pricing_rules.update(rule).await
    }

    async fn delete_pricing_rule(&self, campground_id: Uuid, id: Uuid) -> Result<(), AppError> {
        self.ensure_unused(&self.pricing_rules, campground_id, id)
            .await?;
        self.pricing_rules.delete(campground_id, id).await
    }

    async fn insert_seasonal_rate(&self, rate: SeasonalRate) -> Result<SeasonalRate, AppError> {
        Ok(self.seasonal_rates.insert(rate).await)
    }

    async fn get_seasonal_rate(
        &self,
        campground_id: Uuid,
        id: Uuid,
    ) -> Result<Option<SeasonalRate>, AppError> {
        Ok(self.seasonal_rates.get(campground_id, id).await)
    }

    async fn list_seasonal_rates(
        &self,
        campground_id: Uuid,
        filter: &ListFilter,
    ) -> Result<Vec<SeasonalRate>, AppError> {
        Ok(self
            .seasonal_rates
            .list(campground_id, |r| filter.admits(r))
            .await)
    }

    async fn update_seasonal_rate(&self, rate: SeasonalRate) -> Result<SeasonalRate, AppError> {
        self.seasonal_rates.update(rate).await
    }

    async fn delete_seasonal_rate(&self, campground_id: Uuid, id: Uuid) -> Result<(), AppError> {
        self.seasonal_rates.delete(campground_id, id).await
    }

    async fn insert_stay_rule(&self, rule: StayRule) -> Result<StayRule, AppError> {
        Ok(self.stay_rules.insert(rule).await)
    }

    async fn get_stay_rule(
        &self,
        campground_id: Uuid,
        id: Uuid,
    ) -> Result<Option<StayRule>, AppError> {
        Ok(self.stay_rules.get(campground_id, id).await)
    }

    async fn list_stay_rules(
        &self,
        campground_id: Uuid,
        filter: &ListFilter,
    ) -> Result<Vec<StayRule>, AppError> {
        Ok(self.stay_rules.list(campground_id, |r| filter.admits(r)).await)
    }

    async fn update_stay_rule(&self, rule: StayRule) -> Result<StayRule, AppError> {
        self.stay_rules.update(rule).await
    }

    async fn delete_stay_rule(&self, campground_id: Uuid, id: Uuid) -> Result<(), AppError> {
        self.stay_rules.delete(campground_id, id).await
    }

    async fn insert_blackout(&self, blackout: Blackout) -> Result<Blackout, AppError> {
        Ok(self.blackouts.insert(blackout).await)
    }

    async fn get_blackout(
        &self,
        campground_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Blackout>, AppError> {
        Ok(self.blackouts.get(campground_id, id).await)
    }

    async fn list_blackouts(
        &self,
        campground_id: Uuid,
        filter: &ListFilter,
        today: NaiveDate,
    ) -> Result<Vec<Blackout>, AppError> {
        Ok(self
            .blackouts
            .list(campground_id, |b| {
                filter.admits(b) && filter.status.map_or(true, |s| b.status(today) == s)
            })
            .await)
    }

    async fn update_blackout(&self, blackout: Blackout) -> Result<Blackout, AppError> {
        self.blackouts.update(blackout).await
    }

    async fn delete_blackout(&self, campground_id: Uuid, id: Uuid) -> Result<(), AppError> {
        self.blackouts.delete(campground_id, id).await
    }

    async fn insert_promotion(&self, promotion: Promotion) -> Result<Promotion, AppError> {
        let mut rows = self.promotions.rows.write().await;
        if rows
            .iter()
            .any(|p| p.campground_id == promotion.campground_id && p.code == promotion.code)
        {
            return Err(duplicate_code(&promotion.code));
        }
        rows.push(promotion.clone());
        Ok(promotion)
    }

    async fn get_promotion(
        &self,
        campground_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Promotion>, AppError> {
        Ok(self.promotions.get(campground_id, id).await)
    }

    async fn list_promotions(
        &self,
        campground_id: Uuid,
        filter: &ListFilter,
    ) -> Result<Vec<Promotion>, AppError> {
        Ok(self.promotions.list(campground_id, |p| filter.admits(p)).await)
    }

    async fn update_promotion(&self, promotion: Promotion) -> Result<Promotion, AppError> {
        let mut rows = self.promotions.rows.write().await;
        if rows.iter().any(|p| {
            p.campground_id == promotion.campground_id
                && p.code == promotion.code
                && p.id != promotion.id
        }) {
            return Err(duplicate_code(&promotion.code));
        }
        let slot = rows
            .iter_mut()
            .find(|p| p.campground_id == promotion.campground_id && p.id == promotion.id)
            .ok_or_else(|| not_found(self.promotions.family, promotion.id))?;
        let usage_count = slot.usage_count;
        *slot = Promotion {
            usage_count,
            ..promotion
        };
        Ok(slot.clone())
    }

    async fn delete_promotion(&self, campground_id: Uuid, id: Uuid) -> Result<(), AppError> {
        let mut rows = self.promotions.rows.write().await;
        let index = rows
            .iter()
            .position(|p| p.campground_id == campground_id && p.id == id)
            .ok_or_else(|| not_found(self.promotions.family, id))?;
        if rows[index].usage_count > 0 {
            return Err(in_use(self.promotions.family, id));
        }
        rows.remove(index);
        Ok(())
    }

    #[instrument(skip(self), fields(campground_id = %campground_id))]
    async fn redeem_promotion(
        &self,
        campground_id: Uuid,
        code: &str,
        as_of: NaiveDate,
    ) -> Result<Promotion, AppError> {
        let code = normalize_code(code);
        let mut rows = self.promotions.rows.write().await;
        let promotion = rows
            .iter_mut()
            .find(|p| p.campground_id == campground_id && p.code == code)
            .ok_or_else(|| Violation::PromotionUnknown { code: code.clone() })?;
        promotion.check_redeemable(as_of)?;
        promotion.usage_count += 1;
        Ok(promotion.clone())
    }

    async fn insert_quote(&self, quote: Quote) -> Result<Quote, AppError> {
        {
            let mut used = self.used_rules.write().await;
            used.extend(quote.pricing_rule_ids());
            used.extend(quote.tax_rule_ids());
        }
        self.quotes.write().await.insert(quote.id, quote.clone());
        Ok(quote)
    }

    async fn get_quote(&self, campground_id: Uuid, id: Uuid) -> Result<Option<Quote>, AppError> {
        Ok(self
            .quotes
            .read()
            .await
            .get(&id)
            .filter(|q| q.campground_id == campground_id)
            .cloned())
    }

    async fn health_check(&self) -> Result<(), AppError> {
        Ok(())
    }
}
