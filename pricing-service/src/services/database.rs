//! PostgreSQL-backed rule store.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use service_core::error::AppError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use sqlx::FromRow;
use std::time::Duration;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::metrics::start_db_timer;
use super::store::{duplicate_code, in_use, not_found, RuleStore};
use crate::models::{
    normalize_code, AdjustmentType, Blackout, ClosureReason, DateRange, DowMask, ListFilter,
    PricingRule, PricingRuleType, Promotion, PromotionType, Quote, RateType, SeasonalRate,
    StackMode, StayRule, TaxRule, TaxRuleType, Violation,
};

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

fn db_error(operation: &str, e: sqlx::Error) -> AppError {
    AppError::DatabaseError(anyhow::anyhow!("Failed to {}: {}", operation, e))
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.code().as_deref() == Some("23505"))
}

fn malformed(field: &str, value: impl std::fmt::Display) -> AppError {
    AppError::DatabaseError(anyhow::anyhow!("Unrecognized {} '{}'", field, value))
}

/// Convert rows, skipping any that no longer decode into a valid rule.
fn decode_rows<R, T>(family: &str, rows: Vec<R>, id_of: impl Fn(&R) -> Uuid) -> Vec<T>
where
    T: TryFrom<R, Error = AppError>,
{
    rows.into_iter()
        .filter_map(|row| {
            let id = id_of(&row);
            match T::try_from(row) {
                Ok(rule) => Some(rule),
                Err(e) => {
                    warn!(rule_id = %id, family, error = %e, "Skipping malformed row");
                    None
                }
            }
        })
        .collect()
}

// =============================================================================
// Row types
// =============================================================================

const TAX_RULE_COLUMNS: &str = "id, campground_id, name, rule_type, rate, min_nights, max_nights, \
     requires_waiver, waiver_text, is_active, created_utc, updated_utc";

#[derive(Debug, FromRow)]
struct TaxRuleRow {
    id: Uuid,
    campground_id: Uuid,
    name: String,
    rule_type: String,
    rate: Option<Decimal>,
    min_nights: Option<i32>,
    max_nights: Option<i32>,
    requires_waiver: bool,
    waiver_text: Option<String>,
    is_active: bool,
    created_utc: DateTime<Utc>,
    updated_utc: DateTime<Utc>,
}

impl TryFrom<TaxRuleRow> for TaxRule {
    type Error = AppError;

    fn try_from(row: TaxRuleRow) -> Result<Self, AppError> {
        let rule_type = TaxRuleType::parse(&row.rule_type)
            .ok_or_else(|| malformed("tax rule type", &row.rule_type))?;
        Ok(TaxRule {
            id: row.id,
            campground_id: row.campground_id,
            name: row.name,
            rule_type,
            rate: row.rate,
            min_nights: row.min_nights,
            max_nights: row.max_nights,
            requires_waiver: row.requires_waiver,
            waiver_text: row.waiver_text,
            is_active: row.is_active,
            created_utc: row.created_utc,
            updated_utc: row.updated_utc,
        })
    }
}

const PRICING_RULE_COLUMNS: &str = "id, campground_id, name, rule_type, priority, stack_mode, \
     adjustment_type, adjustment_value, site_class_id, dow_mask, start_date, end_date, \
     min_rate_cap_cents, max_rate_cap_cents, active, created_utc, updated_utc";

#[derive(Debug, FromRow)]
struct PricingRuleRow {
    id: Uuid,
    campground_id: Uuid,
    name: String,
    rule_type: String,
    priority: i32,
    stack_mode: String,
    adjustment_type: String,
    adjustment_value: Decimal,
    site_class_id: Option<String>,
    dow_mask: Option<i16>,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    min_rate_cap_cents: Option<i64>,
    max_rate_cap_cents: Option<i64>,
    active: bool,
    created_utc: DateTime<Utc>,
    updated_utc: DateTime<Utc>,
}

impl TryFrom<PricingRuleRow> for PricingRule {
    type Error = AppError;

    fn try_from(row: PricingRuleRow) -> Result<Self, AppError> {
        let rule_type = PricingRuleType::parse(&row.rule_type)
            .ok_or_else(|| malformed("pricing rule type", &row.rule_type))?;
        let stack_mode = StackMode::parse(&row.stack_mode)
            .ok_or_else(|| malformed("stack mode", &row.stack_mode))?;
        let adjustment_type = AdjustmentType::parse(&row.adjustment_type)
            .ok_or_else(|| malformed("adjustment type", &row.adjustment_type))?;
        let dow_mask = row
            .dow_mask
            .map(|bits| {
                u8::try_from(bits)
                    .map_err(|_| malformed("dow mask", bits))
                    .and_then(DowMask::new)
            })
            .transpose()?;
        Ok(PricingRule {
            id: row.id,
            campground_id: row.campground_id,
            name: row.name,
            rule_type,
            priority: row.priority,
            stack_mode,
            adjustment_type,
            adjustment_value: row.adjustment_value,
            site_class_id: row.site_class_id,
            dow_mask,
            start_date: row.start_date,
            end_date: row.end_date,
            min_rate_cap_cents: row.min_rate_cap_cents,
            max_rate_cap_cents: row.max_rate_cap_cents,
            active: row.active,
            created_utc: row.created_utc,
            updated_utc: row.updated_utc,
        })
    }
}

const SEASONAL_RATE_COLUMNS: &str = "id, campground_id, name, color, rate_type, amount_cents, \
     min_nights, date_ranges, is_active, created_utc, updated_utc";

#[derive(Debug, FromRow)]
struct SeasonalRateRow {
    id: Uuid,
    campground_id: Uuid,
    name: String,
    color: Option<String>,
    rate_type: String,
    amount_cents: i64,
    min_nights: Option<i32>,
    date_ranges: Json<Vec<DateRange>>,
    is_active: bool,
    created_utc: DateTime<Utc>,
    updated_utc: DateTime<Utc>,
}

impl TryFrom<SeasonalRateRow> for SeasonalRate {
    type Error = AppError;

    fn try_from(row: SeasonalRateRow) -> Result<Self, AppError> {
        let rate_type = RateType::parse(&row.rate_type)
            .ok_or_else(|| malformed("rate type", &row.rate_type))?;
        Ok(SeasonalRate {
            id: row.id,
            campground_id: row.campground_id,
            name: row.name,
            color: row.color,
            rate_type,
            amount_cents: row.amount_cents,
            min_nights: row.min_nights,
            date_ranges: row.date_ranges.0,
            is_active: row.is_active,
            created_utc: row.created_utc,
            updated_utc: row.updated_utc,
        })
    }
}

const STAY_RULE_COLUMNS: &str = "id, campground_id, name, min_nights, max_nights, site_classes, \
     date_ranges, ignore_days_before, is_active, created_utc, updated_utc";

#[derive(Debug, FromRow)]
struct StayRuleRow {
    id: Uuid,
    campground_id: Uuid,
    name: String,
    min_nights: i32,
    max_nights: i32,
    site_classes: Vec<String>,
    date_ranges: Json<Vec<DateRange>>,
    ignore_days_before: i32,
    is_active: bool,
    created_utc: DateTime<Utc>,
    updated_utc: DateTime<Utc>,
}

impl TryFrom<StayRuleRow> for StayRule {
    type Error = AppError;

    fn try_from(row: StayRuleRow) -> Result<Self, AppError> {
        Ok(StayRule {
            id: row.id,
            campground_id: row.campground_id,
            name: row.name,
            min_nights: row.min_nights,
            max_nights: row.max_nights,
            site_classes: row.site_classes,
            date_ranges: row.date_ranges.0,
            ignore_days_before: row.ignore_days_before,
            is_active: row.is_active,
            created_utc: row.created_utc,
            updated_utc: row.updated_utc,
        })
    }
}

const BLACKOUT_COLUMNS: &str = "id, campground_id, site_id, site_class_ids, start_date, end_date, \
     reason, note, is_active, created_utc, updated_utc";

#[derive(Debug, FromRow)]
struct BlackoutRow {
    id: Uuid,
    campground_id: Uuid,
    site_id: Option<String>,
    site_class_ids: Vec<String>,
    start_date: NaiveDate,
    end_date: NaiveDate,
    reason: String,
    note: Option<String>,
    is_active: bool,
    created_utc: DateTime<Utc>,
    updated_utc: DateTime<Utc>,
}

impl TryFrom<BlackoutRow> for Blackout {
    type Error = AppError;

    fn try_from(row: BlackoutRow) -> Result<Self, AppError> {
        // free-text reasons from older rows read as "other"
        let reason = ClosureReason::parse(&row.reason).unwrap_or(ClosureReason::Other);
        Ok(Blackout {
            id: row.id,
            campground_id: row.campground_id,
            site_id: row.site_id,
            site_class_ids: row.site_class_ids,
            start_date: row.start_date,
            end_date: row.end_date,
            reason,
            note: row.note,
            is_active: row.is_active,
            created_utc: row.created_utc,
            updated_utc: row.updated_utc,
        })
    }
}

const PROMOTION_COLUMNS: &str = "id, campground_id, code, promotion_type, value, valid_from, \
     valid_to, usage_limit, usage_count, is_active, description, created_utc, updated_utc";

#[derive(Debug, FromRow)]
struct PromotionRow {
    id: Uuid,
    campground_id: Uuid,
    code: String,
    promotion_type: String,
    value: Decimal,
    valid_from: Option<NaiveDate>,
    valid_to: Option<NaiveDate>,
    usage_limit: Option<i32>,
    usage_count: i32,
    is_active: bool,
    description: Option<String>,
    created_utc: DateTime<Utc>,
    updated_utc: DateTime<Utc>,
}

impl TryFrom<PromotionRow> for Promotion {
    type Error = AppError;

    fn try_from(row: PromotionRow) -> Result<Self, AppError> {
        let promotion_type = PromotionType::parse(&row.promotion_type)
            .ok_or_else(|| malformed("promotion type", &row.promotion_type))?;
        Ok(Promotion {
            id: row.id,
            campground_id: row.campground_id,
            code: row.code,
            promotion_type,
            value: row.value,
            valid_from: row.valid_from,
            valid_to: row.valid_to,
            usage_limit: row.usage_limit,
            usage_count: row.usage_count,
            is_active: row.is_active,
            description: row.description,
            created_utc: row.created_utc,
            updated_utc: row.updated_utc,
        })
    }
}

impl Database {
    /// Create a new database connection pool.
    #[instrument(skip(database_url), fields(service = "pricing-service"))]
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }

    /// Delete a rule unless an issued quote references it.
    async fn delete_unused(
        &self,
        table: &str,
        family: &str,
        campground_id: Uuid,
        id: Uuid,
    ) -> Result<(), AppError> {
        let _timer = start_db_timer(&format!("delete_{}", table));

        let deleted = sqlx::query(&format!(
            "DELETE FROM {table} WHERE campground_id = $1 AND id = $2 \
             AND NOT EXISTS (SELECT 1 FROM quote_rule_usages WHERE rule_id = $2)"
        ))
        .bind(campground_id)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error(&format!("delete from {}", table), e))?
        .rows_affected();

        if deleted == 1 {
            info!(rule_id = %id, family, "Rule deleted");
            return Ok(());
        }
        if self.exists(table, campground_id, id).await? {
            Err(in_use(family, id))
        } else {
            Err(not_found(family, id))
        }
    }

    async fn delete_plain(
        &self,
        table: &str,
        family: &str,
        campground_id: Uuid,
        id: Uuid,
    ) -> Result<(), AppError> {
        let _timer = start_db_timer(&format!("delete_{}", table));

        let deleted = sqlx::query(&format!(
            "DELETE FROM {table} WHERE campground_id = $1 AND id = $2"
        ))
        .bind(campground_id)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error(&format!("delete from {}", table), e))?
        .rows_affected();

        if deleted == 0 {
            return Err(not_found(family, id));
        }
        info!(rule_id = %id, family, "Rule deleted");
        Ok(())
    }

    async fn exists(&self, table: &str, campground_id: Uuid, id: Uuid) -> Result<bool, AppError> {
        sqlx::query_scalar::<_, bool>(&format!(
            "SELECT EXISTS (SELECT 1 FROM {table} WHERE campground_id = $1 AND id = $2)"
        ))
        .bind(campground_id)
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("check existence", e))
    }

    async fn find_promotion_by_code(
        &self,
        campground_id: Uuid,
        code: &str,
    ) -> Result<Option<Promotion>, AppError> {
        let row = sqlx::query_as::<_, PromotionRow>(&format!(
            "SELECT {PROMOTION_COLUMNS} FROM promotions WHERE campground_id = $1 AND code = $2"
        ))
        .bind(campground_id)
        .bind(code)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("find promotion", e))?;
        row.map(Promotion::try_from).transpose()
    }
}

#[async_trait]
impl RuleStore for Database {
    // =========================================================================
    // Tax Rule Operations
    // =========================================================================

    #[instrument(skip(self, rule), fields(campground_id = %rule.campground_id))]
    async fn insert_tax_rule(&self, rule: TaxRule) -> Result<TaxRule, AppError> {
        let _timer = start_db_timer("insert_tax_rule");

        let row = sqlx::query_as::<_, TaxRuleRow>(&format!(
            r#"
            INSERT INTO tax_rules (id, campground_id, name, rule_type, rate, min_nights, max_nights,
                                   requires_waiver, waiver_text, is_active, created_utc, updated_utc)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {TAX_RULE_COLUMNS}
            "#
        ))
        .bind(rule.id)
        .bind(rule.campground_id)
        .bind(&rule.name)
        .bind(rule.rule_type.as_str())
        .bind(rule.rate)
        .bind(rule.min_nights)
        .bind(rule.max_nights)
        .bind(rule.requires_waiver)
        .bind(&rule.waiver_text)
        .bind(rule.is_active)
        .bind(rule.created_utc)
        .bind(rule.updated_utc)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("create tax rule", e))?;

        info!(tax_rule_id = %row.id, name = %row.name, "Tax rule created");
        TaxRule::try_from(row)
    }

    #[instrument(skip(self), fields(campground_id = %campground_id, tax_rule_id = %id))]
    async fn get_tax_rule(&self, campground_id: Uuid, id: Uuid) -> Result<Option<TaxRule>, AppError> {
        let _timer = start_db_timer("get_tax_rule");

        let row = sqlx::query_as::<_, TaxRuleRow>(&format!(
            "SELECT {TAX_RULE_COLUMNS} FROM tax_rules WHERE campground_id = $1 AND id = $2"
        ))
        .bind(campground_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("get tax rule", e))?;

        row.map(TaxRule::try_from).transpose()
    }

    #[instrument(skip(self, filter), fields(campground_id = %campground_id))]
    async fn list_tax_rules(
        &self,
        campground_id: Uuid,
        filter: &ListFilter,
    ) -> Result<Vec<TaxRule>, AppError> {
        let _timer = start_db_timer("list_tax_rules");

        let rows = sqlx::query_as::<_, TaxRuleRow>(&format!(
            r#"
            SELECT {TAX_RULE_COLUMNS} FROM tax_rules
            WHERE campground_id = $1 AND ($2::BOOLEAN IS NULL OR is_active = $2)
            ORDER BY seq
            "#
        ))
        .bind(campground_id)
        .bind(filter.active)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("list tax rules", e))?;

        Ok(decode_rows("tax_rule", rows, |r| r.id))
    }

    #[instrument(skip(self, rule), fields(campground_id = %rule.campground_id, tax_rule_id = %rule.id))]
    async fn update_tax_rule(&self, rule: TaxRule) -> Result<TaxRule, AppError> {
        let _timer = start_db_timer("update_tax_rule");

        let row = sqlx::query_as::<_, TaxRuleRow>(&format!(
            r#"
            UPDATE tax_rules
            SET name = $3, rule_type = $4, rate = $5, min_nights = $6, max_nights = $7,
                requires_waiver = $8, waiver_text = $9, is_active = $10, updated_utc = $11
            WHERE campground_id = $1 AND id = $2
            RETURNING {TAX_RULE_COLUMNS}
            "#
        ))
        .bind(rule.campground_id)
        .bind(rule.id)
        .bind(&rule.name)
        .bind(rule.rule_type.as_str())
        .bind(rule.rate)
        .bind(rule.min_nights)
        .bind(rule.max_nights)
        .bind(rule.requires_waiver)
        .bind(&rule.waiver_text)
        .bind(rule.is_active)
        .bind(rule.updated_utc)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("update tax rule", e))?
        .ok_or_else(|| not_found("Tax rule", rule.id))?;

        TaxRule::try_from(row)
    }

    async fn delete_tax_rule(&self, campground_id: Uuid, id: Uuid) -> Result<(), AppError> {
        self.delete_unused("tax_rules", "Tax rule", campground_id, id)
            .await
    }

    // =========================================================================
    // Pricing Rule Operations
    // =========================================================================

    #[instrument(skip(self, rule), fields(campground_id = %rule.campground_id))]
    async fn insert_pricing_rule(&self, rule: PricingRule) -> Result<PricingRule, AppError> {
        let _timer = start_db_timer("insert_pricing_rule");

        let row = sqlx::query_as::<_, PricingRuleRow>(&format!(
            r#"
            INSERT INTO pricing_rules (id, campground_id, name, rule_type, priority, stack_mode,
                                       adjustment_type, adjustment_value, site_class_id, dow_mask,
                                       start_date, end_date, min_rate_cap_cents, max_rate_cap_cents,
                                       active, created_utc, updated_utc)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            RETURNING {PRICING_RULE_COLUMNS}
            "#
        ))
        .bind(rule.id)
        .bind(rule.campground_id)
        .bind(&rule.name)
        .bind(rule.rule_type.as_str())
        .bind(rule.priority)
        .bind(rule.stack_mode.as_str())
        .bind(rule.adjustment_type.as_str())
        .bind(rule.adjustment_value)
        .bind(&rule.site_class_id)
        .bind(rule.dow_mask.map(|m| m.bits() as i16))
        .bind(rule.start_date)
        .bind(rule.end_date)
        .bind(rule.min_rate_cap_cents)
        .bind(rule.max_rate_cap_cents)
        .bind(rule.active)
        .bind(rule.created_utc)
        .bind(rule.updated_utc)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("create pricing rule", e))?;

        info!(pricing_rule_id = %row.id, name = %row.name, "Pricing rule created");
        PricingRule::try_from(row)
    }

    #[instrument(skip(self), fields(campground_id = %campground_id, pricing_rule_id = %id))]
    async fn get_pricing_rule(
        &self,
        campground_id: Uuid,
        id: Uuid,
    ) -> Result<Option<PricingRule>, AppError> {
        let _timer = start_db_timer("get_pricing_rule");

        let row = sqlx::query_as::<_, PricingRuleRow>(&format!(
            "SELECT {PRICING_RULE_COLUMNS} FROM pricing_rules WHERE campground_id = $1 AND id = $2"
        ))
        .bind(campground_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("get pricing rule", e))?;

        row.map(PricingRule::try_from).transpose()
    }

    #[instrument(skip(self, filter), fields(campground_id = %campground_id))]
    async fn list_pricing_rules(
        &self,
        campground_id: Uuid,
        filter: &ListFilter,
    ) -> Result<Vec<PricingRule>, AppError> {
        let _timer = start_db_timer("list_pricing_rules");

        let rows = sqlx::query_as::<_, PricingRuleRow>(&format!(
            r#"
            SELECT {PRICING_RULE_COLUMNS} FROM pricing_rules
            WHERE campground_id = $1
              AND ($2::BOOLEAN IS NULL OR active = $2)
              AND ($3::TEXT IS NULL OR site_class_id = $3)
            ORDER BY priority, seq
            "#
        ))
        .bind(campground_id)
        .bind(filter.active)
        .bind(&filter.site_class_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("list pricing rules", e))?;

        Ok(decode_rows("pricing_rule", rows, |r| r.id))
    }

    #[instrument(skip(self, rule), fields(campground_id = %rule.campground_id, pricing_rule_id = %rule.id))]
    async fn update_pricing_rule(&self, rule: PricingRule) -> Result<PricingRule, AppError> {
        let _timer = start_db_timer("update_pricing_rule");

        let row = sqlx::query_as::<_, PricingRuleRow>(&format!(
            r#"
            UPDATE pricing_rules
            SET name = $3, rule_type = $4, priority = $5, stack_mode = $6, adjustment_type = $7,
                adjustment_value = $8, site_class_id = $9, dow_mask = $10, start_date = $11,
                end_date = $12, min_rate_cap_cents = $13, max_rate_cap_cents = $14, active = $15,
                updated_utc = $16
            WHERE campground_id = $1 AND id = $2
            RETURNING {PRICING_RULE_COLUMNS}
            "#
        ))
        .bind(rule.campground_id)
        .bind(rule.id)
        .bind(&rule.name)
        .bind(rule.rule_type.as_str())
        .bind(rule.priority)
        .bind(rule.stack_mode.as_str())
        .bind(rule.adjustment_type.as_str())
        .bind(rule.adjustment_value)
        .bind(&rule.site_class_id)
        .bind(rule.dow_mask.map(|m| m.bits() as i16))
        .bind(rule.start_date)
        .bind(rule.end_date)
        .bind(rule.min_rate_cap_cents)
        .bind(rule.max_rate_cap_cents)
        .bind(rule.active)
        .bind(rule.updated_utc)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("update pricing rule", e))?
        .ok_or_else(|| not_found("Pricing rule", rule.id))?;

        PricingRule::try_from(row)
    }

    async fn delete_pricing_rule(&self, campground_id: Uuid, id: Uuid) -> Result<(), AppError> {
        self.delete_unused("pricing_rules", "Pricing rule", campground_id, id)
            .await
    }

    // =========================================================================
    // Seasonal Rate Operations
    // =========================================================================

    #[instrument(skip(self, rate), fields(campground_id = %rate.campground_id))]
    async fn insert_seasonal_rate(&self, rate: SeasonalRate) -> Result<SeasonalRate, AppError> {
        let _timer = start_db_timer("insert_seasonal_rate");

        let row = sqlx::query_as::<_, SeasonalRateRow>(&format!(
            r#"
            INSERT INTO seasonal_rates (id, campground_id, name, color, rate_type, amount_cents,
                                        min_nights, date_ranges, is_active, created_utc, updated_utc)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {SEASONAL_RATE_COLUMNS}
            "#
        ))
        .bind(rate.id)
        .bind(rate.campground_id)
        .bind(&rate.name)
        .bind(&rate.color)
        .bind(rate.rate_type.as_str())
        .bind(rate.amount_cents)
        .bind(rate.min_nights)
        .bind(Json(&rate.date_ranges))
        .bind(rate.is_active)
        .bind(rate.created_utc)
        .bind(rate.updated_utc)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("create seasonal rate", e))?;

        info!(seasonal_rate_id = %row.id, name = %row.name, "Seasonal rate created");
        SeasonalRate::try_from(row)
    }

    #[instrument(skip(self), fields(campground_id = %campground_id, seasonal_rate_id = %id))]
    async fn get_seasonal_rate(
        &self,
        campground_id: Uuid,
        id: Uuid,
    ) -> Result<Option<SeasonalRate>, AppError> {
        let _timer = start_db_timer("get_seasonal_rate");

        let row = sqlx::query_as::<_, SeasonalRateRow>(&format!(
            "SELECT {SEASONAL_RATE_COLUMNS} FROM seasonal_rates WHERE campground_id = $1 AND id = $2"
        ))
        .bind(campground_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("get seasonal rate", e))?;

        row.map(SeasonalRate::try_from).transpose()
    }

    #[instrument(skip(self, filter), fields(campground_id = %campground_id))]
    async fn list_seasonal_rates(
        &self,
        campground_id: Uuid,
        filter: &ListFilter,
    ) -> Result<Vec<SeasonalRate>, AppError> {
        let _timer = start_db_timer("list_seasonal_rates");

        let rows = sqlx::query_as::<_, SeasonalRateRow>(&format!(
            r#"
            SELECT {SEASONAL_RATE_COLUMNS} FROM seasonal_rates
            WHERE campground_id = $1 AND ($2::BOOLEAN IS NULL OR is_active = $2)
            ORDER BY seq
            "#
        ))
        .bind(campground_id)
        .bind(filter.active)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("list seasonal rates", e))?;

        Ok(decode_rows("seasonal_rate", rows, |r| r.id))
    }

    #[instrument(skip(self, rate), fields(campground_id = %rate.campground_id, seasonal_rate_id = %rate.id))]
    async fn update_seasonal_rate(&self, rate: SeasonalRate) -> Result<SeasonalRate, AppError> {
        let _timer = start_db_timer("update_seasonal_rate");

        let row = sqlx::query_as::<_, SeasonalRateRow>(&format!(
            r#"
            UPDATE seasonal_rates
            SET name = $3, color = $4, rate_type = $5, amount_cents = $6, min_nights = $7,
                date_ranges = $8, is_active = $9, updated_utc = $10
            WHERE campground_id = $1 AND id = $2
            RETURNING {SEASONAL_RATE_COLUMNS}
            "#
        ))
        .bind(rate.campground_id)
        .bind(rate.id)
        .bind(&rate.name)
        .bind(&rate.color)
        .bind(rate.rate_type.as_str())
        .bind(rate.amount_cents)
        .bind(rate.min_nights)
        .bind(Json(&rate.date_ranges))
        .bind(rate.is_active)
        .bind(rate.updated_utc)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("update seasonal rate", e))?
        .ok_or_else(|| not_found("Seasonal rate", rate.id))?;

        SeasonalRate::try_from(row)
    }

    async fn delete_seasonal_rate(&self, campground_id: Uuid, id: Uuid) -> Result<(), AppError> {
        self.delete_plain("seasonal_rates", "Seasonal rate", campground_id, id)
            .await
    }

    // =========================================================================
    // Stay Rule Operations
    // =========================================================================

    #[instrument(skip(self, rule), fields(campground_id = %rule.campground_id))]
    async fn insert_stay_rule(&self, rule: StayRule) -> Result<StayRule, AppError> {
        let _timer = start_db_timer("insert_stay_rule");

        let row = sqlx::query_as::<_, StayRuleRow>(&format!(
            r#"
            INSERT INTO stay_rules (id, campground_id, name, min_nights, max_nights, site_classes,
                                    date_ranges, ignore_days_before, is_active, created_utc, updated_utc)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {STAY_RULE_COLUMNS}
            "#
        ))
        .bind(rule.id)
        .bind(rule.campground_id)
        .bind(&rule.name)
        .bind(rule.min_nights)
        .bind(rule.max_nights)
        .bind(&rule.site_classes)
        .bind(Json(&rule.date_ranges))
        .bind(rule.ignore_days_before)
        .bind(rule.is_active)
        .bind(rule.created_utc)
        .bind(rule.updated_utc)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("create stay rule", e))?;

        info!(stay_rule_id = %row.id, name = %row.name, "Stay rule created");
        StayRule::try_from(row)
    }

    #[instrument(skip(self), fields(campground_id = %campground_id, stay_rule_id = %id))]
    async fn get_stay_rule(
        &self,
        campground_id: Uuid,
        id: Uuid,
    ) -> Result<Option<StayRule>, AppError> {
        let _timer = start_db_timer("get_stay_rule");

        let row = sqlx::query_as::<_, StayRuleRow>(&format!(
            "SELECT {STAY_RULE_COLUMNS} FROM stay_rules WHERE campground_id = $1 AND id = $2"
        ))
        .bind(campground_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("get stay rule", e))?;

        row.map(StayRule::try_from).transpose()
    }

    #[instrument(skip(self, filter), fields(campground_id = %campground_id))]
    async fn list_stay_rules(
        &self,
        campground_id: Uuid,
        filter: &ListFilter,
    ) -> Result<Vec<StayRule>, AppError> {
        let _timer = start_db_timer("list_stay_rules");

        let rows = sqlx::query_as::<_, StayRuleRow>(&format!(
            r#"
            SELECT {STAY_RULE_COLUMNS} FROM stay_rules
            WHERE campground_id = $1 AND ($2::BOOLEAN IS NULL OR is_active = $2)
            ORDER BY seq
            "#
        ))
        .bind(campground_id)
        .bind(filter.active)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("list stay rules", e))?;

        Ok(decode_rows("stay_rule", rows, |r| r.id))
    }

    #[instrument(skip(self, rule), fields(campground_id = %rule.campground_id, stay_rule_id = %rule.id))]
    async fn update_stay_rule(&self, rule: StayRule) -> Result<StayRule, AppError> {
        let _timer = start_db_timer("update_stay_rule");

        let row = sqlx::query_as::<_, StayRuleRow>(&format!(
            r#"
            UPDATE stay_rules
            SET name = $3, min_nights = $4, max_nights = $5, site_classes = $6, date_ranges = $7,
                ignore_days_before = $8, is_active = $9, updated_utc = $10
            WHERE campground_id = $1 AND id = $2
            RETURNING {STAY_RULE_COLUMNS}
            "#
        ))
        .bind(rule.campground_id)
        .bind(rule.id)
        .bind(&rule.name)
        .bind(rule.min_nights)
        .bind(rule.max_nights)
        .bind(&rule.site_classes)
        .bind(Json(&rule.date_ranges))
        .bind(rule.ignore_days_before)
        .bind(rule.is_active)
        .bind(rule.updated_utc)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("update stay rule", e))?
        .ok_or_else(|| not_found("Stay rule", rule.id))?;

        StayRule::try_from(row)
    }

    async fn delete_stay_rule(&self, campground_id: Uuid, id: Uuid) -> Result<(), AppError> {
        self.delete_plain("stay_rules", "Stay rule", campground_id, id)
            .await
    }

    // =========================================================================
    // Blackout Operations
    // =========================================================================

    #[instrument(skip(self, blackout), fields(campground_id = %blackout.campground_id))]
    async fn insert_blackout(&self, blackout: Blackout) -> Result<Blackout, AppError> {
        let _timer = start_db_timer("insert_blackout");

        let row = sqlx::query_as::<_, BlackoutRow>(&format!(
            r#"
            INSERT INTO blackouts (id, campground_id, site_id, site_class_ids, start_date, end_date,
                                   reason, note, is_active, created_utc, updated_utc)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {BLACKOUT_COLUMNS}
            "#
        ))
        .bind(blackout.id)
        .bind(blackout.campground_id)
        .bind(&blackout.site_id)
        .bind(&blackout.site_class_ids)
        .bind(blackout.start_date)
        .bind(blackout.end_date)
        .bind(blackout.reason.as_str())
        .bind(&blackout.note)
        .bind(blackout.is_active)
        .bind(blackout.created_utc)
        .bind(blackout.updated_utc)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("create blackout", e))?;

        info!(blackout_id = %row.id, "Blackout created");
        Blackout::try_from(row)
    }

    #[instrument(skip(self), fields(campground_id = %campground_id, blackout_id = %id))]
    async fn get_blackout(
        &self,
        campground_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Blackout>, AppError> {
        let _timer = start_db_timer("get_blackout");

        let row = sqlx::query_as::<_, BlackoutRow>(&format!(
            "SELECT {BLACKOUT_COLUMNS} FROM blackouts WHERE campground_id = $1 AND id = $2"
        ))
        .bind(campground_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("get blackout", e))?;

        row.map(Blackout::try_from).transpose()
    }

    #[instrument(skip(self, filter), fields(campground_id = %campground_id))]
    async fn list_blackouts(
        &self,
        campground_id: Uuid,
        filter: &ListFilter,
        today: NaiveDate,
    ) -> Result<Vec<Blackout>, AppError> {
        let _timer = start_db_timer("list_blackouts");

        let rows = sqlx::query_as::<_, BlackoutRow>(&format!(
            r#"
            SELECT {BLACKOUT_COLUMNS} FROM blackouts
            WHERE campground_id = $1 AND ($2::BOOLEAN IS NULL OR is_active = $2)
            ORDER BY seq
            "#
        ))
        .bind(campground_id)
        .bind(filter.active)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("list blackouts", e))?;

        let blackouts: Vec<Blackout> = decode_rows("blackout", rows, |r| r.id);
        Ok(match filter.status {
            Some(status) => blackouts
                .into_iter()
                .filter(|b| b.status(today) == status)
                .collect(),
            None => blackouts,
        })
    }

    #[instrument(skip(self, blackout), fields(campground_id = %blackout.campground_id, blackout_id = %blackout.id))]
    async fn update_blackout(&self, blackout: Blackout) -> Result<Blackout, AppError> {
        let _timer = start_db_timer("update_blackout");

        let row = sqlx::query_as::<_, BlackoutRow>(&format!(
            r#"
            UPDATE blackouts
            SET site_id = $3, site_class_ids = $4, start_date = $5, end_date = $6, reason = $7,
                note = $8, is_active = $9, updated_utc = $10
            WHERE campground_id = $1 AND id = $2
            RETURNING {BLACKOUT_COLUMNS}
            "#
        ))
        .bind(blackout.campground_id)
        .bind(blackout.id)
        .bind(&blackout.site_id)
        .bind(&blackout.site_class_ids)
        .bind(blackout.start_date)
        .bind(blackout.end_date)
        .bind(blackout.reason.as_str())
        .bind(&blackout.note)
        .bind(blackout.is_active)
        .bind(blackout.updated_utc)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("update blackout", e))?
        .ok_or_else(|| not_found("Blackout", blackout.id))?;

        Blackout::try_from(row)
    }

    async fn delete_blackout(&self, campground_id: Uuid, id: Uuid) -> Result<(), AppError> {
        self.delete_plain("blackouts", "Blackout", campground_id, id)
            .await
    }

    // =========================================================================
    // Promotion Operations
    // =========================================================================

    #[instrument(skip(self, promotion), fields(campground_id = %promotion.campground_id, code = %promotion.code))]
    async fn insert_promotion(&self, promotion: Promotion) -> Result<Promotion, AppError> {
        let _timer = start_db_timer("insert_promotion");

        let row = sqlx::query_as::<_, PromotionRow>(&format!(
            r#"
            INSERT INTO promotions (id, campground_id, code, promotion_type, value, valid_from,
                                    valid_to, usage_limit, usage_count, is_active, description,
                                    created_utc, updated_utc)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 0, $9, $10, $11, $12)
            RETURNING {PROMOTION_COLUMNS}
            "#
        ))
        .bind(promotion.id)
        .bind(promotion.campground_id)
        .bind(&promotion.code)
        .bind(promotion.promotion_type.as_str())
        .bind(promotion.value)
        .bind(promotion.valid_from)
        .bind(promotion.valid_to)
        .bind(promotion.usage_limit)
        .bind(promotion.is_active)
        .bind(&promotion.description)
        .bind(promotion.created_utc)
        .bind(promotion.updated_utc)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                duplicate_code(&promotion.code)
            } else {
                db_error("create promotion", e)
            }
        })?;

        info!(promotion_id = %row.id, code = %row.code, "Promotion created");
        Promotion::try_from(row)
    }

    #[instrument(skip(self), fields(campground_id = %campground_id, promotion_id = %id))]
    async fn get_promotion(
        &self,
        campground_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Promotion>, AppError> {
        let _timer = start_db_timer("get_promotion");

        let row = sqlx::query_as::<_, PromotionRow>(&format!(
            "SELECT {PROMOTION_COLUMNS} FROM promotions WHERE campground_id = $1 AND id = $2"
        ))
        .bind(campground_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("get promotion", e))?;

        row.map(Promotion::try_from).transpose()
    }

    #[instrument(skip(self, filter), fields(campground_id = %campground_id))]
    async fn list_promotions(
        &self,
        campground_id: Uuid,
        filter: &ListFilter,
    ) -> Result<Vec<Promotion>, AppError> {
        let _timer = start_db_timer("list_promotions");

        let rows = sqlx::query_as::<_, PromotionRow>(&format!(
            r#"
            SELECT {PROMOTION_COLUMNS} FROM promotions
            WHERE campground_id = $1 AND ($2::BOOLEAN IS NULL OR is_active = $2)
            ORDER BY seq
            "#
        ))
        .bind(campground_id)
        .bind(filter.active)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("list promotions", e))?;

        Ok(decode_rows("promotion", rows, |r| r.id))
    }

    /// `usage_count` is deliberately not written here.
    #[instrument(skip(self, promotion), fields(campground_id = %promotion.campground_id, promotion_id = %promotion.id))]
    async fn update_promotion(&self, promotion: Promotion) -> Result<Promotion, AppError> {
        let _timer = start_db_timer("update_promotion");

        let row = sqlx::query_as::<_, PromotionRow>(&format!(
            r#"
            UPDATE promotions
            SET code = $3, promotion_type = $4, value = $5, valid_from = $6, valid_to = $7,
                usage_limit = $8, is_active = $9, description = $10, updated_utc = $11
            WHERE campground_id = $1 AND id = $2
            RETURNING {PROMOTION_COLUMNS}
            "#
        ))
        .bind(promotion.campground_id)
        .bind(promotion.id)
        .bind(&promotion.code)
        .bind(promotion.promotion_type.as_str())
        .bind(promotion.value)
        .bind(promotion.valid_from)
        .bind(promotion.valid_to)
        .bind(promotion.usage_limit)
        .bind(promotion.is_active)
        .bind(&promotion.description)
        .bind(promotion.updated_utc)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                duplicate_code(&promotion.code)
            } else {
                db_error("update promotion", e)
            }
        })?
        .ok_or_else(|| not_found("Promotion", promotion.id))?;

        Promotion::try_from(row)
    }

    #[instrument(skip(self), fields(campground_id = %campground_id, promotion_id = %id))]
    async fn delete_promotion(&self, campground_id: Uuid, id: Uuid) -> Result<(), AppError> {
        let _timer = start_db_timer("delete_promotion");

        let deleted = sqlx::query(
            "DELETE FROM promotions WHERE campground_id = $1 AND id = $2 AND usage_count = 0",
        )
        .bind(campground_id)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("delete promotion", e))?
        .rows_affected();

        if deleted == 1 {
            info!("Promotion deleted");
            return Ok(());
        }
        if self.exists("promotions", campground_id, id).await? {
            Err(in_use("Promotion", id))
        } else {
            Err(not_found("Promotion", id))
        }
    }

    /// Single conditional UPDATE, so concurrent redemptions can never push
    /// `usage_count` past `usage_limit`.
    #[instrument(skip(self), fields(campground_id = %campground_id))]
    async fn redeem_promotion(
        &self,
        campground_id: Uuid,
        code: &str,
        as_of: NaiveDate,
    ) -> Result<Promotion, AppError> {
        let _timer = start_db_timer("redeem_promotion");
        let code = normalize_code(code);

        let row = sqlx::query_as::<_, PromotionRow>(&format!(
            r#"
            UPDATE promotions
            SET usage_count = usage_count + 1, updated_utc = NOW()
            WHERE campground_id = $1 AND code = $2 AND is_active
              AND (valid_from IS NULL OR valid_from <= $3)
              AND (valid_to IS NULL OR valid_to >= $3)
              AND (usage_limit IS NULL OR usage_count < usage_limit)
            RETURNING {PROMOTION_COLUMNS}
            "#
        ))
        .bind(campground_id)
        .bind(&code)
        .bind(as_of)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("redeem promotion", e))?;

        if let Some(row) = row {
            info!(promotion_id = %row.id, usage_count = row.usage_count, "Promotion redeemed");
            return Promotion::try_from(row);
        }

        // Work out which condition failed.
        let promotion = self
            .find_promotion_by_code(campground_id, &code)
            .await?
            .ok_or_else(|| Violation::PromotionUnknown { code: code.clone() })?;
        promotion.check_redeemable(as_of)?;
        Err(AppError::Conflict(anyhow::anyhow!(
            "Promotion {} changed during redemption; retry",
            code
        )))
    }

    // =========================================================================
    // Quote Operations
    // =========================================================================

    #[instrument(skip(self, quote), fields(campground_id = %quote.campground_id, quote_id = %quote.id))]
    async fn insert_quote(&self, quote: Quote) -> Result<Quote, AppError> {
        let _timer = start_db_timer("insert_quote");

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("begin transaction", e))?;

        sqlx::query(
            r#"
            INSERT INTO quotes (id, campground_id, snapshot, total_cents, created_utc)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(quote.id)
        .bind(quote.campground_id)
        .bind(Json(&quote))
        .bind(quote.total_cents)
        .bind(quote.created_utc)
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error("insert quote", e))?;

        let usages = quote
            .pricing_rule_ids()
            .into_iter()
            .map(|id| (id, "pricing_rule"))
            .chain(quote.tax_rule_ids().into_iter().map(|id| (id, "tax_rule")));
        for (rule_id, family) in usages {
            sqlx::query(
                r#"
                INSERT INTO quote_rule_usages (quote_id, rule_id, rule_family)
                VALUES ($1, $2, $3)
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(quote.id)
            .bind(rule_id)
            .bind(family)
            .execute(&mut *tx)
            .await
            .map_err(|e| db_error("record rule usage", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| db_error("commit quote", e))?;

        info!(total_cents = quote.total_cents, "Quote issued");
        Ok(quote)
    }

    #[instrument(skip(self), fields(campground_id = %campground_id, quote_id = %id))]
    async fn get_quote(&self, campground_id: Uuid, id: Uuid) -> Result<Option<Quote>, AppError> {
        let _timer = start_db_timer("get_quote");

        let snapshot = sqlx::query_scalar::<_, Json<Quote>>(
            "SELECT snapshot FROM quotes WHERE campground_id = $1 AND id = $2",
        )
        .bind(campground_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("get quote", e))?;

        Ok(snapshot.map(|Json(quote)| quote))
    }

    /// Check database health.
    #[instrument(skip(self))]
    async fn health_check(&self) -> Result<(), AppError> {
        let _timer = start_db_timer("health_check");

        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Health check failed: {}", e)))?;

        Ok(())
    }
}
