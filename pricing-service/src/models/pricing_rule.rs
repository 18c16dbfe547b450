//! Dynamic pricing rule model.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use uuid::Uuid;

use super::common::{
    require_name, validate_cents, validate_signed_cents, DateRange, DowMask, MAX_PERCENT_FRACTION,
};
use super::RuleEntity;

/// What kind of demand signal the rule models. Informational only; the
/// evaluator treats every type the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PricingRuleType {
    Season,
    Weekend,
    Holiday,
    Event,
    Demand,
}

impl PricingRuleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PricingRuleType::Season => "season",
            PricingRuleType::Weekend => "weekend",
            PricingRuleType::Holiday => "holiday",
            PricingRuleType::Event => "event",
            PricingRuleType::Demand => "demand",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "season" => Some(PricingRuleType::Season),
            "weekend" => Some(PricingRuleType::Weekend),
            "holiday" => Some(PricingRuleType::Holiday),
            "event" => Some(PricingRuleType::Event),
            "demand" => Some(PricingRuleType::Demand),
            _ => None,
        }
    }
}

/// How a rule combines with what earlier rules accumulated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StackMode {
    Additive,
    Max,
    Override,
}

impl StackMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            StackMode::Additive => "additive",
            StackMode::Max => "max",
            StackMode::Override => "override",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "additive" => Some(StackMode::Additive),
            "max" => Some(StackMode::Max),
            "override" => Some(StackMode::Override),
            _ => None,
        }
    }
}

/// Unit of `adjustment_value`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentType {
    /// Fraction of the nightly base rate (0.10 = +10%).
    Percent,
    /// Integer cents per night.
    Flat,
}

impl AdjustmentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdjustmentType::Percent => "percent",
            AdjustmentType::Flat => "flat",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "percent" => Some(AdjustmentType::Percent),
            "flat" => Some(AdjustmentType::Flat),
            _ => None,
        }
    }
}

/// The single predicate deciding which nights a rule applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Temporal {
    DaysOfWeek(DowMask),
    Window(DateRange),
    Unbounded,
}

impl Temporal {
    pub fn matches(&self, night: NaiveDate) -> bool {
        match self {
            Temporal::DaysOfWeek(mask) => mask.includes(night),
            Temporal::Window(range) => range.contains(night),
            Temporal::Unbounded => true,
        }
    }
}

/// Dynamic pricing rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingRule {
    pub id: Uuid,
    pub campground_id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub rule_type: PricingRuleType,
    pub priority: i32,
    pub stack_mode: StackMode,
    pub adjustment_type: AdjustmentType,
    /// Negative values are discounts, positive values premiums.
    pub adjustment_value: Decimal,
    pub site_class_id: Option<String>,
    pub dow_mask: Option<DowMask>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub min_rate_cap_cents: Option<i64>,
    pub max_rate_cap_cents: Option<i64>,
    pub active: bool,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

/// Input for creating a pricing rule (canonical units).
#[derive(Debug, Clone)]
pub struct NewPricingRule {
    pub name: String,
    pub rule_type: PricingRuleType,
    pub priority: i32,
    pub stack_mode: StackMode,
    pub adjustment_type: AdjustmentType,
    pub adjustment_value: Decimal,
    pub site_class_id: Option<String>,
    pub dow_mask: Option<DowMask>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub min_rate_cap_cents: Option<i64>,
    pub max_rate_cap_cents: Option<i64>,
    pub active: bool,
}

#[derive(Debug, Clone, Default)]
pub struct PricingRulePatch {
    pub name: Option<String>,
    pub rule_type: Option<PricingRuleType>,
    pub priority: Option<i32>,
    pub stack_mode: Option<StackMode>,
    pub adjustment_type: Option<AdjustmentType>,
    pub adjustment_value: Option<Decimal>,
    pub site_class_id: Option<Option<String>>,
    pub dow_mask: Option<Option<DowMask>>,
    pub start_date: Option<Option<NaiveDate>>,
    pub end_date: Option<Option<NaiveDate>>,
    pub min_rate_cap_cents: Option<Option<i64>>,
    pub max_rate_cap_cents: Option<Option<i64>>,
    pub active: Option<bool>,
}

impl PricingRule {
    pub fn new(campground_id: Uuid, input: NewPricingRule) -> Result<Self, AppError> {
        let now = Utc::now();
        let rule = Self {
            id: Uuid::new_v4(),
            campground_id,
            name: input.name.trim().to_string(),
            rule_type: input.rule_type,
            priority: input.priority,
            stack_mode: input.stack_mode,
            adjustment_type: input.adjustment_type,
            adjustment_value: input.adjustment_value,
            site_class_id: input.site_class_id,
            dow_mask: input.dow_mask,
            start_date: input.start_date,
            end_date: input.end_date,
            min_rate_cap_cents: input.min_rate_cap_cents,
            max_rate_cap_cents: input.max_rate_cap_cents,
            active: input.active,
            created_utc: now,
            updated_utc: now,
        };
        rule.validate()?;
        Ok(rule)
    }

    pub fn apply(&mut self, patch: PricingRulePatch) -> Result<(), AppError> {
        if let Some(name) = patch.name {
            self.name = name.trim().to_string();
        }
        if let Some(rule_type) = patch.rule_type {
            self.rule_type = rule_type;
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(mode) = patch.stack_mode {
            self.stack_mode = mode;
        }
        if let Some(adjustment_type) = patch.adjustment_type {
            self.adjustment_type = adjustment_type;
        }
        if let Some(value) = patch.adjustment_value {
            self.adjustment_value = value;
        }
        if let Some(site_class) = patch.site_class_id {
            self.site_class_id = site_class;
        }
        if let Some(mask) = patch.dow_mask {
            self.dow_mask = mask;
        }
        if let Some(start) = patch.start_date {
            self.start_date = start;
        }
        if let Some(end) = patch.end_date {
            self.end_date = end;
        }
        if let Some(cap) = patch.min_rate_cap_cents {
            self.min_rate_cap_cents = cap;
        }
        if let Some(cap) = patch.max_rate_cap_cents {
            self.max_rate_cap_cents = cap;
        }
        if let Some(active) = patch.active {
            self.active = active;
        }
        self.updated_utc = Utc::now();
        self.validate()
    }

    pub fn validate(&self) -> Result<(), AppError> {
        require_name(&self.name, "Pricing rule")?;
        if self.adjustment_type == AdjustmentType::Flat && !self.adjustment_value.fract().is_zero()
        {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Flat adjustments are whole cents, got {}",
                self.adjustment_value
            )));
        }
        match self.adjustment_type {
            AdjustmentType::Percent if self.adjustment_value < -Decimal::ONE => {
                return Err(AppError::BadRequest(anyhow::anyhow!(
                    "A percent discount cannot exceed 100%"
                )));
            }
            AdjustmentType::Percent if self.adjustment_value > MAX_PERCENT_FRACTION => {
                return Err(AppError::BadRequest(anyhow::anyhow!(
                    "A percent premium cannot exceed {}%",
                    MAX_PERCENT_FRACTION * Decimal::ONE_HUNDRED
                )));
            }
            AdjustmentType::Flat => validate_signed_cents("adjustmentValue", self.adjustment_value)?,
            _ => {}
        }
        self.temporal()?;
        for cap in [self.min_rate_cap_cents, self.max_rate_cap_cents].into_iter().flatten() {
            validate_cents("Rate cap", cap)?;
        }
        if let (Some(min), Some(max)) = (self.min_rate_cap_cents, self.max_rate_cap_cents) {
            if min > max {
                return Err(AppError::BadRequest(anyhow::anyhow!(
                    "minRateCap ({}) cannot exceed maxRateCap ({})",
                    min,
                    max
                )));
            }
        }
        if let Some(site_class) = &self.site_class_id {
            if site_class.trim().is_empty() {
                return Err(AppError::BadRequest(anyhow::anyhow!(
                    "siteClassId cannot be blank; omit it for an unscoped rule"
                )));
            }
        }
        Ok(())
    }

    /// Resolve the temporal predicate. A day-of-week mask and a date window
    /// are mutually exclusive; a window needs both ends.
    pub fn temporal(&self) -> Result<Temporal, AppError> {
        match (self.dow_mask, self.start_date, self.end_date) {
            (Some(_), Some(_), _) | (Some(_), _, Some(_)) => Err(AppError::BadRequest(
                anyhow::anyhow!("A pricing rule uses either dowMask or a date window, not both"),
            )),
            (Some(mask), None, None) => {
                mask.validate()?;
                Ok(Temporal::DaysOfWeek(mask))
            }
            (None, Some(start), Some(end)) => {
                let range = DateRange::new(start, end);
                range.validate("pricing rule window")?;
                Ok(Temporal::Window(range))
            }
            (None, Some(_), None) | (None, None, Some(_)) => Err(AppError::BadRequest(
                anyhow::anyhow!("A date window needs both startDate and endDate"),
            )),
            (None, None, None) => Ok(Temporal::Unbounded),
        }
    }

    /// Scope check: unscoped rules match every site class.
    pub fn applies_to_site_class(&self, site_class_id: Option<&str>) -> bool {
        match (&self.site_class_id, site_class_id) {
            (None, _) => true,
            (Some(scope), Some(requested)) => scope == requested,
            (Some(_), None) => false,
        }
    }
}

impl RuleEntity for PricingRule {
    fn id(&self) -> Uuid {
        self.id
    }
    fn campground_id(&self) -> Uuid {
        self.campground_id
    }
    fn is_active(&self) -> bool {
        self.active
    }
}
