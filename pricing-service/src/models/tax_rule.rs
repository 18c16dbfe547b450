//! Tax rule model.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use uuid::Uuid;

use super::common::{require_name, validate_night_bounds, validate_signed_cents};
use super::RuleEntity;

/// How a tax rule charges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxRuleType {
    /// `rate` is a whole-number percentage of the stay subtotal (7.5 = 7.5%).
    Percentage,
    /// `rate` is integer cents charged once per stay.
    Flat,
    /// Waives all taxes for stays it matches; carries no rate.
    Exemption,
}

impl TaxRuleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaxRuleType::Percentage => "percentage",
            TaxRuleType::Flat => "flat",
            TaxRuleType::Exemption => "exemption",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "percentage" => Some(TaxRuleType::Percentage),
            "flat" => Some(TaxRuleType::Flat),
            "exemption" => Some(TaxRuleType::Exemption),
            _ => None,
        }
    }
}

/// Tax rule configuration for a campground.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxRule {
    pub id: Uuid,
    pub campground_id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub rule_type: TaxRuleType,
    pub rate: Option<Decimal>,
    pub min_nights: Option<i32>,
    pub max_nights: Option<i32>,
    pub requires_waiver: bool,
    pub waiver_text: Option<String>,
    pub is_active: bool,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

/// Input for creating a tax rule (canonical units).
#[derive(Debug, Clone)]
pub struct NewTaxRule {
    pub name: String,
    pub rule_type: TaxRuleType,
    pub rate: Option<Decimal>,
    pub min_nights: Option<i32>,
    pub max_nights: Option<i32>,
    pub requires_waiver: bool,
    pub waiver_text: Option<String>,
    pub is_active: bool,
}

/// Partial update. Double options distinguish "leave as is" from "clear".
#[derive(Debug, Clone, Default)]
pub struct TaxRulePatch {
    pub name: Option<String>,
    pub rule_type: Option<TaxRuleType>,
    pub rate: Option<Option<Decimal>>,
    pub min_nights: Option<Option<i32>>,
    pub max_nights: Option<Option<i32>>,
    pub requires_waiver: Option<bool>,
    pub waiver_text: Option<Option<String>>,
    pub is_active: Option<bool>,
}

impl TaxRule {
    pub fn new(campground_id: Uuid, input: NewTaxRule) -> Result<Self, AppError> {
        let now = Utc::now();
        let rule = Self {
            id: Uuid::new_v4(),
            campground_id,
            name: input.name.trim().to_string(),
            rule_type: input.rule_type,
            rate: input.rate,
            min_nights: input.min_nights,
            max_nights: input.max_nights,
            requires_waiver: input.requires_waiver,
            waiver_text: input.waiver_text,
            is_active: input.is_active,
            created_utc: now,
            updated_utc: now,
        };
        rule.validate()?;
        Ok(rule)
    }

    /// Merge `patch` and re-check invariants. Switching to `exemption`
    /// drops any rate that was set.
    pub fn apply(&mut self, patch: TaxRulePatch) -> Result<(), AppError> {
        if let Some(name) = patch.name {
            self.name = name.trim().to_string();
        }
        if let Some(rule_type) = patch.rule_type {
            self.rule_type = rule_type;
        }
        if let Some(rate) = patch.rate {
            self.rate = rate;
        }
        if self.rule_type == TaxRuleType::Exemption {
            self.rate = None;
        }
        if let Some(min) = patch.min_nights {
            self.min_nights = min;
        }
        if let Some(max) = patch.max_nights {
            self.max_nights = max;
        }
        if let Some(requires_waiver) = patch.requires_waiver {
            self.requires_waiver = requires_waiver;
        }
        if let Some(text) = patch.waiver_text {
            self.waiver_text = text;
        }
        if let Some(active) = patch.is_active {
            self.is_active = active;
        }
        self.updated_utc = Utc::now();
        self.validate()
    }

    pub fn validate(&self) -> Result<(), AppError> {
        require_name(&self.name, "Tax rule")?;
        match (self.rule_type, self.rate) {
            (TaxRuleType::Exemption, Some(_)) => {
                return Err(AppError::BadRequest(anyhow::anyhow!(
                    "Exemption tax rules cannot carry a rate"
                )));
            }
            (TaxRuleType::Percentage | TaxRuleType::Flat, None) => {
                return Err(AppError::BadRequest(anyhow::anyhow!(
                    "A {} tax rule requires a rate",
                    self.rule_type.as_str()
                )));
            }
            (TaxRuleType::Percentage | TaxRuleType::Flat, Some(rate)) if rate <= Decimal::ZERO => {
                return Err(AppError::BadRequest(anyhow::anyhow!(
                    "Tax rate must be greater than zero"
                )));
            }
            (TaxRuleType::Percentage, Some(rate)) if rate > Decimal::ONE_HUNDRED => {
                return Err(AppError::BadRequest(anyhow::anyhow!(
                    "Percentage tax rates cannot exceed 100"
                )));
            }
            (TaxRuleType::Flat, Some(rate)) if !rate.fract().is_zero() => {
                return Err(AppError::BadRequest(anyhow::anyhow!(
                    "Flat tax rates are whole cents"
                )));
            }
            (TaxRuleType::Flat, Some(rate)) => validate_signed_cents("Flat tax rate", rate)?,
            _ => {}
        }
        validate_night_bounds(self.min_nights, self.max_nights)?;
        if self.requires_waiver
            && self
                .waiver_text
                .as_deref()
                .map_or(true, |t| t.trim().is_empty())
        {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "waiverText is required when requiresWaiver is set"
            )));
        }
        Ok(())
    }

    /// Whether a stay of `nights` falls inside the rule's night bounds.
    pub fn applies_to_length(&self, nights: i64) -> bool {
        self.min_nights.map_or(true, |min| nights >= min as i64)
            && self.max_nights.map_or(true, |max| nights <= max as i64)
    }
}

impl RuleEntity for TaxRule {
    fn id(&self) -> Uuid {
        self.id
    }
    fn campground_id(&self) -> Uuid {
        self.campground_id
    }
    fn is_active(&self) -> bool {
        self.is_active
    }
}
