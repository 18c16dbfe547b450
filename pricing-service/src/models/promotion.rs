//! Promotion codes.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use uuid::Uuid;

use super::common::validate_signed_cents;
use super::violation::Violation;
use super::RuleEntity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromotionType {
    /// `value` is 0-100 percent off the subtotal.
    Percentage,
    /// `value` is integer cents off the subtotal.
    Flat,
}

impl PromotionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PromotionType::Percentage => "percentage",
            PromotionType::Flat => "flat",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "percentage" => Some(PromotionType::Percentage),
            "flat" => Some(PromotionType::Flat),
            _ => None,
        }
    }
}

/// Codes compare case-insensitively; storage is trimmed uppercase.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Promotion {
    pub id: Uuid,
    pub campground_id: Uuid,
    pub code: String,
    #[serde(rename = "type")]
    pub promotion_type: PromotionType,
    pub value: Decimal,
    pub valid_from: Option<NaiveDate>,
    pub valid_to: Option<NaiveDate>,
    pub usage_limit: Option<i32>,
    pub usage_count: i32,
    pub is_active: bool,
    pub description: Option<String>,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPromotion {
    pub code: String,
    pub promotion_type: PromotionType,
    pub value: Decimal,
    pub valid_from: Option<NaiveDate>,
    pub valid_to: Option<NaiveDate>,
    pub usage_limit: Option<i32>,
    pub is_active: bool,
    pub description: Option<String>,
}

/// `usage_count` is absent on purpose: it only moves through redemption.
#[derive(Debug, Clone, Default)]
pub struct PromotionPatch {
    pub code: Option<String>,
    pub promotion_type: Option<PromotionType>,
    pub value: Option<Decimal>,
    pub valid_from: Option<Option<NaiveDate>>,
    pub valid_to: Option<Option<NaiveDate>>,
    pub usage_limit: Option<Option<i32>>,
    pub is_active: Option<bool>,
    pub description: Option<Option<String>>,
}

impl Promotion {
    pub fn new(campground_id: Uuid, input: NewPromotion) -> Result<Self, AppError> {
        let now = Utc::now();
        let promotion = Self {
            id: Uuid::new_v4(),
            campground_id,
            code: normalize_code(&input.code),
            promotion_type: input.promotion_type,
            value: input.value,
            valid_from: input.valid_from,
            valid_to: input.valid_to,
            usage_limit: input.usage_limit,
            usage_count: 0,
            is_active: input.is_active,
            description: input.description,
            created_utc: now,
            updated_utc: now,
        };
        promotion.validate()?;
        Ok(promotion)
    }

    pub fn apply(&mut self, patch: PromotionPatch) -> Result<(), AppError> {
        if let Some(code) = patch.code {
            self.code = normalize_code(&code);
        }
        if let Some(promotion_type) = patch.promotion_type {
            self.promotion_type = promotion_type;
        }
        if let Some(value) = patch.value {
            self.value = value;
        }
        if let Some(from) = patch.valid_from {
            self.valid_from = from;
        }
        if let Some(to) = patch.valid_to {
            self.valid_to = to;
        }
        if let Some(limit) = patch.usage_limit {
            self.usage_limit = limit;
        }
        if let Some(active) = patch.is_active {
            self.is_active = active;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        self.updated_utc = Utc::now();
        self.validate()
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.code.is_empty() {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Promotion code is required"
            )));
        }
        if self.code.chars().any(char::is_whitespace) {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Promotion codes cannot contain whitespace"
            )));
        }
        match self.promotion_type {
            PromotionType::Percentage => {
                if self.value <= Decimal::ZERO || self.value > Decimal::ONE_HUNDRED {
                    return Err(AppError::BadRequest(anyhow::anyhow!(
                        "Percentage promotions take a value between 0 and 100"
                    )));
                }
            }
            PromotionType::Flat => {
                if self.value <= Decimal::ZERO || !self.value.fract().is_zero() {
                    return Err(AppError::BadRequest(anyhow::anyhow!(
                        "Flat promotions take a positive whole number of cents"
                    )));
                }
                validate_signed_cents("Flat promotion value", self.value)?;
            }
        }
        if let (Some(from), Some(to)) = (self.valid_from, self.valid_to) {
            if from > to {
                return Err(AppError::BadRequest(anyhow::anyhow!(
                    "validFrom {} is after validTo {}",
                    from,
                    to
                )));
            }
        }
        if let Some(limit) = self.usage_limit {
            if limit < 0 {
                return Err(AppError::BadRequest(anyhow::anyhow!(
                    "usageLimit cannot be negative"
                )));
            }
        }
        Ok(())
    }

    /// Check, in order: active, inside the validity window, below the usage
    /// limit.
    pub fn check_redeemable(&self, as_of: NaiveDate) -> Result<(), Violation> {
        if !self.is_active {
            return Err(Violation::PromotionInactive {
                code: self.code.clone(),
            });
        }
        if let Some(valid_from) = self.valid_from {
            if as_of < valid_from {
                return Err(Violation::PromotionNotYetValid {
                    code: self.code.clone(),
                    valid_from,
                });
            }
        }
        if let Some(valid_to) = self.valid_to {
            if as_of > valid_to {
                return Err(Violation::PromotionExpired {
                    code: self.code.clone(),
                    valid_to,
                });
            }
        }
        if let Some(usage_limit) = self.usage_limit {
            if self.usage_count >= usage_limit {
                return Err(Violation::PromotionUsageLimitExceeded {
                    code: self.code.clone(),
                    usage_limit,
                });
            }
        }
        Ok(())
    }

    /// Discount in cents for a stay subtotal, never more than the subtotal.
    pub fn discount_cents(&self, subtotal_cents: i64) -> i64 {
        let raw = match self.promotion_type {
            PromotionType::Percentage => (Decimal::from(subtotal_cents) * self.value
                / Decimal::ONE_HUNDRED)
                .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero),
            PromotionType::Flat => self.value,
        };
        raw.to_i64().unwrap_or(0).clamp(0, subtotal_cents.max(0))
    }
}

impl RuleEntity for Promotion {
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
