//! Seasonal base rates (rendered as colored rate groups on the calendar).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use uuid::Uuid;

use super::common::{require_name, validate_cents, validate_night_bounds, DateRange};
use super::RuleEntity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateType {
    Nightly,
    Weekly,
    Monthly,
    Seasonal,
}

impl RateType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RateType::Nightly => "nightly",
            RateType::Weekly => "weekly",
            RateType::Monthly => "monthly",
            RateType::Seasonal => "seasonal",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "nightly" => Some(RateType::Nightly),
            "weekly" => Some(RateType::Weekly),
            "monthly" => Some(RateType::Monthly),
            "seasonal" => Some(RateType::Seasonal),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeasonalRate {
    pub id: Uuid,
    pub campground_id: Uuid,
    pub name: String,
    /// Calendar color; presentation only.
    pub color: Option<String>,
    pub rate_type: RateType,
    pub amount_cents: i64,
    pub min_nights: Option<i32>,
    pub date_ranges: Vec<DateRange>,
    pub is_active: bool,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewSeasonalRate {
    pub name: String,
    pub color: Option<String>,
    pub rate_type: RateType,
    pub amount_cents: i64,
    pub min_nights: Option<i32>,
    pub date_ranges: Vec<DateRange>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Default)]
pub struct SeasonalRatePatch {
    pub name: Option<String>,
    pub color: Option<Option<String>>,
    pub rate_type: Option<RateType>,
    pub amount_cents: Option<i64>,
    pub min_nights: Option<Option<i32>>,
    pub date_ranges: Option<Vec<DateRange>>,
    pub is_active: Option<bool>,
}

impl SeasonalRate {
    pub fn new(campground_id: Uuid, input: NewSeasonalRate) -> Result<Self, AppError> {
        let now = Utc::now();
        let rate = Self {
            id: Uuid::new_v4(),
            campground_id,
            name: input.name.trim().to_string(),
            color: input.color,
            rate_type: input.rate_type,
            amount_cents: input.amount_cents,
            min_nights: input.min_nights,
            date_ranges: input.date_ranges,
            is_active: input.is_active,
            created_utc: now,
            updated_utc: now,
        };
        rate.validate()?;
        Ok(rate)
    }

    pub fn apply(&mut self, patch: SeasonalRatePatch) -> Result<(), AppError> {
        if let Some(name) = patch.name {
            self.name = name.trim().to_string();
        }
        if let Some(color) = patch.color {
            self.color = color;
        }
        if let Some(rate_type) = patch.rate_type {
            self.rate_type = rate_type;
        }
        if let Some(amount) = patch.amount_cents {
            self.amount_cents = amount;
        }
        if let Some(min) = patch.min_nights {
            self.min_nights = min;
        }
        if let Some(ranges) = patch.date_ranges {
            self.date_ranges = ranges;
        }
        if let Some(active) = patch.is_active {
            self.is_active = active;
        }
        self.updated_utc = Utc::now();
        self.validate()
    }

    pub fn validate(&self) -> Result<(), AppError> {
        require_name(&self.name, "Seasonal rate")?;
        validate_cents("Rate amount", self.amount_cents)?;
        if self.date_ranges.is_empty() {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "A seasonal rate needs at least one date range"
            )));
        }
        for range in &self.date_ranges {
            range.validate("seasonal rate dateRanges")?;
        }
        validate_night_bounds(self.min_nights, None)
    }

    /// Whether this rate supplies the nightly base for `night` of a stay of
    /// `nights` nights.
    pub fn covers(&self, night: NaiveDate, nights: i64) -> bool {
        self.is_active
            && self.rate_type == RateType::Nightly
            && self.min_nights.map_or(true, |min| nights >= min as i64)
            && self.date_ranges.iter().any(|r| r.contains(night))
    }
}

impl RuleEntity for SeasonalRate {
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
