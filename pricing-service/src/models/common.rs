//! Value types shared by the rule families.

use chrono::{Datelike, NaiveDate, Weekday};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use service_core::error::AppError;

/// Inclusive calendar window `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Whether any night of `stay` falls inside the window.
    pub fn overlaps(&self, stay: &Stay) -> bool {
        self.start < stay.departure && self.end >= stay.arrival
    }

    pub fn validate(&self, field: &str) -> Result<(), AppError> {
        if self.start > self.end {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "{}: start date {} is after end date {}",
                field,
                self.start,
                self.end
            )));
        }
        Ok(())
    }
}

/// Day-of-week bitset. Bit 0 is Sunday, bit 6 is Saturday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DowMask(u8);

impl DowMask {
    pub const ALL_DAYS: DowMask = DowMask(0b111_1111);

    /// Build a mask from raw bits; zero and bits above Saturday are rejected.
    pub fn new(bits: u8) -> Result<Self, AppError> {
        let mask = DowMask(bits);
        mask.validate()?;
        Ok(mask)
    }

    pub fn from_days(days: &[Weekday]) -> Self {
        DowMask(
            days.iter()
                .fold(0u8, |acc, day| acc | (1 << day.num_days_from_sunday())),
        )
    }

    pub fn bits(&self) -> u8 {
        self.0
    }

    pub fn includes(&self, date: NaiveDate) -> bool {
        self.0 & (1 << date.weekday().num_days_from_sunday()) != 0
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.0 == 0 || self.0 > Self::ALL_DAYS.0 {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "dowMask must select at least one day and use only bits 0-6, got {}",
                self.0
            )));
        }
        Ok(())
    }
}

/// A requested stay: nights run from `arrival` up to, not including,
/// `departure`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stay {
    pub arrival: NaiveDate,
    pub departure: NaiveDate,
}

impl Stay {
    pub fn new(arrival: NaiveDate, departure: NaiveDate) -> Result<Self, AppError> {
        if departure <= arrival {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "departureDate {} must be after arrivalDate {}",
                departure,
                arrival
            )));
        }
        Ok(Self { arrival, departure })
    }

    pub fn nights(&self) -> i64 {
        (self.departure - self.arrival).num_days()
    }

    /// Reject stays longer than `max_nights`; every night is priced and
    /// stored, so the length must stay bounded.
    pub fn ensure_at_most(&self, max_nights: i64) -> Result<(), AppError> {
        if self.nights() > max_nights {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "A stay of {} nights exceeds the limit of {} nights",
                self.nights(),
                max_nights
            )));
        }
        Ok(())
    }

    /// Each stayed night, identified by its calendar date.
    pub fn each_night(&self) -> impl Iterator<Item = NaiveDate> {
        let departure = self.departure;
        self.arrival.iter_days().take_while(move |d| *d < departure)
    }
}

/// Largest money amount any rule or request may carry: $100,000,000.
pub const MAX_AMOUNT_CENTS: i64 = 10_000_000_000;

/// Largest percent adjustment, as a fraction: +10,000%.
pub const MAX_PERCENT_FRACTION: Decimal = Decimal::ONE_HUNDRED;

pub(crate) fn validate_cents(field: &str, cents: i64) -> Result<(), AppError> {
    if !(0..=MAX_AMOUNT_CENTS).contains(&cents) {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "{} must be between 0 and {} cents, got {}",
            field,
            MAX_AMOUNT_CENTS,
            cents
        )));
    }
    Ok(())
}

/// Like [`validate_cents`] for signed decimal amounts (flat adjustments).
pub(crate) fn validate_signed_cents(field: &str, cents: Decimal) -> Result<(), AppError> {
    if cents.abs() > Decimal::from(MAX_AMOUNT_CENTS) {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "{} cannot exceed {} cents in either direction",
            field,
            MAX_AMOUNT_CENTS
        )));
    }
    Ok(())
}

pub(crate) fn require_name(name: &str, what: &str) -> Result<(), AppError> {
    if name.trim().is_empty() {
        return Err(AppError::BadRequest(anyhow::anyhow!("{} name is required", what)));
    }
    Ok(())
}

pub(crate) fn validate_night_bounds(
    min_nights: Option<i32>,
    max_nights: Option<i32>,
) -> Result<(), AppError> {
    if let Some(min) = min_nights {
        if min < 1 {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "minNights must be at least 1"
            )));
        }
    }
    if let Some(max) = max_nights {
        if max < 1 {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "maxNights must be at least 1"
            )));
        }
    }
    if let (Some(min), Some(max)) = (min_nights, max_nights) {
        if min > max {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "minNights ({}) cannot exceed maxNights ({})",
                min,
                max
            )));
        }
    }
    Ok(())
}
