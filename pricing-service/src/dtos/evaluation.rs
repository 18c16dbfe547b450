//! Quote, admission and redemption payloads.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use uuid::Uuid;
use validator::Validate;

use crate::models::{Quote, Stay, Violation};
use crate::services::{AdmissionDecision, AdmissionRequest, NightBounds, PricingRequest};

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Lead time defaults to the days between `as_of` and arrival.
fn lead_time(explicit: Option<i64>, as_of: NaiveDate, arrival: NaiveDate) -> i64 {
    explicit.unwrap_or_else(|| (arrival - as_of).num_days())
}

fn check_occupancy(occupancy: Option<Decimal>) -> Result<(), AppError> {
    match occupancy {
        Some(fraction) if fraction < Decimal::ZERO || fraction > Decimal::ONE => Err(
            AppError::BadRequest(anyhow::anyhow!("occupancyFraction must be between 0 and 1")),
        ),
        _ => Ok(()),
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequestBody {
    pub site_class_id: Option<String>,
    pub site_id: Option<String>,
    pub arrival_date: NaiveDate,
    pub departure_date: NaiveDate,
    #[validate(range(min = 0, message = "leadTimeDays cannot be negative"))]
    pub lead_time_days: Option<i64>,
    /// Reference date for lead time and promotion windows; defaults to today (UTC).
    pub as_of: Option<NaiveDate>,
    pub occupancy_fraction: Option<Decimal>,
    #[validate(range(
        min = 0,
        max = 10_000_000_000_i64,
        message = "baseRateCents must be between 0 and 10000000000"
    ))]
    pub base_rate_cents: Option<i64>,
    pub promotion_code: Option<String>,
    #[serde(default)]
    pub tax_waiver_signed: bool,
}

impl QuoteRequestBody {
    pub fn as_of(&self) -> NaiveDate {
        self.as_of.unwrap_or_else(today)
    }

    pub fn promotion_code(&self) -> Option<&str> {
        self.promotion_code
            .as_deref()
            .filter(|code| !code.trim().is_empty())
    }

    pub fn to_pricing_request(&self) -> Result<PricingRequest, AppError> {
        check_occupancy(self.occupancy_fraction)?;
        let stay = Stay::new(self.arrival_date, self.departure_date)?;
        Ok(PricingRequest {
            site_class_id: self.site_class_id.clone(),
            site_id: self.site_id.clone(),
            lead_time_days: lead_time(self.lead_time_days, self.as_of(), stay.arrival),
            stay,
            occupancy_fraction: self.occupancy_fraction,
            base_rate_cents: self.base_rate_cents,
            tax_waiver_signed: self.tax_waiver_signed,
        })
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionRequestBody {
    pub site_class_id: Option<String>,
    pub site_id: Option<String>,
    pub arrival_date: NaiveDate,
    pub departure_date: NaiveDate,
    #[validate(range(min = 0, message = "leadTimeDays cannot be negative"))]
    pub lead_time_days: Option<i64>,
    pub as_of: Option<NaiveDate>,
    pub promotion_code: Option<String>,
    /// Pricing inputs for the quote attached to an admitted stay.
    pub occupancy_fraction: Option<Decimal>,
    #[validate(range(
        min = 0,
        max = 10_000_000_000_i64,
        message = "baseRateCents must be between 0 and 10000000000"
    ))]
    pub base_rate_cents: Option<i64>,
    #[serde(default)]
    pub tax_waiver_signed: bool,
}

impl AdmissionRequestBody {
    pub fn to_requests(&self) -> Result<(AdmissionRequest, PricingRequest), AppError> {
        check_occupancy(self.occupancy_fraction)?;
        let stay = Stay::new(self.arrival_date, self.departure_date)?;
        let as_of = self.as_of.unwrap_or_else(today);
        let lead_time_days = lead_time(self.lead_time_days, as_of, stay.arrival);

        let admission = AdmissionRequest {
            site_class_id: self.site_class_id.clone(),
            site_id: self.site_id.clone(),
            stay,
            lead_time_days,
            promotion_code: self.promotion_code.clone(),
            as_of,
        };
        let pricing = PricingRequest {
            site_class_id: self.site_class_id.clone(),
            site_id: self.site_id.clone(),
            stay,
            lead_time_days,
            occupancy_fraction: self.occupancy_fraction,
            base_rate_cents: self.base_rate_cents,
            tax_waiver_signed: self.tax_waiver_signed,
        };
        Ok((admission, pricing))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionBounds {
    pub min_nights: i32,
    pub max_nights: i32,
    pub min_rule_id: Option<Uuid>,
    pub max_rule_id: Option<Uuid>,
    pub stay_rule_ids: Vec<Uuid>,
}

impl From<NightBounds> for AdmissionBounds {
    fn from(bounds: NightBounds) -> Self {
        Self {
            min_nights: bounds.min_nights,
            max_nights: bounds.max_nights,
            min_rule_id: bounds.min_rule_id,
            max_rule_id: bounds.max_rule_id,
            stay_rule_ids: bounds.rule_ids,
        }
    }
}

/// A rejection is a normal outcome, so it is reported in the body rather
/// than as an error status.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionResponse {
    pub admitted: bool,
    pub nights: i64,
    pub lead_time_days: i64,
    pub bounds: AdmissionBounds,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub violation: Option<Violation>,
    /// Preview pricing for an admitted stay. Not persisted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quote: Option<Quote>,
}

impl AdmissionResponse {
    pub fn new(request: &AdmissionRequest, decision: AdmissionDecision, quote: Option<Quote>) -> Self {
        Self {
            admitted: decision.admitted(),
            nights: request.stay.nights(),
            lead_time_days: request.lead_time_days,
            bounds: decision.bounds.into(),
            violation: decision.outcome.err(),
            quote,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RedeemRequest {
    #[validate(length(min = 1, max = 50, message = "Code is required"))]
    pub code: String,
    pub as_of: Option<NaiveDate>,
}

impl RedeemRequest {
    pub fn as_of(&self) -> NaiveDate {
        self.as_of.unwrap_or_else(today)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lead_time_defaults_to_days_until_arrival() {
        let body: QuoteRequestBody = serde_json::from_value(serde_json::json!({
            "arrivalDate": "2026-07-10",
            "departureDate": "2026-07-13",
            "asOf": "2026-06-30",
            "baseRateCents": 4000
        }))
        .unwrap();
        let request = body.to_pricing_request().unwrap();
        assert_eq!(request.lead_time_days, 10);
        assert_eq!(request.stay.nights(), 3);
    }

    #[test]
    fn test_explicit_lead_time_wins() {
        let body: AdmissionRequestBody = serde_json::from_value(serde_json::json!({
            "siteClassId": "RV",
            "arrivalDate": "2026-07-10",
            "departureDate": "2026-07-13",
            "leadTimeDays": 5,
            "asOf": "2026-06-01"
        }))
        .unwrap();
        let (admission, pricing) = body.to_requests().unwrap();
        assert_eq!(admission.lead_time_days, 5);
        assert_eq!(pricing.lead_time_days, 5);
        assert_eq!(admission.as_of, NaiveDate::from_ymd_opt(2026, 6, 1).unwrap());
    }

    #[test]
    fn test_occupancy_outside_unit_interval_is_rejected() {
        let body: QuoteRequestBody = serde_json::from_value(serde_json::json!({
            "arrivalDate": "2026-07-10",
            "departureDate": "2026-07-11",
            "occupancyFraction": 1.5
        }))
        .unwrap();
        assert!(matches!(
            body.to_pricing_request(),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn test_blank_promotion_code_is_ignored() {
        let body: QuoteRequestBody = serde_json::from_value(serde_json::json!({
            "arrivalDate": "2026-07-10",
            "departureDate": "2026-07-11",
            "promotionCode": "  "
        }))
        .unwrap();
        assert_eq!(body.promotion_code(), None);
    }
}
