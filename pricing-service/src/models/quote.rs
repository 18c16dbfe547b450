//! Issued quotes. A quote is an immutable snapshot of the rates computed at
//! issue time; later rule edits never change it.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::tax_rule::TaxRuleType;

/// One stayed night.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NightlyRate {
    pub date: NaiveDate,
    pub base_cents: i64,
    /// Composed adjustment in cents, before caps.
    pub adjustment_cents: i64,
    pub rate_cents: i64,
    /// True when a rate cap or the zero floor changed the rate.
    pub capped: bool,
    pub applied_rule_ids: Vec<Uuid>,
    /// Rules whose min or max cap changed the rate.
    #[serde(default)]
    pub cap_rule_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxLine {
    pub tax_rule_id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub rule_type: TaxRuleType,
    pub rate: Option<Decimal>,
    pub amount_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedPromotion {
    pub promotion_id: Uuid,
    pub code: String,
    pub discount_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub id: Uuid,
    pub campground_id: Uuid,
    pub site_class_id: Option<String>,
    pub site_id: Option<String>,
    pub arrival_date: NaiveDate,
    pub departure_date: NaiveDate,
    pub nights: i64,
    pub lead_time_days: i64,
    pub occupancy_fraction: Option<Decimal>,
    pub nightly: Vec<NightlyRate>,
    pub subtotal_cents: i64,
    pub promotion: Option<AppliedPromotion>,
    pub discount_cents: i64,
    pub taxes: Vec<TaxLine>,
    /// The exemption rule that waived all taxes, if any.
    pub tax_exemption_rule_id: Option<Uuid>,
    pub tax_total_cents: i64,
    pub total_cents: i64,
    pub average_nightly_cents: i64,
    pub created_utc: DateTime<Utc>,
}

impl Quote {
    /// Pricing rules that adjusted or capped at least one night, in
    /// first-applied order.
    pub fn pricing_rule_ids(&self) -> Vec<Uuid> {
        let mut ids = Vec::new();
        for night in &self.nightly {
            for id in night.applied_rule_ids.iter().chain(&night.cap_rule_ids) {
                if !ids.contains(id) {
                    ids.push(*id);
                }
            }
        }
        ids
    }

    /// Tax rules that charged or waived tax on this quote.
    pub fn tax_rule_ids(&self) -> Vec<Uuid> {
        self.tax_exemption_rule_id
            .into_iter()
            .chain(self.taxes.iter().map(|t| t.tax_rule_id))
            .collect()
    }
}
