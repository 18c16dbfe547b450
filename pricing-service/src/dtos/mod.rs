//! Request and response bodies for the REST surface.
//!
//! Field names are camelCase on the wire. Rule payloads accept either the
//! canonical stored value or the value as staff typed it.

mod evaluation;
mod rules;

use serde::{Deserialize, Deserializer};
use service_core::error::AppError;

use crate::models::{BlackoutStatus, ListFilter};

pub use evaluation::{
    AdmissionBounds, AdmissionRequestBody, AdmissionResponse, QuoteRequestBody, RedeemRequest,
};
pub use rules::{
    BlackoutResponse, CreateBlackoutRequest, CreatePricingRuleRequest, CreatePromotionRequest,
    CreateSeasonalRateRequest, CreateStayRuleRequest, CreateTaxRuleRequest, PricingRuleResponse,
    PromotionResponse, SeasonalRateResponse, TaxRuleResponse, UpdateBlackoutRequest,
    UpdatePricingRuleRequest, UpdatePromotionRequest, UpdateSeasonalRateRequest,
    UpdateStayRuleRequest, UpdateTaxRuleRequest,
};

/// Distinguishes an absent field (`None`) from an explicit `null`
/// (`Some(None)`) so PATCH bodies can clear nullable columns.
pub(crate) fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

pub(crate) fn default_true() -> bool {
    true
}

/// Query string accepted by every list endpoint.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub active: Option<bool>,
    pub site_class_id: Option<String>,
    pub status: Option<String>,
}

impl ListQuery {
    pub fn into_filter(self) -> Result<ListFilter, AppError> {
        let status = self
            .status
            .as_deref()
            .map(|s| {
                BlackoutStatus::parse(s).ok_or_else(|| {
                    AppError::BadRequest(anyhow::anyhow!(
                        "status must be one of past, active, upcoming"
                    ))
                })
            })
            .transpose()?;
        Ok(ListFilter {
            active: self.active,
            site_class_id: self.site_class_id.filter(|s| !s.trim().is_empty()),
            status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Patch {
        #[serde(default, deserialize_with = "double_option")]
        note: Option<Option<String>>,
    }

    #[test]
    fn test_double_option_distinguishes_null_from_absent() {
        let absent: Patch = serde_json::from_str("{}").unwrap();
        let cleared: Patch = serde_json::from_str(r#"{"note":null}"#).unwrap();
        let set: Patch = serde_json::from_str(r#"{"note":"gate code"}"#).unwrap();

        assert_eq!(absent.note, None);
        assert_eq!(cleared.note, Some(None));
        assert_eq!(set.note, Some(Some("gate code".to_string())));
    }

    #[test]
    fn test_list_query_rejects_unknown_status() {
        let query = ListQuery {
            status: Some("soon".to_string()),
            ..Default::default()
        };
        assert!(matches!(query.into_filter(), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_list_query_drops_blank_site_class() {
        let query = ListQuery {
            active: Some(true),
            site_class_id: Some("  ".to_string()),
            status: Some("upcoming".to_string()),
        };
        let filter = query.into_filter().unwrap();
        assert_eq!(filter.active, Some(true));
        assert_eq!(filter.site_class_id, None);
        assert_eq!(filter.status, Some(BlackoutStatus::Upcoming));
    }
}
