//! Constraint violations reported to booking callers.

use chrono::NaiveDate;
use serde::Serialize;
use service_core::error::AppError;
use thiserror::Error;
use uuid::Uuid;

use super::blackout::ClosureReason;

/// The single concrete reason a stay or redemption was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
    #[error("Closed from {start_date} to {end_date} ({reason})")]
    #[serde(rename_all = "camelCase")]
    Blackout {
        blackout_id: Uuid,
        start_date: NaiveDate,
        end_date: NaiveDate,
        reason: ClosureReason,
    },

    #[error("Stay of {nights} nights is shorter than the {min_nights}-night minimum")]
    #[serde(rename_all = "camelCase")]
    StayTooShort {
        nights: i64,
        min_nights: i32,
        rule_id: Option<Uuid>,
    },

    #[error("Stay of {nights} nights is longer than the {max_nights}-night maximum")]
    #[serde(rename_all = "camelCase")]
    StayTooLong {
        nights: i64,
        max_nights: i32,
        rule_id: Option<Uuid>,
    },

    #[error("Promotion code {code} is not recognized")]
    PromotionUnknown { code: String },

    #[error("Promotion code {code} is not active")]
    PromotionInactive { code: String },

    #[error("Promotion code {code} is not valid until {valid_from}")]
    #[serde(rename_all = "camelCase")]
    PromotionNotYetValid { code: String, valid_from: NaiveDate },

    #[error("Promotion code {code} expired on {valid_to}")]
    #[serde(rename_all = "camelCase")]
    PromotionExpired { code: String, valid_to: NaiveDate },

    #[error("Promotion code {code} has reached its usage limit of {usage_limit}")]
    #[serde(rename_all = "camelCase")]
    PromotionUsageLimitExceeded { code: String, usage_limit: i32 },
}

impl Violation {
    pub fn kind(&self) -> &'static str {
        match self {
            Violation::Blackout { .. } => "blackout",
            Violation::StayTooShort { .. } => "stay_too_short",
            Violation::StayTooLong { .. } => "stay_too_long",
            Violation::PromotionUnknown { .. } => "promotion_unknown",
            Violation::PromotionInactive { .. } => "promotion_inactive",
            Violation::PromotionNotYetValid { .. } => "promotion_not_yet_valid",
            Violation::PromotionExpired { .. } => "promotion_expired",
            Violation::PromotionUsageLimitExceeded { .. } => "promotion_usage_limit_exceeded",
        }
    }
}

impl From<Violation> for AppError {
    fn from(violation: Violation) -> Self {
        let message = violation.to_string();
        let violation = serde_json::to_value(&violation)
            .unwrap_or_else(|_| serde_json::json!({ "kind": violation.kind() }));
        AppError::ConstraintViolation { message, violation }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_violation_serializes_with_kind_tag() {
        let v = Violation::PromotionUsageLimitExceeded {
            code: "SUMMER20".to_string(),
            usage_limit: 5,
        };
        let json = serde_json::to_value(&v).unwrap();
        assert_eq!(json["kind"], "promotion_usage_limit_exceeded");
        assert_eq!(json["usageLimit"], 5);
        assert_eq!(json["code"], "SUMMER20");
    }

    #[test]
    fn test_into_app_error() {
        let err: AppError = Violation::StayTooShort {
            nights: 3,
            min_nights: 7,
            rule_id: None,
        }
        .into();
        match err {
            AppError::ConstraintViolation { message, violation } => {
                assert!(message.contains("7-night minimum"));
                assert_eq!(violation["kind"], "stay_too_short");
                assert_eq!(violation["minNights"], 7);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
