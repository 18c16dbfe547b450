use axum::{extract::State, Json};
use service_core::error::AppError;
use validator::Validate;

use super::tracked;
use crate::dtos::{AdmissionRequestBody, AdmissionResponse};
use crate::middleware::TenantContext;
use crate::services::{admit, has_base_rate, price_stay, record_admission};
use crate::startup::AppState;

/// Decide whether a stay may be booked. Rejections are a 200 with the
/// violation in the body; admitted stays carry a preview quote when a base
/// rate is available and the stay is short enough to quote.
pub async fn check_admission(
    State(state): State<AppState>,
    tenant: TenantContext,
    Json(payload): Json<AdmissionRequestBody>,
) -> Result<Json<AdmissionResponse>, AppError> {
    payload.validate()?;
    let (admission, pricing) = payload.to_requests()?;
    let rules = state
        .store
        .load_rule_set(tenant.campground_id)
        .await
        .map_err(tracked("check_admission"))?;

    let decision = admit(&rules, &admission, state.defaults);

    let quote = match &decision.outcome {
        Ok(promotion)
            if pricing.stay.nights() <= state.max_quote_nights
                && has_base_rate(&rules, &pricing) =>
        {
            Some(
                price_stay(&rules, &pricing, promotion.as_ref())
                    .map_err(tracked("check_admission"))?,
            )
        }
        _ => None,
    };

    match &decision.outcome {
        Ok(_) => {
            record_admission("admitted");
            tracing::info!(
                campground_id = %tenant.campground_id,
                nights = admission.stay.nights(),
                "Stay admitted"
            );
        }
        Err(violation) => {
            record_admission("rejected");
            tracing::info!(
                campground_id = %tenant.campground_id,
                nights = admission.stay.nights(),
                violation = violation.kind(),
                "Stay rejected"
            );
        }
    }

    Ok(Json(AdmissionResponse::new(&admission, decision, quote)))
}
