//! Quote issuance. Issued quotes are stored as snapshots so later rule
//! edits never change them.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;
use validator::Validate;

use super::{tracked, RulePath};
use crate::dtos::QuoteRequestBody;
use crate::middleware::TenantContext;
use crate::models::Quote;
use crate::services::constraints::check_promotion;
use crate::services::{price_stay, record_quote, store::not_found};
use crate::startup::AppState;

/// Price a stay and persist the quote. An unusable promotion code is a 422;
/// stay-length and blackout checks belong to `/admissions`. Stays beyond
/// `max_quote_nights` are refused outright.
pub async fn create_quote(
    State(state): State<AppState>,
    tenant: TenantContext,
    Json(payload): Json<QuoteRequestBody>,
) -> Result<(StatusCode, Json<Quote>), AppError> {
    payload.validate()?;
    let request = payload.to_pricing_request()?;
    request.stay.ensure_at_most(state.max_quote_nights)?;
    let rules = state
        .store
        .load_rule_set(tenant.campground_id)
        .await
        .map_err(tracked("create_quote"))?;

    let promotion = match payload
        .promotion_code()
        .map(|code| check_promotion(&rules, code, payload.as_of()))
        .transpose()
    {
        Ok(promotion) => promotion,
        Err(violation) => {
            record_quote("rejected");
            return Err(violation.into());
        }
    };

    let quote = price_stay(&rules, &request, promotion).map_err(|e| {
        record_quote("error");
        tracked("create_quote")(e)
    })?;
    let quote = state
        .store
        .insert_quote(quote)
        .await
        .map_err(tracked("create_quote"))?;
    record_quote("issued");

    tracing::info!(
        campground_id = %tenant.campground_id,
        quote_id = %quote.id,
        nights = quote.nights,
        total_cents = quote.total_cents,
        "Quote issued"
    );
    Ok((StatusCode::CREATED, Json(quote)))
}

pub async fn get_quote(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(path): Path<RulePath>,
) -> Result<Json<Quote>, AppError> {
    state
        .store
        .get_quote(tenant.campground_id, path.id)
        .await?
        .map(Json)
        .ok_or_else(|| not_found("Quote", path.id))
}
