//! Blackout dates and site closures. `status` is derived from today's date
//! on every read.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use service_core::error::AppError;
use validator::Validate;

use super::{tracked, RulePath};
use crate::dtos::{BlackoutResponse, CreateBlackoutRequest, ListQuery, UpdateBlackoutRequest};
use crate::middleware::TenantContext;
use crate::models::Blackout;
use crate::services::{record_rule_mutation, store::not_found};
use crate::startup::AppState;

pub async fn list_blackouts(
    State(state): State<AppState>,
    tenant: TenantContext,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<BlackoutResponse>>, AppError> {
    let filter = query.into_filter()?;
    let today = Utc::now().date_naive();
    let blackouts = state
        .store
        .list_blackouts(tenant.campground_id, &filter, today)
        .await
        .map_err(tracked("list_blackouts"))?;
    Ok(Json(
        blackouts
            .into_iter()
            .map(|b| BlackoutResponse::new(b, today))
            .collect(),
    ))
}

pub async fn create_blackout(
    State(state): State<AppState>,
    tenant: TenantContext,
    Json(payload): Json<CreateBlackoutRequest>,
) -> Result<(StatusCode, Json<BlackoutResponse>), AppError> {
    payload.validate()?;
    let blackout = Blackout::new(tenant.campground_id, payload.into())?;

    let blackout = state
        .store
        .insert_blackout(blackout)
        .await
        .map_err(tracked("create_blackout"))?;
    record_rule_mutation("blackout", "create");

    tracing::info!(
        campground_id = %tenant.campground_id,
        blackout_id = %blackout.id,
        park_wide = blackout.is_park_wide(),
        reason = %blackout.reason,
        "Blackout created"
    );
    Ok((
        StatusCode::CREATED,
        Json(BlackoutResponse::new(blackout, Utc::now().date_naive())),
    ))
}

pub async fn get_blackout(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(path): Path<RulePath>,
) -> Result<Json<BlackoutResponse>, AppError> {
    let blackout = state
        .store
        .get_blackout(tenant.campground_id, path.id)
        .await?
        .ok_or_else(|| not_found("Blackout", path.id))?;
    Ok(Json(BlackoutResponse::new(blackout, Utc::now().date_naive())))
}

/// Also serves the `{ "isActive": false }` toggle.
pub async fn update_blackout(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(path): Path<RulePath>,
    Json(payload): Json<UpdateBlackoutRequest>,
) -> Result<Json<BlackoutResponse>, AppError> {
    payload.validate()?;
    let mut blackout = state
        .store
        .get_blackout(tenant.campground_id, path.id)
        .await?
        .ok_or_else(|| not_found("Blackout", path.id))?;

    blackout.apply(payload.into())?;

    let blackout = state
        .store
        .update_blackout(blackout)
        .await
        .map_err(tracked("update_blackout"))?;
    record_rule_mutation("blackout", "update");
    Ok(Json(BlackoutResponse::new(blackout, Utc::now().date_naive())))
}

pub async fn delete_blackout(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(path): Path<RulePath>,
) -> Result<StatusCode, AppError> {
    state
        .store
        .delete_blackout(tenant.campground_id, path.id)
        .await
        .map_err(tracked("delete_blackout"))?;
    record_rule_mutation("blackout", "delete");
    Ok(StatusCode::NO_CONTENT)
}
