use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;
use validator::Validate;

use super::{tracked, RulePath};
use crate::dtos::{
    CreateSeasonalRateRequest, ListQuery, SeasonalRateResponse, UpdateSeasonalRateRequest,
};
use crate::middleware::TenantContext;
use crate::models::SeasonalRate;
use crate::services::{record_rule_mutation, store::not_found};
use crate::startup::AppState;

pub async fn list_seasonal_rates(
    State(state): State<AppState>,
    tenant: TenantContext,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<SeasonalRateResponse>>, AppError> {
    let filter = query.into_filter()?;
    let rates = state
        .store
        .list_seasonal_rates(tenant.campground_id, &filter)
        .await
        .map_err(tracked("list_seasonal_rates"))?;
    Ok(Json(rates.into_iter().map(SeasonalRateResponse::from).collect()))
}

pub async fn create_seasonal_rate(
    State(state): State<AppState>,
    tenant: TenantContext,
    Json(payload): Json<CreateSeasonalRateRequest>,
) -> Result<(StatusCode, Json<SeasonalRateResponse>), AppError> {
    payload.validate()?;
    let rate = SeasonalRate::new(tenant.campground_id, payload.into_new()?)?;

    let rate = state
        .store
        .insert_seasonal_rate(rate)
        .await
        .map_err(tracked("create_seasonal_rate"))?;
    record_rule_mutation("seasonal_rate", "create");
    Ok((StatusCode::CREATED, Json(rate.into())))
}

pub async fn get_seasonal_rate(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(path): Path<RulePath>,
) -> Result<Json<SeasonalRateResponse>, AppError> {
    let rate = state
        .store
        .get_seasonal_rate(tenant.campground_id, path.id)
        .await?
        .ok_or_else(|| not_found("Seasonal rate", path.id))?;
    Ok(Json(rate.into()))
}

pub async fn update_seasonal_rate(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(path): Path<RulePath>,
    Json(payload): Json<UpdateSeasonalRateRequest>,
) -> Result<Json<SeasonalRateResponse>, AppError> {
    payload.validate()?;
    let mut rate = state
        .store
        .get_seasonal_rate(tenant.campground_id, path.id)
        .await?
        .ok_or_else(|| not_found("Seasonal rate", path.id))?;

    rate.apply(payload.into_patch()?)?;

    let rate = state
        .store
        .update_seasonal_rate(rate)
        .await
        .map_err(tracked("update_seasonal_rate"))?;
    record_rule_mutation("seasonal_rate", "update");
    Ok(Json(rate.into()))
}

pub async fn delete_seasonal_rate(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(path): Path<RulePath>,
) -> Result<StatusCode, AppError> {
    state
        .store
        .delete_seasonal_rate(tenant.campground_id, path.id)
        .await
        .map_err(tracked("delete_seasonal_rate"))?;
    record_rule_mutation("seasonal_rate", "delete");
    Ok(StatusCode::NO_CONTENT)
}
