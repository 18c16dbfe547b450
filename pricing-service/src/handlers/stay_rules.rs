//! Stay rule (min/max nights) CRUD.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;
use validator::Validate;

use super::{tracked, RulePath};
use crate::dtos::{CreateStayRuleRequest, ListQuery, UpdateStayRuleRequest};
use crate::middleware::TenantContext;
use crate::models::StayRule;
use crate::services::{record_rule_mutation, store::not_found};
use crate::startup::AppState;

pub async fn list_stay_rules(
    State(state): State<AppState>,
    tenant: TenantContext,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<StayRule>>, AppError> {
    let filter = query.into_filter()?;
    let rules = state
        .store
        .list_stay_rules(tenant.campground_id, &filter)
        .await
        .map_err(tracked("list_stay_rules"))?;
    Ok(Json(rules))
}

pub async fn create_stay_rule(
    State(state): State<AppState>,
    tenant: TenantContext,
    Json(payload): Json<CreateStayRuleRequest>,
) -> Result<(StatusCode, Json<StayRule>), AppError> {
    payload.validate()?;
    let rule = StayRule::new(tenant.campground_id, payload.into())?;

    let rule = state
        .store
        .insert_stay_rule(rule)
        .await
        .map_err(tracked("create_stay_rule"))?;
    record_rule_mutation("stay_rule", "create");

    tracing::info!(
        campground_id = %tenant.campground_id,
        stay_rule_id = %rule.id,
        min_nights = rule.min_nights,
        max_nights = rule.max_nights,
        "Stay rule created"
    );
    Ok((StatusCode::CREATED, Json(rule)))
}

pub async fn get_stay_rule(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(path): Path<RulePath>,
) -> Result<Json<StayRule>, AppError> {
    state
        .store
        .get_stay_rule(tenant.campground_id, path.id)
        .await?
        .map(Json)
        .ok_or_else(|| not_found("Stay rule", path.id))
}

pub async fn update_stay_rule(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(path): Path<RulePath>,
    Json(payload): Json<UpdateStayRuleRequest>,
) -> Result<Json<StayRule>, AppError> {
    payload.validate()?;
    let mut rule = state
        .store
        .get_stay_rule(tenant.campground_id, path.id)
        .await?
        .ok_or_else(|| not_found("Stay rule", path.id))?;

    rule.apply(payload.into())?;

    let rule = state
        .store
        .update_stay_rule(rule)
        .await
        .map_err(tracked("update_stay_rule"))?;
    record_rule_mutation("stay_rule", "update");
    Ok(Json(rule))
}

pub async fn delete_stay_rule(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(path): Path<RulePath>,
) -> Result<StatusCode, AppError> {
    state
        .store
        .delete_stay_rule(tenant.campground_id, path.id)
        .await
        .map_err(tracked("delete_stay_rule"))?;
    record_rule_mutation("stay_rule", "delete");
    Ok(StatusCode::NO_CONTENT)
}
