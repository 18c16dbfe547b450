//! Pricing rule CRUD. Lists come back in evaluation order.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;
use validator::Validate;

use super::{tracked, RulePath};
use crate::dtos::{
    CreatePricingRuleRequest, ListQuery, PricingRuleResponse, UpdatePricingRuleRequest,
};
use crate::middleware::TenantContext;
use crate::models::PricingRule;
use crate::services::{record_rule_mutation, store::not_found};
use crate::startup::AppState;

pub async fn list_pricing_rules(
    State(state): State<AppState>,
    tenant: TenantContext,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<PricingRuleResponse>>, AppError> {
    let filter = query.into_filter()?;
    let rules = state
        .store
        .list_pricing_rules(tenant.campground_id, &filter)
        .await
        .map_err(tracked("list_pricing_rules"))?;
    Ok(Json(rules.into_iter().map(PricingRuleResponse::from).collect()))
}

pub async fn create_pricing_rule(
    State(state): State<AppState>,
    tenant: TenantContext,
    Json(payload): Json<CreatePricingRuleRequest>,
) -> Result<(StatusCode, Json<PricingRuleResponse>), AppError> {
    payload.validate()?;
    let rule = PricingRule::new(tenant.campground_id, payload.into_new()?)?;

    let rule = state
        .store
        .insert_pricing_rule(rule)
        .await
        .map_err(tracked("create_pricing_rule"))?;
    record_rule_mutation("pricing_rule", "create");

    tracing::info!(
        campground_id = %tenant.campground_id,
        pricing_rule_id = %rule.id,
        priority = rule.priority,
        stack_mode = rule.stack_mode.as_str(),
        "Pricing rule created"
    );
    Ok((StatusCode::CREATED, Json(rule.into())))
}

pub async fn get_pricing_rule(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(path): Path<RulePath>,
) -> Result<Json<PricingRuleResponse>, AppError> {
    let rule = state
        .store
        .get_pricing_rule(tenant.campground_id, path.id)
        .await?
        .ok_or_else(|| not_found("Pricing rule", path.id))?;
    Ok(Json(rule.into()))
}

pub async fn update_pricing_rule(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(path): Path<RulePath>,
    Json(payload): Json<UpdatePricingRuleRequest>,
) -> Result<Json<PricingRuleResponse>, AppError> {
    payload.validate()?;
    let mut rule = state
        .store
        .get_pricing_rule(tenant.campground_id, path.id)
        .await?
        .ok_or_else(|| not_found("Pricing rule", path.id))?;

    let patch = payload.into_patch(&rule)?;
    rule.apply(patch)?;

    let rule = state
        .store
        .update_pricing_rule(rule)
        .await
        .map_err(tracked("update_pricing_rule"))?;
    record_rule_mutation("pricing_rule", "update");
    Ok(Json(rule.into()))
}

pub async fn delete_pricing_rule(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(path): Path<RulePath>,
) -> Result<StatusCode, AppError> {
    state
        .store
        .delete_pricing_rule(tenant.campground_id, path.id)
        .await
        .map_err(tracked("delete_pricing_rule"))?;
    record_rule_mutation("pricing_rule", "delete");
    Ok(StatusCode::NO_CONTENT)
}
