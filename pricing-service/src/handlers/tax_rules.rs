//! Tax rule CRUD, scoped to the campground in the path.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;
use validator::Validate;

use super::{tracked, RulePath};
use crate::dtos::{CreateTaxRuleRequest, ListQuery, TaxRuleResponse, UpdateTaxRuleRequest};
use crate::middleware::TenantContext;
use crate::models::TaxRule;
use crate::services::{record_rule_mutation, store::not_found};
use crate::startup::AppState;

pub async fn list_tax_rules(
    State(state): State<AppState>,
    tenant: TenantContext,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<TaxRuleResponse>>, AppError> {
    let filter = query.into_filter()?;
    let rules = state
        .store
        .list_tax_rules(tenant.campground_id, &filter)
        .await
        .map_err(tracked("list_tax_rules"))?;
    Ok(Json(rules.into_iter().map(TaxRuleResponse::from).collect()))
}

pub async fn create_tax_rule(
    State(state): State<AppState>,
    tenant: TenantContext,
    Json(payload): Json<CreateTaxRuleRequest>,
) -> Result<(StatusCode, Json<TaxRuleResponse>), AppError> {
    payload.validate()?;
    let rule = TaxRule::new(tenant.campground_id, payload.into_new()?)?;

    let rule = state
        .store
        .insert_tax_rule(rule)
        .await
        .map_err(tracked("create_tax_rule"))?;
    record_rule_mutation("tax_rule", "create");

    tracing::info!(
        campground_id = %tenant.campground_id,
        tax_rule_id = %rule.id,
        rule_type = rule.rule_type.as_str(),
        "Tax rule created"
    );
    Ok((StatusCode::CREATED, Json(rule.into())))
}

pub async fn get_tax_rule(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(path): Path<RulePath>,
) -> Result<Json<TaxRuleResponse>, AppError> {
    let rule = state
        .store
        .get_tax_rule(tenant.campground_id, path.id)
        .await?
        .ok_or_else(|| not_found("Tax rule", path.id))?;
    Ok(Json(rule.into()))
}

pub async fn update_tax_rule(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(path): Path<RulePath>,
    Json(payload): Json<UpdateTaxRuleRequest>,
) -> Result<Json<TaxRuleResponse>, AppError> {
    payload.validate()?;
    let mut rule = state
        .store
        .get_tax_rule(tenant.campground_id, path.id)
        .await?
        .ok_or_else(|| not_found("Tax rule", path.id))?;

    let patch = payload.into_patch(&rule)?;
    rule.apply(patch)?;

    let rule = state
        .store
        .update_tax_rule(rule)
        .await
        .map_err(tracked("update_tax_rule"))?;
    record_rule_mutation("tax_rule", "update");
    Ok(Json(rule.into()))
}

pub async fn delete_tax_rule(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(path): Path<RulePath>,
) -> Result<StatusCode, AppError> {
    state
        .store
        .delete_tax_rule(tenant.campground_id, path.id)
        .await
        .map_err(tracked("delete_tax_rule"))?;
    record_rule_mutation("tax_rule", "delete");

    tracing::info!(
        campground_id = %tenant.campground_id,
        tax_rule_id = %path.id,
        "Tax rule deleted"
    );
    Ok(StatusCode::NO_CONTENT)
}
