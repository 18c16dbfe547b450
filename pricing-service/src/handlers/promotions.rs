//! Promotion CRUD and redemption.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;
use validator::Validate;

use super::{tracked, RulePath};
use crate::dtos::{
    CreatePromotionRequest, ListQuery, PromotionResponse, RedeemRequest, UpdatePromotionRequest,
};
use crate::middleware::TenantContext;
use crate::models::Promotion;
use crate::services::{record_redemption, record_rule_mutation, store::not_found};
use crate::startup::AppState;

pub async fn list_promotions(
    State(state): State<AppState>,
    tenant: TenantContext,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<PromotionResponse>>, AppError> {
    let filter = query.into_filter()?;
    let promotions = state
        .store
        .list_promotions(tenant.campground_id, &filter)
        .await
        .map_err(tracked("list_promotions"))?;
    Ok(Json(promotions.into_iter().map(PromotionResponse::from).collect()))
}

pub async fn create_promotion(
    State(state): State<AppState>,
    tenant: TenantContext,
    Json(payload): Json<CreatePromotionRequest>,
) -> Result<(StatusCode, Json<PromotionResponse>), AppError> {
    payload.validate()?;
    let promotion = Promotion::new(tenant.campground_id, payload.into_new()?)?;

    let promotion = state
        .store
        .insert_promotion(promotion)
        .await
        .map_err(tracked("create_promotion"))?;
    record_rule_mutation("promotion", "create");

    tracing::info!(
        campground_id = %tenant.campground_id,
        promotion_id = %promotion.id,
        code = %promotion.code,
        "Promotion created"
    );
    Ok((StatusCode::CREATED, Json(promotion.into())))
}

pub async fn get_promotion(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(path): Path<RulePath>,
) -> Result<Json<PromotionResponse>, AppError> {
    let promotion = state
        .store
        .get_promotion(tenant.campground_id, path.id)
        .await?
        .ok_or_else(|| not_found("Promotion", path.id))?;
    Ok(Json(promotion.into()))
}

pub async fn update_promotion(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(path): Path<RulePath>,
    Json(payload): Json<UpdatePromotionRequest>,
) -> Result<Json<PromotionResponse>, AppError> {
    payload.validate()?;
    let mut promotion = state
        .store
        .get_promotion(tenant.campground_id, path.id)
        .await?
        .ok_or_else(|| not_found("Promotion", path.id))?;

    let patch = payload.into_patch(&promotion)?;
    promotion.apply(patch)?;

    let promotion = state
        .store
        .update_promotion(promotion)
        .await
        .map_err(tracked("update_promotion"))?;
    record_rule_mutation("promotion", "update");
    Ok(Json(promotion.into()))
}

pub async fn delete_promotion(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(path): Path<RulePath>,
) -> Result<StatusCode, AppError> {
    state
        .store
        .delete_promotion(tenant.campground_id, path.id)
        .await
        .map_err(tracked("delete_promotion"))?;
    record_rule_mutation("promotion", "delete");
    Ok(StatusCode::NO_CONTENT)
}

/// Atomically check and consume one use of a code. A code that cannot be
/// redeemed is a 422 naming the violated constraint.
pub async fn redeem_promotion(
    State(state): State<AppState>,
    tenant: TenantContext,
    Json(payload): Json<RedeemRequest>,
) -> Result<Json<PromotionResponse>, AppError> {
    payload.validate()?;

    match state
        .store
        .redeem_promotion(tenant.campground_id, &payload.code, payload.as_of())
        .await
    {
        Ok(promotion) => {
            record_redemption("redeemed");
            tracing::info!(
                campground_id = %tenant.campground_id,
                promotion_id = %promotion.id,
                usage_count = promotion.usage_count,
                "Promotion redeemed"
            );
            Ok(Json(promotion.into()))
        }
        Err(e @ AppError::ConstraintViolation { .. }) => {
            record_redemption("rejected");
            tracing::info!(
                campground_id = %tenant.campground_id,
                error = %e,
                "Promotion redemption rejected"
            );
            Err(e)
        }
        Err(e) => {
            record_redemption("error");
            Err(tracked("redeem_promotion")(e))
        }
    }
}
