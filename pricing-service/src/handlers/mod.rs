//! HTTP handlers for pricing-service.

pub mod admissions;
pub mod blackouts;
pub mod pricing_rules;
pub mod promotions;
pub mod quotes;
pub mod seasonal_rates;
pub mod stay_rules;
pub mod tax_rules;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Deserialize;
use serde_json::json;
use service_core::error::AppError;
use uuid::Uuid;

use crate::services::{get_metrics, record_error};
use crate::startup::AppState;

/// `:id` of a rule under `/campgrounds/:campground_id`. The campground
/// segment is read by [`crate::middleware::TenantContext`].
#[derive(Debug, Deserialize)]
pub struct RulePath {
    pub id: Uuid,
}

/// Count a failed operation before handing the error back to axum.
pub(crate) fn tracked(operation: &'static str) -> impl FnOnce(AppError) -> AppError {
    move |e| {
        record_error(e.kind(), operation);
        e
    }
}

/// Liveness probe; also verifies the rule store answers.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    match state.store.health_check().await {
        Ok(_) => {
            tracing::debug!("Health check passed");
            (
                StatusCode::OK,
                Json(json!({
                    "status": "ok",
                    "service": "pricing-service",
                    "version": env!("CARGO_PKG_VERSION")
                })),
            )
        }
        Err(e) => {
            tracing::warn!(error = %e, "Health check failed - rule store unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "unhealthy",
                    "service": "pricing-service",
                    "error": e.to_string()
                })),
            )
        }
    }
}

pub async fn readiness_check(State(state): State<AppState>) -> StatusCode {
    match state.store.health_check().await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

/// Metrics endpoint for Prometheus scraping.
pub async fn metrics_handler() -> Result<impl IntoResponse, AppError> {
    let metrics = get_metrics()?;
    Ok((
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
        metrics,
    ))
}
