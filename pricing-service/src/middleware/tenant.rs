//! Tenant context for campground-scoped routes.
//!
//! Every rule route lives under `/campgrounds/:campground_id`. The id is
//! parsed once here and passed explicitly into store and evaluator calls,
//! so no handler can issue an unscoped query.

use axum::async_trait;
use axum::extract::{FromRequestParts, Path};
use axum::http::request::Parts;
use service_core::error::AppError;
use std::collections::HashMap;
use uuid::Uuid;

const CAMPGROUND_PARAM: &str = "campground_id";

/// The campground (tenant) a request operates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TenantContext {
    pub campground_id: Uuid,
}

fn select_campground() -> AppError {
    AppError::BadRequest(anyhow::anyhow!(
        "Select a campground before managing rules"
    ))
}

#[async_trait]
impl<S> FromRequestParts<S> for TenantContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(params) = Path::<HashMap<String, String>>::from_request_parts(parts, state)
            .await
            .map_err(|_| select_campground())?;

        let campground_id = params
            .get(CAMPGROUND_PARAM)
            .map(|raw| raw.trim())
            .filter(|raw| !raw.is_empty())
            .and_then(|raw| Uuid::parse_str(raw).ok())
            .filter(|id| !id.is_nil())
            .ok_or_else(select_campground)?;

        tracing::Span::current().record("campground_id", tracing::field::display(campground_id));

        Ok(TenantContext { campground_id })
    }
}
