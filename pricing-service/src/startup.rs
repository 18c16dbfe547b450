//! Application startup and lifecycle management.

use std::sync::Arc;

use axum::{
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::metrics::metrics_middleware;
use service_core::middleware::tracing::{http_request_span, request_id_middleware};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::config::PricingConfig;
use crate::handlers::{
    admissions, blackouts, health_check, metrics_handler, pricing_rules, promotions, quotes,
    readiness_check, seasonal_rates, stay_rules, tax_rules,
};
use crate::services::{Database, MemoryStore, RuleStore, StayDefaults};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RuleStore>,
    pub defaults: StayDefaults,
    pub max_quote_nights: i64,
}

/// Every rule family lives under its campground.
fn campground_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/tax-rules",
            get(tax_rules::list_tax_rules).post(tax_rules::create_tax_rule),
        )
        .route(
            "/tax-rules/:id",
            get(tax_rules::get_tax_rule)
                .patch(tax_rules::update_tax_rule)
                .delete(tax_rules::delete_tax_rule),
        )
        .route(
            "/pricing-rules",
            get(pricing_rules::list_pricing_rules).post(pricing_rules::create_pricing_rule),
        )
        .route(
            "/pricing-rules/:id",
            get(pricing_rules::get_pricing_rule)
                .patch(pricing_rules::update_pricing_rule)
                .delete(pricing_rules::delete_pricing_rule),
        )
        .route(
            "/seasonal-rates",
            get(seasonal_rates::list_seasonal_rates).post(seasonal_rates::create_seasonal_rate),
        )
        .route(
            "/seasonal-rates/:id",
            get(seasonal_rates::get_seasonal_rate)
                .patch(seasonal_rates::update_seasonal_rate)
                .delete(seasonal_rates::delete_seasonal_rate),
        )
        .route(
            "/stay-rules",
            get(stay_rules::list_stay_rules).post(stay_rules::create_stay_rule),
        )
        .route(
            "/stay-rules/:id",
            get(stay_rules::get_stay_rule)
                .patch(stay_rules::update_stay_rule)
                .delete(stay_rules::delete_stay_rule),
        )
        .route(
            "/blackouts",
            get(blackouts::list_blackouts).post(blackouts::create_blackout),
        )
        .route(
            "/blackouts/:id",
            get(blackouts::get_blackout)
                .patch(blackouts::update_blackout)
                .delete(blackouts::delete_blackout),
        )
        .route(
            "/promotions",
            get(promotions::list_promotions).post(promotions::create_promotion),
        )
        .route("/promotions/redeem", post(promotions::redeem_promotion))
        .route(
            "/promotions/:id",
            get(promotions::get_promotion)
                .patch(promotions::update_promotion)
                .delete(promotions::delete_promotion),
        )
        .route("/quotes", post(quotes::create_quote))
        .route("/quotes/:id", get(quotes::get_quote))
        .route("/admissions", post(admissions::check_admission))
}

/// Build the full HTTP router. Exposed so tests can drive it without a
/// listener.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/metrics", get(metrics_handler))
        .nest("/campgrounds/:campground_id", campground_routes())
        // Route templates are only known once a route matched
        .route_layer(from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(http_request_span::<axum::body::Body>))
        // Outermost so the span above sees the request id
        .layer(from_fn(request_id_middleware))
        .with_state(state)
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Build the application with the given configuration. Without a
    /// database URL the service runs on the in-memory store.
    pub async fn build(config: PricingConfig) -> Result<Self, AppError> {
        let store: Arc<dyn RuleStore> = match &config.database {
            Some(database) => {
                let db = Database::new(
                    &database.url,
                    database.max_connections,
                    database.min_connections,
                )
                .await
                .map_err(|e| {
                    tracing::error!(error = %e, "Failed to connect to PostgreSQL");
                    e
                })?;

                db.run_migrations().await.map_err(|e| {
                    tracing::error!(error = %e, "Failed to run migrations");
                    e
                })?;
                Arc::new(db)
            }
            None => {
                tracing::warn!("DATABASE_URL not set; rules are kept in memory and lost on restart");
                Arc::new(MemoryStore::new())
            }
        };

        Self::with_store(config, store).await
    }

    /// Build around an existing store.
    pub async fn with_store(
        config: PricingConfig,
        store: Arc<dyn RuleStore>,
    ) -> Result<Self, AppError> {
        let state = AppState {
            store,
            defaults: config.stay_defaults,
            max_quote_nights: config.max_quote_nights,
        };

        let addr = format!("{}:{}", config.common.host, config.common.port);
        let listener = TcpListener::bind(&addr).await.map_err(|e| {
            tracing::error!(error = %e, addr = %addr, "Failed to bind HTTP listener");
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!(port = port, "Pricing service listener bound");

        Ok(Self {
            port,
            listener,
            router: build_router(state),
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Run the application until stopped.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        tracing::info!(
            service = "pricing-service",
            version = env!("CARGO_PKG_VERSION"),
            port = self.port,
            "Service ready to accept connections"
        );

        axum::serve(self.listener, self.router).await.map_err(|e| {
            tracing::error!(error = %e, "HTTP server error");
            std::io::Error::other(format!("HTTP server error: {}", e))
        })
    }
}
