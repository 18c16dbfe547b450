//! Metrics module for pricing-service.
//! Prometheus metrics for rule mutations, quotes, admissions and redemptions.

use once_cell::sync::OnceCell;
use prometheus::{
    histogram_opts, opts, register_histogram_vec, register_int_counter_vec, Encoder,
    HistogramTimer, HistogramVec, IntCounterVec, TextEncoder,
};
use service_core::error::AppError;
use service_core::observability::{init_prometheus_recorder, render_http_metrics};

struct PricingMetrics {
    db_query_duration: HistogramVec,
    quotes_total: IntCounterVec,
    admissions_total: IntCounterVec,
    rule_mutations_total: IntCounterVec,
    promotion_redemptions_total: IntCounterVec,
    errors_total: IntCounterVec,
}

static METRICS: OnceCell<PricingMetrics> = OnceCell::new();

impl PricingMetrics {
    fn register() -> Result<Self, prometheus::Error> {
        Ok(Self {
            db_query_duration: register_histogram_vec!(
                histogram_opts!(
                    "pricing_db_query_duration_seconds",
                    "Database query duration",
                    vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5]
                ),
                &["operation"]
            )?,
            quotes_total: register_int_counter_vec!(
                opts!("pricing_quotes_total", "Quotes issued by outcome"),
                &["outcome"]
            )?,
            admissions_total: register_int_counter_vec!(
                opts!("pricing_admissions_total", "Admission decisions by outcome"),
                &["outcome"]
            )?,
            rule_mutations_total: register_int_counter_vec!(
                opts!(
                    "pricing_rule_mutations_total",
                    "Rule create/update/delete operations by rule family"
                ),
                &["family", "operation"]
            )?,
            promotion_redemptions_total: register_int_counter_vec!(
                opts!(
                    "pricing_promotion_redemptions_total",
                    "Promotion redemption attempts by outcome"
                ),
                &["outcome"]
            )?,
            errors_total: register_int_counter_vec!(
                opts!("pricing_errors_total", "Total errors by type for alerting"),
                &["error_type", "operation"]
            )?,
        })
    }
}

/// Register all metrics with the default registry and install the recorder
/// behind the HTTP middleware. Safe to call repeatedly.
pub fn init_metrics() -> Result<(), AppError> {
    METRICS.get_or_try_init(PricingMetrics::register).map_err(|e| {
        AppError::ConfigError(anyhow::anyhow!("Failed to register metrics: {}", e))
    })?;
    init_prometheus_recorder()
}

/// Get metrics in Prometheus text format.
pub fn get_metrics() -> Result<String, AppError> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| AppError::InternalError(anyhow::anyhow!("Failed to encode metrics: {}", e)))?;
    let mut text = String::from_utf8(buffer)
        .map_err(|e| AppError::InternalError(anyhow::anyhow!("Metrics are not UTF-8: {}", e)))?;
    text.push_str(&render_http_metrics());
    Ok(text)
}

/// Start a query timer; the duration is observed when the timer drops.
pub fn start_db_timer(operation: &str) -> Option<HistogramTimer> {
    METRICS
        .get()
        .map(|m| m.db_query_duration.with_label_values(&[operation]).start_timer())
}

pub fn record_quote(outcome: &str) {
    if let Some(m) = METRICS.get() {
        m.quotes_total.with_label_values(&[outcome]).inc();
    }
}

pub fn record_admission(outcome: &str) {
    if let Some(m) = METRICS.get() {
        m.admissions_total.with_label_values(&[outcome]).inc();
    }
}

/// Record a rule mutation, e.g. `("pricing_rule", "update")`.
pub fn record_rule_mutation(family: &str, operation: &str) {
    if let Some(m) = METRICS.get() {
        m.rule_mutations_total
            .with_label_values(&[family, operation])
            .inc();
    }
}

pub fn record_redemption(outcome: &str) {
    if let Some(m) = METRICS.get() {
        m.promotion_redemptions_total
            .with_label_values(&[outcome])
            .inc();
    }
}

/// Record an error for alerting.
pub fn record_error(error_type: &str, operation: &str) {
    if let Some(m) = METRICS.get() {
        m.errors_total
            .with_label_values(&[error_type, operation])
            .inc();
    }
}
