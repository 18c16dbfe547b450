//! Prometheus export for the `metrics` facade.
//!
//! The HTTP middleware records through `metrics::counter!`/`histogram!`;
//! those calls are dropped until a recorder is installed here.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

use crate::error::AppError;

/// Handle to the installed recorder, or the reason installation failed.
static METRICS_HANDLE: OnceLock<Result<PrometheusHandle, String>> = OnceLock::new();

/// Install the global Prometheus recorder. Safe to call repeatedly; only
/// the first call installs.
pub fn init_prometheus_recorder() -> Result<(), AppError> {
    METRICS_HANDLE
        .get_or_init(|| {
            PrometheusBuilder::new()
                .install_recorder()
                .map_err(|e| e.to_string())
        })
        .as_ref()
        .map(|_| ())
        .map_err(|e| {
            AppError::ConfigError(anyhow::anyhow!(
                "Failed to install Prometheus recorder: {}",
                e
            ))
        })
}

/// Facade metrics in Prometheus text format; empty before installation.
pub fn render_http_metrics() -> String {
    match METRICS_HANDLE.get() {
        Some(Ok(handle)) => handle.render(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recorder_exports_facade_metrics() {
        init_prometheus_recorder().unwrap();
        init_prometheus_recorder().unwrap();

        metrics::counter!("http_requests_total", "method" => "GET", "path" => "/health", "status" => "200")
            .increment(1);

        let rendered = render_http_metrics();
        assert!(rendered.contains("http_requests_total"));
        assert!(rendered.contains("path=\"/health\""));
    }
}
