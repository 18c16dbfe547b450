use opentelemetry::KeyValue;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{Resource, runtime, trace as sdktrace};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Build an OTLP tracer, or `None` when export is not configured or the
/// pipeline cannot be installed. Logging keeps working either way.
fn build_tracer(service_name: &str, otlp_endpoint: Option<&str>) -> Option<sdktrace::Tracer> {
    let endpoint = otlp_endpoint.filter(|e| !e.trim().is_empty())?;

    let otlp_exporter = opentelemetry_otlp::new_exporter()
        .tonic()
        .with_endpoint(endpoint);

    match opentelemetry_otlp::new_pipeline()
        .tracing()
        .with_exporter(otlp_exporter)
        .with_trace_config(sdktrace::config().with_resource(Resource::new(vec![
            KeyValue::new("service.name", service_name.to_string()),
        ])))
        .install_batch(runtime::Tokio)
    {
        Ok(tracer) => Some(tracer),
        Err(e) => {
            eprintln!(
                "Failed to initialize OTLP tracer for service '{}' at endpoint '{}': {}; continuing without trace export",
                service_name, endpoint, e
            );
            None
        }
    }
}

/// Compose the subscriber: env filter, optional OTLP export, JSON fmt.
///
/// `RUST_LOG` wins over `log_level` when set. Events are written as
/// flattened JSON with file and line. Spans are exported over OTLP only
/// when `otlp_endpoint` is provided.
fn build_subscriber(
    service_name: &str,
    log_level: &str,
    otlp_endpoint: Option<&str>,
) -> impl tracing::Subscriber + Send + Sync + 'static {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    let telemetry = build_tracer(service_name, otlp_endpoint)
        .map(|tracer| tracing_opentelemetry::layer().with_tracer(tracer));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_file(true)
        .with_line_number(true)
        .json()
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(telemetry)
        .with(fmt_layer)
}

/// Install the global tracing subscriber.
pub fn init_tracing(service_name: &str, log_level: &str, otlp_endpoint: Option<&str>) {
    build_subscriber(service_name, log_level, otlp_endpoint).init();
}
