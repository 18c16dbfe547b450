pub mod logging;
pub mod metrics;
pub mod trace_context;

pub use logging::init_tracing;
pub use metrics::{init_prometheus_recorder, render_http_metrics};
pub use trace_context::extract_parent_context;
