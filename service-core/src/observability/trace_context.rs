//! W3C Trace Context extraction for inbound requests.
//!
//! Callers that already trace a booking flow send `traceparent` and
//! `tracestate`; the request span joins their trace instead of starting a
//! new one.
//!
//! See: https://www.w3.org/TR/trace-context/

use axum::http::HeaderMap;
use opentelemetry::Context;
use opentelemetry::propagation::{Extractor, TextMapPropagator};
use opentelemetry_sdk::propagation::TraceContextPropagator;

/// Header name for W3C traceparent
pub const TRACEPARENT_HEADER: &str = "traceparent";

/// Header name for W3C tracestate
pub const TRACESTATE_HEADER: &str = "tracestate";

/// Read-only view of request headers for OpenTelemetry propagators.
pub struct HeaderExtractor<'a>(pub &'a HeaderMap);

impl Extractor for HeaderExtractor<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|value| value.to_str().ok())
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(|name| name.as_str()).collect()
    }
}

/// Parent context carried by the request headers.
///
/// Missing or malformed headers yield a context with no valid span, so the
/// request span becomes a new root.
pub fn extract_parent_context(headers: &HeaderMap) -> Context {
    TraceContextPropagator::new().extract(&HeaderExtractor(headers))
}

#[cfg(test)]
mod tests {
    use super::*;
    use opentelemetry::trace::{TraceContextExt, TraceId};

    #[test]
    fn test_extract_remote_parent() {
        let mut headers = HeaderMap::new();
        headers.insert(
            TRACEPARENT_HEADER,
            "00-0af7651916cd43dd8448eb211c80319c-b7ad6b7169203331-01"
                .parse()
                .unwrap(),
        );
        headers.insert(TRACESTATE_HEADER, "vendor=abc".parse().unwrap());

        let cx = extract_parent_context(&headers);
        let span = cx.span();
        let parent = span.span_context();
        assert!(parent.is_valid());
        assert!(parent.is_remote());
        assert_eq!(
            parent.trace_id(),
            TraceId::from_hex("0af7651916cd43dd8448eb211c80319c").unwrap()
        );
        assert_eq!(parent.trace_state().header(), "vendor=abc");
    }

    #[test]
    fn test_malformed_traceparent_is_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(TRACEPARENT_HEADER, "not-a-traceparent".parse().unwrap());

        let cx = extract_parent_context(&headers);
        assert!(!cx.span().span_context().is_valid());
    }

    #[test]
    fn test_missing_headers_start_a_new_trace() {
        let cx = extract_parent_context(&HeaderMap::new());
        assert!(!cx.span().span_context().is_valid());
    }
}
