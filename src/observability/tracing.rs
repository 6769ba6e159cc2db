//! Distributed tracing.
//!
//! # Responsibilities
//! - Extract the caller's W3C trace context from incoming headers
//! - Build the OpenTelemetry tracer that exports `Convert` spans
//! - Flush pending spans on shutdown
//!
//! # Design Decisions
//! - `tracing` spans are bridged to OpenTelemetry by `tracing-opentelemetry`
//! - The caller's `traceparent` becomes a remote parent span context
//! - Jaeger and OTLP backends are both fed over OTLP/gRPC

use axum::http::{HeaderMap, HeaderName};
use opentelemetry::propagation::{Extractor, TextMapPropagator};
use opentelemetry::trace::{SpanContext, TraceContextExt, TraceError};
use opentelemetry::{global, Context, KeyValue};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::{runtime, trace as sdktrace, Resource};
use thiserror::Error;

use crate::config::TracingConfig;

/// Name of the W3C propagation header.
pub const TRACEPARENT: &str = "traceparent";

#[derive(Debug, Error)]
pub enum TracingError {
    #[error("tracing is enabled but no endpoint is configured")]
    MissingEndpoint,

    #[error("failed to build {backend} exporter: {source}")]
    Exporter {
        backend: &'static str,
        source: TraceError,
    },
}

/// Reads propagation fields from HTTP request headers.
pub struct HeaderExtractor<'a>(pub &'a HeaderMap);

impl Extractor for HeaderExtractor<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|value| value.to_str().ok())
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(HeaderName::as_str).collect()
    }
}

/// The caller's span, if the headers carry a valid `traceparent`.
pub fn remote_parent(headers: &HeaderMap) -> Option<SpanContext> {
    let cx = TraceContextPropagator::new().extract(&HeaderExtractor(headers));
    let parent = cx.span().span_context().clone();
    parent.is_valid().then_some(parent)
}

/// An OpenTelemetry context whose active span is `parent`.
pub fn parent_context(parent: &SpanContext) -> Context {
    Context::new().with_remote_span_context(parent.clone())
}

/// Install the global exporter pipeline and return its tracer.
///
/// Must be called from within a Tokio runtime.
pub fn init_tracer(config: &TracingConfig) -> Result<sdktrace::Tracer, TracingError> {
    let endpoint = config
        .export_endpoint()
        .ok_or(TracingError::MissingEndpoint)?;

    global::set_text_map_propagator(TraceContextPropagator::new());

    let tracer = opentelemetry_otlp::new_pipeline()
        .tracing()
        .with_exporter(
            opentelemetry_otlp::new_exporter()
                .tonic()
                .with_endpoint(endpoint),
        )
        .with_trace_config(sdktrace::config().with_resource(Resource::new(vec![
            KeyValue::new("service.name", config.service.clone()),
            KeyValue::new("service.version", crate::VERSION),
        ])))
        .install_batch(runtime::Tokio)
        .map_err(|source| TracingError::Exporter {
            backend: config.kind.as_str(),
            source,
        })?;
    Ok(tracer)
}

/// Flush and stop the global tracer provider.
pub async fn shutdown_tracer() {
    // The batch processor blocks while flushing.
    let _ = tokio::task::spawn_blocking(global::shutdown_tracer_provider).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(traceparent: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(TRACEPARENT, HeaderValue::from_static(traceparent));
        headers
    }

    #[test]
    fn test_remote_parent() {
        let parent =
            remote_parent(&headers("00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01"))
                .unwrap();
        assert_eq!(parent.trace_id().to_string(), "4bf92f3577b34da6a3ce929d0e0e4736");
        assert_eq!(parent.span_id().to_string(), "00f067aa0ba902b7");
        assert!(parent.is_remote());
        assert!(parent.is_sampled());
    }

    #[test]
    fn test_invalid_traceparent_is_ignored() {
        assert!(remote_parent(&HeaderMap::new()).is_none());
        assert!(remote_parent(&headers("garbage")).is_none());
        assert!(
            remote_parent(&headers("00-00000000000000000000000000000000-00f067aa0ba902b7-01"))
                .is_none()
        );
    }

    #[test]
    fn test_parent_context_carries_span() {
        let parent =
            remote_parent(&headers("00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01"))
                .unwrap();
        let cx = parent_context(&parent);
        assert_eq!(cx.span().span_context(), &parent);
    }

    #[test]
    fn test_init_requires_endpoint() {
        let config = TracingConfig {
            enabled: true,
            ..TracingConfig::default()
        };
        assert!(matches!(init_tracer(&config), Err(TracingError::MissingEndpoint)));
    }
}
