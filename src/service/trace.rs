//! Tracing decorator.

use std::sync::Arc;

use async_trait::async_trait;
use opentelemetry::trace::TraceContextExt;
use tracing::field::{display, Empty};
use tracing::Instrument;
use tracing_opentelemetry::OpenTelemetrySpanExt;

use crate::observability::tracing::parent_context;
use crate::service::context::CallContext;
use crate::service::contract::{ConversionRequest, ConversionResponse, Handler, SharedHandler};
use crate::service::error::ServiceError;

/// Opens a span around each call.
///
/// Continues the caller's trace when the context carries one, otherwise
/// starts a root trace. The delegate receives a context carrying the new
/// span so nested work joins the same trace.
pub struct TracingHandler {
    method: Arc<str>,
    next: SharedHandler,
}

impl TracingHandler {
    pub fn new(method: Arc<str>, next: SharedHandler) -> Self {
        Self { method, next }
    }
}

#[async_trait]
impl Handler for TracingHandler {
    async fn convert(
        &self,
        ctx: &CallContext,
        req: ConversionRequest,
    ) -> Result<ConversionResponse, ServiceError> {
        let span = tracing::info_span!(
            "convert",
            otel.name = %self.method,
            otel.kind = "server",
            otel.status_code = Empty,
            method = %self.method,
            request_id = %ctx.request_id(),
            error = Empty,
        );
        // Must happen before the span is first entered.
        if let Some(parent) = ctx.trace() {
            span.set_parent(parent_context(parent));
        }

        let current = span.context().span().span_context().clone();
        let traced = if current.is_valid() {
            ctx.with_trace(current)
        } else {
            ctx.clone()
        };

        let result = self.next.convert(&traced, req).instrument(span.clone()).await;

        match &result {
            Ok(_) => {
                span.record("otel.status_code", "OK");
            }
            Err(err) => {
                span.record("otel.status_code", "ERROR");
                span.record("error", display(err));
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opentelemetry::trace::{
        SpanContext, SpanId, TraceFlags, TraceId, TraceState, TracerProvider as _,
    };
    use opentelemetry_sdk::trace::TracerProvider;
    use serde_json::json;
    use std::sync::Mutex;
    use tracing_subscriber::layer::SubscriberExt;

    /// Remembers the span each call arrived with.
    #[derive(Default)]
    struct Seen {
        traces: Mutex<Vec<Option<SpanContext>>>,
    }

    #[async_trait]
    impl Handler for Seen {
        async fn convert(
            &self,
            ctx: &CallContext,
            _req: ConversionRequest,
        ) -> Result<ConversionResponse, ServiceError> {
            self.traces.lock().unwrap().push(ctx.trace().cloned());
            Err(ServiceError::invalid_input("rejected"))
        }
    }

    fn request() -> ConversionRequest {
        ConversionRequest::new(json!({"cells": []}))
    }

    fn handler(seen: Arc<Seen>) -> TracingHandler {
        TracingHandler::new(Arc::from("Test.Convert"), seen)
    }

    fn caller() -> SpanContext {
        SpanContext::new(
            TraceId::from_hex("4bf92f3577b34da6a3ce929d0e0e4736").unwrap(),
            SpanId::from_hex("00f067aa0ba902b7").unwrap(),
            TraceFlags::SAMPLED,
            true,
            TraceState::default(),
        )
    }

    /// The provider must outlive the subscriber; its tracers only hold a weak
    /// reference to it.
    fn otel_subscriber() -> (TracerProvider, impl tracing::Subscriber + Send + Sync) {
        let provider = TracerProvider::builder().build();
        let tracer = provider.tracer("test");
        let subscriber =
            tracing_subscriber::registry().with(tracing_opentelemetry::layer().with_tracer(tracer));
        (provider, subscriber)
    }

    #[tokio::test]
    async fn test_starts_root_trace() {
        let (_provider, subscriber) = otel_subscriber();
        let _guard = tracing::subscriber::set_default(subscriber);

        let seen = Arc::new(Seen::default());
        let result = handler(seen.clone())
            .convert(&CallContext::background(), request())
            .await;
        assert_eq!(result, Err(ServiceError::invalid_input("rejected")));

        let traces = seen.traces.lock().unwrap();
        let root = traces[0].as_ref().unwrap();
        assert!(root.is_valid());
        assert!(!root.is_remote());
    }

    #[tokio::test]
    async fn test_continues_caller_trace() {
        let (_provider, subscriber) = otel_subscriber();
        let _guard = tracing::subscriber::set_default(subscriber);

        let seen = Arc::new(Seen::default());
        let parent = caller();
        let ctx = CallContext::background().with_trace(parent.clone());
        let _ = handler(seen.clone()).convert(&ctx, request()).await;

        let traces = seen.traces.lock().unwrap();
        let child = traces[0].as_ref().unwrap();
        assert_eq!(child.trace_id(), parent.trace_id());
        assert_ne!(child.span_id(), parent.span_id());
    }

    #[tokio::test]
    async fn test_without_exporter_trace_passes_through() {
        let seen = Arc::new(Seen::default());
        let parent = caller();
        let ctx = CallContext::background().with_trace(parent.clone());
        let _ = handler(seen.clone()).convert(&ctx, request()).await;

        let traces = seen.traces.lock().unwrap();
        assert_eq!(traces[0].as_ref(), Some(&parent));
    }
}
