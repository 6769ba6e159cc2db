//! Metrics decorator.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;

use crate::observability::metrics::{MetricsSink, Outcome};
use crate::service::context::CallContext;
use crate::service::contract::{ConversionRequest, ConversionResponse, Handler, SharedHandler};
use crate::service::error::ServiceError;

/// Records call counts and latency for the wrapped handler.
///
/// Sits closest to the core so the recorded duration is business latency
/// only. Sink faults are dropped after a debug line; the delegate's result is
/// returned untouched.
pub struct InstrumentHandler {
    method: Arc<str>,
    next: SharedHandler,
    metrics: Arc<dyn MetricsSink>,
}

impl InstrumentHandler {
    pub fn new(method: Arc<str>, next: SharedHandler, metrics: Arc<dyn MetricsSink>) -> Self {
        Self {
            method,
            next,
            metrics,
        }
    }
}

#[async_trait]
impl Handler for InstrumentHandler {
    async fn convert(
        &self,
        ctx: &CallContext,
        req: ConversionRequest,
    ) -> Result<ConversionResponse, ServiceError> {
        if let Err(err) = self.metrics.call_started(&self.method) {
            tracing::debug!(error = %err, "Dropped metrics record");
        }

        let started = Instant::now();
        let result = self.next.convert(ctx, req).await;

        if let Err(err) = self
            .metrics
            .call_finished(&self.method, Outcome::of(&result), started.elapsed())
        {
            tracing::debug!(error = %err, "Dropped metrics record");
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::metrics::SinkError;
    use serde_json::json;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct Recorder {
        methods: Mutex<Vec<String>>,
        finished: Mutex<Vec<Outcome>>,
    }

    impl MetricsSink for Recorder {
        fn call_started(&self, method: &str) -> Result<(), SinkError> {
            self.methods.lock().unwrap().push(method.to_string());
            Ok(())
        }

        fn call_finished(
            &self,
            _method: &str,
            outcome: Outcome,
            _elapsed: Duration,
        ) -> Result<(), SinkError> {
            self.finished.lock().unwrap().push(outcome);
            Ok(())
        }
    }

    fn method() -> Arc<str> {
        Arc::from("JupyterNotebookSupport.Convert")
    }

    struct Fixed(Result<ConversionResponse, ServiceError>);

    #[async_trait]
    impl Handler for Fixed {
        async fn convert(
            &self,
            _ctx: &CallContext,
            _req: ConversionRequest,
        ) -> Result<ConversionResponse, ServiceError> {
            self.0.clone()
        }
    }

    fn request() -> ConversionRequest {
        ConversionRequest::new(json!({"cells": []}))
    }

    #[tokio::test]
    async fn test_records_outcome_and_passes_through() {
        let recorder = Arc::new(Recorder::default());
        let ok = Ok(ConversionResponse { html: "<p/>".into() });
        let handler = InstrumentHandler::new(method(), Arc::new(Fixed(ok.clone())), recorder.clone());
        assert_eq!(handler.convert(&CallContext::background(), request()).await, ok);

        let err = Err(ServiceError::conversion("boom"));
        let handler = InstrumentHandler::new(method(), Arc::new(Fixed(err.clone())), recorder.clone());
        assert_eq!(handler.convert(&CallContext::background(), request()).await, err);

        assert_eq!(
            *recorder.methods.lock().unwrap(),
            vec!["JupyterNotebookSupport.Convert"; 2]
        );

        let finished = recorder.finished.lock().unwrap();
        assert_eq!(finished[0], Outcome::Success);
        assert_eq!(
            finished[1],
            Outcome::Failure(crate::service::error::ErrorKind::ConversionFailure)
        );
    }
}
