//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define conversion metrics (calls, latency, errors)
//! - Expose Prometheus-compatible metrics endpoint
//! - Hide the backend behind [`MetricsSink`] so decorators can absorb its faults
//!
//! # Metrics
//! - `notebook_convert_started_total` (counter): calls entering the core
//! - `notebook_convert_total` (counter): successful conversions
//! - `notebook_convert_errors_total` (counter): failures by `kind`
//! - `notebook_convert_duration_seconds` (histogram): duration by `outcome`
//! - `notebook_convert_latency_microseconds` (histogram): latency distribution
//!
//! # Design Decisions
//! - Low-overhead metric updates (atomic operations in the recorder)
//! - Recording never blocks; the exporter scrapes on its own task

use std::net::SocketAddr;
use std::sync::Once;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use metrics_exporter_prometheus::PrometheusBuilder;
use thiserror::Error;

use crate::service::error::{ErrorKind, ServiceError};

pub const METRIC_STARTED: &str = "notebook_convert_started_total";
pub const METRIC_SUCCEEDED: &str = "notebook_convert_total";
pub const METRIC_ERRORS: &str = "notebook_convert_errors_total";
pub const METRIC_DURATION: &str = "notebook_convert_duration_seconds";
pub const METRIC_LATENCY: &str = "notebook_convert_latency_microseconds";

static METRIC_DESCRIPTIONS: Once = Once::new();

/// A metrics, logging or tracing backend could not accept a record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SinkError {
    #[error("sink unavailable: {0}")]
    Unavailable(String),
}

/// How a call ended, for labelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure(ErrorKind),
}

impl Outcome {
    pub fn of<T>(result: &Result<T, ServiceError>) -> Self {
        match result {
            Ok(_) => Outcome::Success,
            Err(err) => Outcome::Failure(err.kind()),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::Failure(_) => "failure",
        }
    }
}

/// Destination for per-call measurements.
///
/// Implementations must not block the caller.
pub trait MetricsSink: Send + Sync {
    fn call_started(&self, method: &str) -> Result<(), SinkError>;

    fn call_finished(
        &self,
        method: &str,
        outcome: Outcome,
        elapsed: Duration,
    ) -> Result<(), SinkError>;
}

/// Records through the global `metrics` recorder.
#[derive(Debug, Clone, Default)]
pub struct PrometheusMetrics;

impl PrometheusMetrics {
    pub fn new() -> Self {
        describe_metrics();
        Self
    }
}

impl MetricsSink for PrometheusMetrics {
    fn call_started(&self, method: &str) -> Result<(), SinkError> {
        counter!(METRIC_STARTED, "method" => method.to_owned()).increment(1);
        Ok(())
    }

    fn call_finished(
        &self,
        method: &str,
        outcome: Outcome,
        elapsed: Duration,
    ) -> Result<(), SinkError> {
        let method = method.to_owned();
        match outcome {
            Outcome::Success => {
                counter!(METRIC_SUCCEEDED, "method" => method.clone()).increment(1)
            }
            Outcome::Failure(kind) => counter!(
                METRIC_ERRORS,
                "method" => method.clone(),
                "kind" => kind.as_str()
            )
            .increment(1),
        }

        histogram!(
            METRIC_DURATION,
            "method" => method.clone(),
            "outcome" => outcome.as_str()
        )
        .record(elapsed.as_secs_f64());
        histogram!(METRIC_LATENCY, "method" => method).record(elapsed.as_secs_f64() * 1_000_000.0);
        Ok(())
    }
}

/// Discards every measurement. Used when metrics are disabled.
#[derive(Debug, Clone, Default)]
pub struct NoopMetrics;

impl MetricsSink for NoopMetrics {
    fn call_started(&self, _method: &str) -> Result<(), SinkError> {
        Ok(())
    }

    fn call_finished(
        &self,
        _method: &str,
        _outcome: Outcome,
        _elapsed: Duration,
    ) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Install the Prometheus recorder and serve `/metrics` on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), SinkError> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|err| SinkError::Unavailable(format!("failed to install metrics exporter: {err}")))?;

    describe_metrics();
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(METRIC_STARTED, Unit::Count, "Conversion calls started.");
        describe_counter!(METRIC_SUCCEEDED, Unit::Count, "Conversions that produced a document.");
        describe_counter!(METRIC_ERRORS, Unit::Count, "Conversions that failed, by error kind.");
        describe_histogram!(METRIC_DURATION, Unit::Seconds, "Conversion duration.");
        describe_histogram!(METRIC_LATENCY, Unit::Microseconds, "Conversion latency.");
    });
}
