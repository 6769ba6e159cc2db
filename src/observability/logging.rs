//! Structured logging.
//!
//! # Responsibilities
//! - Initialize logging subsystem
//! - Configure log level from config, overridable through `RUST_LOG`
//! - Export spans to OpenTelemetry when tracing is enabled
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - JSON format for production, pretty format for development
//! - Installation failure is an error, not a panic

use std::str::FromStr;

use thiserror::Error;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::{LogConfig, TracingConfig};
use crate::observability::tracing::{init_tracer, TracingError};

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("unknown log level `{0}`")]
    Level(String),

    #[error("failed to install tracing subscriber: {0}")]
    Install(String),

    #[error(transparent)]
    Tracing(#[from] TracingError),
}

/// Install the global subscriber.
pub fn init_logging(log: &LogConfig, spans: &TracingConfig) -> Result<(), LoggingError> {
    let level =
        LevelFilter::from_str(&log.level).map_err(|_| LoggingError::Level(log.level.clone()))?;

    let env_filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let fmt_layer = if log.pretty {
        fmt::layer().pretty().with_ansi(log.color).boxed()
    } else {
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .boxed()
    };

    let otel_layer = if spans.enabled {
        Some(tracing_opentelemetry::layer().with_tracer(init_tracer(spans)?))
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .with(otel_layer)
        .try_init()
        .map_err(|err| LoggingError::Install(err.to_string()))?;

    tracing::debug!(level = %level, pretty = log.pretty, "Logging initialized");
    if let Some(endpoint) = spans.export_endpoint().filter(|_| spans.enabled) {
        tracing::info!(
            backend = spans.kind.as_str(),
            endpoint = %endpoint,
            service = %spans.service,
            "Trace exporter installed"
        );
    }
    Ok(())
}
