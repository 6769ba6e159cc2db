//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Decorator chain produces:
//!     → logging.rs (structured log events, span export layer)
//!     → metrics.rs (counters, histograms)
//!     → tracing.rs (W3C trace context in, OTLP spans out)
//!
//! Consumers:
//!     → Log aggregation (stdout, JSON lines)
//!     → Metrics endpoint (Prometheus scrape on the debug address)
//!     → Jaeger or an OTLP collector (when tracing is enabled)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Request ID and trace ID flow through every decorator
//! - Metrics are cheap (atomic increments)
//! - Sink faults are absorbed where they happen and never fail a call

pub mod logging;
pub mod metrics;
pub mod tracing;
