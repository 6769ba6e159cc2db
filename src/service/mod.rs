//! Conversion service: contract, core handler and decorator chain.
//!
//! # Data Flow
//! ```text
//! transport adapter (rpc / http)
//!     → trace.rs       (span per call, continues caller trace)
//!     → logging.rs     (start / end entries)
//!     → instrument.rs  (counters, latency)
//!     → converter.rs   (notebook → HTML)
//! ```
//!
//! # Design Decisions
//! - Every layer implements the same [`Handler`] trait and owns the next one
//! - The chain is composed once at startup and shared by both transports
//! - Decorators observe results, never rewrite them

pub mod context;
pub mod contract;
pub mod converter;
pub mod endpoint;
pub mod error;
pub mod instrument;
pub mod logging;
pub mod trace;

use std::sync::Arc;

use crate::observability::metrics::MetricsSink;

pub use context::{CallContext, CancelGuard};
pub use contract::{
    operation_name, ConversionRequest, ConversionResponse, Handler, SharedHandler, WireRequest,
};
pub use converter::NotebookConverter;
pub use endpoint::{Endpoint, CONVERT_PATH};
pub use error::{ErrorKind, ServiceError};
pub use instrument::InstrumentHandler;
pub use logging::LoggingHandler;
pub use trace::TracingHandler;

/// Wrap `core` in the fixed decorator order.
///
/// At runtime a call passes tracing → logging → instrumentation → core.
/// `method` is the operation name every decorator reports under.
pub fn compose(method: &str, core: SharedHandler, metrics: Arc<dyn MetricsSink>) -> SharedHandler {
    let method: Arc<str> = Arc::from(method);
    let handler: SharedHandler = Arc::new(InstrumentHandler::new(method.clone(), core, metrics));
    let handler: SharedHandler = Arc::new(LoggingHandler::new(method.clone(), handler));
    Arc::new(TracingHandler::new(method, handler))
}
