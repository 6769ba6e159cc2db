//! Per-call context threaded through every handler in the chain.

use std::time::Duration;

use opentelemetry::trace::SpanContext;
use tokio::sync::watch;
use tokio::time::Instant;
use uuid::Uuid;

use crate::service::error::ServiceError;

/// Cancellation signal, deadline and correlation identifiers for one call.
///
/// Cloning is cheap; clones observe the same cancellation signal. A context
/// lives only as long as the call it was created for.
#[derive(Debug, Clone)]
pub struct CallContext {
    request_id: String,
    trace: Option<SpanContext>,
    deadline: Option<Instant>,
    cancelled: watch::Receiver<bool>,
}

/// Cancels the paired [`CallContext`] explicitly or when dropped.
///
/// Transports hold one for the duration of a call so that a dropped
/// connection cancels any work still running for it.
#[derive(Debug)]
pub struct CancelGuard {
    tx: watch::Sender<bool>,
}

impl CancelGuard {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

impl Drop for CancelGuard {
    fn drop(&mut self) {
        self.tx.send_replace(true);
    }
}

impl CallContext {
    /// A context that can be cancelled through the returned guard.
    pub fn new(request_id: impl Into<String>) -> (Self, CancelGuard) {
        let (tx, rx) = watch::channel(false);
        let ctx = Self {
            request_id: request_id.into(),
            trace: None,
            deadline: None,
            cancelled: rx,
        };
        (ctx, CancelGuard { tx })
    }

    /// A context that is never cancelled and has no deadline.
    pub fn background() -> Self {
        let (tx, rx) = watch::channel(false);
        drop(tx);
        Self {
            request_id: Uuid::new_v4().to_string(),
            trace: None,
            deadline: None,
            cancelled: rx,
        }
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Copy of this context whose current span is `trace`.
    pub fn with_trace(&self, trace: SpanContext) -> Self {
        Self {
            trace: Some(trace),
            ..self.clone()
        }
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn trace(&self) -> Option<&SpanContext> {
        self.trace.as_ref()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancelled.borrow()
    }

    /// The reason this context is done, if it is.
    pub fn err(&self) -> Option<ServiceError> {
        if self.is_cancelled() {
            return Some(ServiceError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(ServiceError::DeadlineExceeded),
            _ => None,
        }
    }

    /// Resolves once the context is cancelled or its deadline passes.
    ///
    /// Never resolves for a background context.
    pub async fn done(&self) -> ServiceError {
        let mut cancelled = self.cancelled.clone();
        let cancellation = async move {
            let signalled = cancelled.wait_for(|c| *c).await.map(|_| ());
            if signalled.is_err() {
                // Sender gone without cancelling.
                std::future::pending::<()>().await;
            }
        };

        match self.deadline {
            Some(deadline) => tokio::select! {
                _ = cancellation => ServiceError::Cancelled,
                _ = tokio::time::sleep_until(deadline) => ServiceError::DeadlineExceeded,
            },
            None => {
                cancellation.await;
                ServiceError::Cancelled
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_guard_cancels() {
        let (ctx, guard) = CallContext::new("req-1");
        assert!(ctx.err().is_none());

        guard.cancel();
        assert!(ctx.is_cancelled());
        assert_eq!(ctx.err(), Some(ServiceError::Cancelled));
        assert_eq!(ctx.done().await, ServiceError::Cancelled);
    }

    #[tokio::test]
    async fn test_dropped_guard_cancels_clones() {
        let (ctx, guard) = CallContext::new("req-2");
        let clone = ctx.clone();
        drop(guard);
        assert!(clone.is_cancelled());
    }

    #[tokio::test]
    async fn test_deadline() {
        let (ctx, _guard) = CallContext::new("req-3");
        let ctx = ctx.with_timeout(Duration::from_millis(30));
        assert!(ctx.err().is_none());

        assert_eq!(ctx.done().await, ServiceError::DeadlineExceeded);
        assert_eq!(ctx.err(), Some(ServiceError::DeadlineExceeded));
    }

    #[tokio::test]
    async fn test_background_never_done() {
        let ctx = CallContext::background();
        let waited = tokio::time::timeout(Duration::from_millis(20), ctx.done()).await;
        assert!(waited.is_err());
        assert!(ctx.err().is_none());
    }

    #[test]
    fn test_with_trace_keeps_identity() {
        use opentelemetry::trace::{SpanId, TraceFlags, TraceId, TraceState};

        let (ctx, _guard) = CallContext::new("req-4");
        let trace = SpanContext::new(
            TraceId::from_hex("4bf92f3577b34da6a3ce929d0e0e4736").unwrap(),
            SpanId::from_hex("00f067aa0ba902b7").unwrap(),
            TraceFlags::SAMPLED,
            true,
            TraceState::default(),
        );
        let traced = ctx.with_trace(trace.clone());
        assert_eq!(traced.request_id(), "req-4");
        assert_eq!(traced.trace(), Some(&trace));
        assert!(ctx.trace().is_none());
    }
}
