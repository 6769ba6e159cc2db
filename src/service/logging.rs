//! Logging decorator.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;

use crate::service::context::CallContext;
use crate::service::contract::{ConversionRequest, ConversionResponse, Handler, SharedHandler};
use crate::service::error::ServiceError;

/// Emits one structured entry before and one after each call.
///
/// Entries go through `tracing`; a failing subscriber or writer never
/// reaches the caller.
pub struct LoggingHandler {
    method: Arc<str>,
    next: SharedHandler,
}

impl LoggingHandler {
    pub fn new(method: Arc<str>, next: SharedHandler) -> Self {
        Self { method, next }
    }
}

#[async_trait]
impl Handler for LoggingHandler {
    async fn convert(
        &self,
        ctx: &CallContext,
        req: ConversionRequest,
    ) -> Result<ConversionResponse, ServiceError> {
        tracing::debug!(
            method = %self.method,
            request_id = %ctx.request_id(),
            "Executing"
        );

        let started = Instant::now();
        let result = self.next.convert(ctx, req).await;
        let duration = started.elapsed();

        match &result {
            Ok(rsp) => tracing::debug!(
                method = %self.method,
                request_id = %ctx.request_id(),
                duration = ?duration,
                html_bytes = rsp.html.len(),
                "Executed"
            ),
            Err(err) => tracing::warn!(
                method = %self.method,
                request_id = %ctx.request_id(),
                duration = ?duration,
                kind = %err.kind(),
                error = %err,
                "Failed to execute"
            ),
        }

        result
    }
}
