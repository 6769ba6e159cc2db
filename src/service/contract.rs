//! Conversion contract shared by every handler and transport.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::service::context::CallContext;
use crate::service::error::ServiceError;

/// Operation name for `Convert` on service `service`, e.g.
/// `NotebookConverter.Convert`. Used in routing, logs, metrics and spans.
pub fn operation_name(service: &str) -> String {
    format!("{service}.Convert")
}

/// A notebook to render.
///
/// Only the core handler interprets `document`; everything else treats it as
/// an opaque tree. Construct through [`ConversionRequest::from_wire`] on
/// untrusted input.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionRequest {
    pub document: Value,
}

/// The rendered HTML document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionResponse {
    #[serde(rename = "HTMLString", alias = "html")]
    pub html: String,
}

/// Request body as it arrives on either transport.
///
/// `JSONString` is what the web client sends; `document` is accepted too.
/// The value is either the notebook text or the notebook object itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireRequest {
    #[serde(rename = "JSONString", alias = "document")]
    pub document: Value,
}

impl ConversionRequest {
    pub fn new(document: Value) -> Self {
        Self { document }
    }

    /// Validate a decoded wire document.
    pub fn from_wire(document: Value) -> Result<Self, ServiceError> {
        let document = match document {
            Value::Null => return Err(ServiceError::invalid_input("document is null")),
            Value::String(text) => {
                if text.trim().is_empty() {
                    return Err(ServiceError::invalid_input("document is empty"));
                }
                serde_json::from_str(&text).map_err(|err| {
                    ServiceError::invalid_input(format!("document is not valid JSON: {err}"))
                })?
            }
            other => other,
        };

        match &document {
            Value::Object(map) if map.is_empty() => {
                Err(ServiceError::invalid_input("document is empty"))
            }
            Value::Object(_) => Ok(Self { document }),
            _ => Err(ServiceError::invalid_input("document must be a JSON object")),
        }
    }

    /// Decode and validate a raw request body.
    pub fn from_json_slice(body: &[u8]) -> Result<Self, ServiceError> {
        if body.is_empty() {
            return Err(ServiceError::invalid_input("request body is empty"));
        }
        let wire: WireRequest = serde_json::from_slice(body)
            .map_err(|err| ServiceError::invalid_input(format!("malformed request body: {err}")))?;
        Self::from_wire(wire.document)
    }
}

/// The single business capability.
///
/// Implemented by the core handler and by every decorator wrapping it.
/// Implementations are shared across all concurrent calls.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn convert(
        &self,
        ctx: &CallContext,
        req: ConversionRequest,
    ) -> Result<ConversionResponse, ServiceError>;
}

/// Shared handle to a handler chain.
pub type SharedHandler = Arc<dyn Handler>;

#[async_trait]
impl<H: Handler + ?Sized> Handler for Arc<H> {
    async fn convert(
        &self,
        ctx: &CallContext,
        req: ConversionRequest,
    ) -> Result<ConversionResponse, ServiceError> {
        (**self).convert(ctx, req).await
    }
}
