//! JSON-RPC 2.0 envelope types.
//!
//! The RPC binding carries one request object per HTTP POST and answers
//! with one response object. Batches are not supported.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::service::{ErrorKind, ServiceError};

pub const JSONRPC_VERSION: &str = "2.0";

pub mod codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;
    pub const CONVERSION_FAILED: i64 = -32000;
    pub const CANCELLED: i64 = -32001;
    pub const DEADLINE_EXCEEDED: i64 = -32002;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcRequest {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: Value,
    #[serde(default)]
    pub id: Value,
}

impl RpcRequest {
    pub fn new(method: impl Into<String>, params: Value, id: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.into(),
            params,
            id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcResponse {
    pub jsonrpc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
    pub id: Value,
}

impl RpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            result: Some(result),
            error: None,
            id,
        }
    }

    pub fn failure(id: Value, error: RpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            result: None,
            error: Some(error),
            id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn parse_error(detail: impl std::fmt::Display) -> Self {
        Self::new(codes::PARSE_ERROR, format!("parse error: {detail}"))
    }

    pub fn invalid_request(detail: impl std::fmt::Display) -> Self {
        Self::new(codes::INVALID_REQUEST, format!("invalid request: {detail}"))
    }

    pub fn method_not_found(method: &str) -> Self {
        Self::new(codes::METHOD_NOT_FOUND, format!("method not found: {method}"))
    }

    pub fn internal(detail: impl std::fmt::Display) -> Self {
        Self::new(codes::INTERNAL_ERROR, format!("internal error: {detail}"))
    }

    /// Service error label carried in `data.kind`, if any.
    pub fn kind(&self) -> Option<&str> {
        self.data.as_ref()?.get("kind")?.as_str()
    }
}

pub fn code_for(kind: ErrorKind) -> i64 {
    match kind {
        ErrorKind::InvalidInput => codes::INVALID_PARAMS,
        ErrorKind::ConversionFailure => codes::CONVERSION_FAILED,
        ErrorKind::Cancelled => codes::CANCELLED,
        ErrorKind::DeadlineExceeded => codes::DEADLINE_EXCEEDED,
    }
}

impl From<&ServiceError> for RpcError {
    fn from(err: &ServiceError) -> Self {
        let kind = err.kind();
        Self {
            code: code_for(kind),
            message: err.to_string(),
            data: Some(json!({ "kind": kind.as_str() })),
        }
    }
}

/// Decode one request envelope.
pub fn decode_request(body: &[u8]) -> Result<RpcRequest, RpcError> {
    let value: Value = serde_json::from_slice(body).map_err(RpcError::parse_error)?;
    let request: RpcRequest = serde_json::from_value(value).map_err(RpcError::invalid_request)?;
    if request.jsonrpc != JSONRPC_VERSION {
        return Err(RpcError::invalid_request(format!(
            "unsupported jsonrpc version `{}`",
            request.jsonrpc
        )));
    }
    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_request() {
        let request = decode_request(
            br#"{"jsonrpc":"2.0","id":7,"method":"NotebookConverter.Convert","params":{"document":{"cells":[]}}}"#,
        )
        .unwrap();
        assert_eq!(request.method, "NotebookConverter.Convert");
        assert_eq!(request.id, json!(7));
    }

    #[test]
    fn test_decode_errors() {
        assert_eq!(decode_request(b"{").unwrap_err().code, codes::PARSE_ERROR);
        assert_eq!(
            decode_request(br#"{"jsonrpc":"2.0"}"#).unwrap_err().code,
            codes::INVALID_REQUEST
        );
        assert_eq!(
            decode_request(br#"{"jsonrpc":"1.0","method":"x"}"#).unwrap_err().code,
            codes::INVALID_REQUEST
        );
    }

    #[test]
    fn test_service_error_mapping() {
        let err = RpcError::from(&ServiceError::invalid_input("document is empty"));
        assert_eq!(err.code, codes::INVALID_PARAMS);
        assert_eq!(err.kind(), Some("invalid_input"));
        assert_eq!(err.message, "invalid input: document is empty");

        let err = RpcError::from(&ServiceError::DeadlineExceeded);
        assert_eq!(err.code, codes::DEADLINE_EXCEEDED);
    }

    #[test]
    fn test_failure_omits_result() {
        let body = serde_json::to_value(RpcResponse::failure(json!(1), RpcError::internal("x"))).unwrap();
        assert!(body.get("result").is_none());
        assert_eq!(body["error"]["code"], json!(codes::INTERNAL_ERROR));
    }
}
