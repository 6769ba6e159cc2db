//! Client for the JSON-RPC binding.

use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::{json, Value};

use crate::client::ClientError;
use crate::rpc::codec::{RpcRequest, RpcResponse};
use crate::rpc::server::RPC_PATH;
use crate::service::{operation_name, ConversionResponse};

pub struct RpcClient {
    http: reqwest::Client,
    url: String,
    method: String,
    next_id: AtomicU64,
}

impl RpcClient {
    /// `base_url` is the RPC server origin, `service` the configured service name.
    pub fn new(base_url: &str, service: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: format!("{}{}", base_url.trim_end_matches('/'), RPC_PATH),
            method: operation_name(service),
            next_id: AtomicU64::new(1),
        }
    }

    /// Convert `document`, the notebook object or its JSON text.
    pub async fn convert(&self, document: Value) -> Result<ConversionResponse, ClientError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = RpcRequest::new(&self.method, json!({ "JSONString": document }), json!(id));

        let body = self
            .http
            .post(&self.url)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        let response: RpcResponse = serde_json::from_slice(&body)?;

        if let Some(error) = response.error {
            return Err(ClientError::Remote {
                kind: error
                    .kind()
                    .map(str::to_string)
                    .unwrap_or_else(|| error.code.to_string()),
                message: error.message,
            });
        }
        Ok(serde_json::from_value(response.result.unwrap_or(Value::Null))?)
    }
}
