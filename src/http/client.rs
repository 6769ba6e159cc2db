//! Client for the REST binding.

use reqwest::Client;
use serde_json::Value;

use crate::client::ClientError;
use crate::http::response::ApiErrorBody;
use crate::service::{endpoint::join_path, ConversionResponse, WireRequest, CONVERT_PATH};

pub struct HttpClient {
    client: Client,
    base_url: String,
    root: String,
}

impl HttpClient {
    /// `base_url` is scheme and authority, e.g. `http://localhost:9105`.
    pub fn new(base_url: &str, root: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            root: root.to_string(),
        }
    }

    /// Convert `document` (notebook object or notebook text).
    pub async fn convert(&self, document: Value) -> Result<ConversionResponse, ClientError> {
        let url = format!("{}{}", self.base_url, join_path(&self.root, CONVERT_PATH));
        let resp = self
            .client
            .post(url)
            .json(&WireRequest { document })
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            return Err(match serde_json::from_str::<ApiErrorBody>(&text) {
                Ok(body) => ClientError::Remote {
                    kind: body.error.code,
                    message: body.error.message,
                },
                Err(_) => ClientError::Remote {
                    kind: status.as_u16().to_string(),
                    message: text,
                },
            });
        }

        Ok(serde_json::from_str(&text)?)
    }
}
