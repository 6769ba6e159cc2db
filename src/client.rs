//! Clients for both bindings of the conversion service.

use thiserror::Error;

pub use crate::http::client::HttpClient;
pub use crate::rpc::client::RpcClient;

/// Failure calling the service from the outside.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The service answered with an error; `kind` is its error label.
    #[error("remote error ({kind}): {message}")]
    Remote { kind: String, message: String },
}

impl ClientError {
    /// Error label reported by the service, if it answered at all.
    pub fn remote_kind(&self) -> Option<&str> {
        match self {
            ClientError::Remote { kind, .. } => Some(kind),
            _ => None,
        }
    }
}
