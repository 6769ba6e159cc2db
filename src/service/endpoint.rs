//! Static endpoint metadata published by each transport adapter.

use serde::Serialize;

use crate::service::contract::operation_name;

/// Path the conversion operation is declared on.
pub const CONVERT_PATH: &str = "/api/v0/convert";

/// Describes how one operation is reachable on a transport.
///
/// Built once when an adapter is constructed and never changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Endpoint {
    /// Operation identifier, e.g. `NotebookConverter.Convert`.
    pub name: String,
    /// Declared network paths.
    pub path: Vec<String>,
    /// HTTP method hints used by gateway translation.
    pub method: Vec<String>,
    /// Which part of the request carries the payload; `*` is the whole body.
    pub body: String,
    /// Transport that serves the endpoint (`rpc` or `http`).
    pub handler: String,
}

impl Endpoint {
    /// The `Convert` endpoint for service `service`, served by `handler`
    /// underneath `root`.
    pub fn convert(service: &str, root: &str, handler: &str) -> Self {
        Self {
            name: operation_name(service),
            path: vec![join_path(root, CONVERT_PATH)],
            method: vec!["POST".to_string()],
            body: "*".to_string(),
            handler: handler.to_string(),
        }
    }
}

/// Join a mount root and an absolute route path without doubling slashes.
pub fn join_path(root: &str, path: &str) -> String {
    let root = root.trim_end_matches('/');
    if root.is_empty() {
        path.to_string()
    } else {
        format!("{root}{path}")
    }
}
