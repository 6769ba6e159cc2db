//! JSON-RPC binding of the conversion service.
//!
//! # Responsibilities
//! - Accept JSON-RPC 2.0 calls on `POST /rpc`
//! - Dispatch `<Service>.Convert` to the composed handler chain
//! - Publish the service registration on `GET /endpoints`
//!
//! # Design Decisions
//! - Protocol failures answer `200 OK` with an error envelope, never an HTTP error,
//!   including bodies over the size limit
//! - Same request-id and trace propagation as the REST binding

use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, DefaultBodyLimit, State},
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::ServiceConfig;
use crate::http::request::{self, X_REQUEST_ID};
use crate::rpc::codec::{self, RpcError, RpcResponse};
use crate::service::{ConversionRequest, Endpoint, ServiceError, SharedHandler, WireRequest};

/// Path JSON-RPC envelopes are posted to.
pub const RPC_PATH: &str = "/rpc";

/// Path the registration is served on.
pub const ENDPOINTS_PATH: &str = "/endpoints";

/// What this server announces about itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    /// `<namespace>.<name>`
    pub service: String,
    pub version: String,
    pub endpoints: Vec<EndpointInfo>,
}

/// Wire form of an [`Endpoint`], as read back by clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointInfo {
    pub name: String,
    pub path: Vec<String>,
    pub method: Vec<String>,
    pub body: String,
    pub handler: String,
}

impl From<&Endpoint> for EndpointInfo {
    fn from(endpoint: &Endpoint) -> Self {
        Self {
            name: endpoint.name.clone(),
            path: endpoint.path.clone(),
            method: endpoint.method.clone(),
            body: endpoint.body.clone(),
            handler: endpoint.handler.clone(),
        }
    }
}

#[derive(Clone)]
struct RpcState {
    handler: SharedHandler,
    method: String,
    timeout: Duration,
}

pub struct RpcServer {
    router: Router,
    endpoint: Endpoint,
    registration: Registration,
}

impl RpcServer {
    pub fn new(config: &ServiceConfig, handler: SharedHandler) -> Self {
        let endpoint = Endpoint::convert(&config.rpc.service, "/", "rpc");
        let registration = Registration {
            service: format!("{}.{}", config.rpc.namespace, config.name),
            version: crate::VERSION.to_string(),
            endpoints: vec![EndpointInfo::from(&endpoint)],
        };
        let state = RpcState {
            handler,
            method: endpoint.name.clone(),
            timeout: Duration::from_secs(config.timeouts.request_secs),
        };

        let calls = Router::new()
            .route(RPC_PATH, post(dispatch))
            .with_state(state);
        let registry = Router::new()
            .route(ENDPOINTS_PATH, get(endpoints))
            .with_state(registration.clone());

        let router = calls
            .merge(registry)
            .layer(DefaultBodyLimit::max(config.security.max_body_size))
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid))
                    .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
                    .layer(TraceLayer::new_for_http()),
            );

        Self {
            router,
            endpoint,
            registration,
        }
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn registration(&self) -> &Registration {
        &self.registration
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            service = %self.registration.service,
            endpoint = %self.endpoint.name,
            "RPC server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("RPC server stopped");
        Ok(())
    }
}

async fn endpoints(State(registration): State<Registration>) -> Json<Registration> {
    Json(registration)
}

async fn dispatch(
    State(state): State<RpcState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Json<RpcResponse> {
    let body = match body {
        Ok(body) => body,
        Err(rejection) => {
            tracing::debug!(status = %rejection.status(), "Unreadable RPC body");
            let error = RpcError::invalid_request(rejection.body_text());
            return Json(RpcResponse::failure(Value::Null, error));
        }
    };
    let request = match codec::decode_request(&body) {
        Ok(request) => request,
        Err(err) => return Json(RpcResponse::failure(Value::Null, err)),
    };
    let id = request.id;

    if request.method != state.method {
        tracing::debug!(method = %request.method, "Unknown RPC method");
        return Json(RpcResponse::failure(id, RpcError::method_not_found(&request.method)));
    }

    let conversion = match decode_params(request.params) {
        Ok(conversion) => conversion,
        Err(err) => return Json(RpcResponse::failure(id, RpcError::from(&err))),
    };

    let (ctx, _guard) = request::call_context(&headers, state.timeout);

    let response = match state.handler.convert(&ctx, conversion).await {
        Ok(rsp) => match serde_json::to_value(&rsp) {
            Ok(result) => RpcResponse::success(id, result),
            Err(err) => RpcResponse::failure(id, RpcError::internal(err)),
        },
        Err(err) => RpcResponse::failure(id, RpcError::from(&err)),
    };
    Json(response)
}

fn decode_params(params: Value) -> Result<ConversionRequest, ServiceError> {
    if params.is_null() {
        return Err(ServiceError::invalid_input("missing params"));
    }
    let wire: WireRequest = serde_json::from_value(params)
        .map_err(|err| ServiceError::invalid_input(format!("malformed params: {err}")))?;
    ConversionRequest::from_wire(wire.document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_params() {
        let req = decode_params(json!({"JSONString": "{\"cells\": []}"})).unwrap();
        assert_eq!(req.document, json!({"cells": []}));

        let req = decode_params(json!({"document": {"cells": []}})).unwrap();
        assert_eq!(req.document, json!({"cells": []}));
    }

    #[test]
    fn test_decode_params_rejects() {
        for params in [json!(null), json!({}), json!({"JSONString": ""}), json!([1, 2])] {
            let err = decode_params(params).unwrap_err();
            assert!(err.is_client_error(), "{err}");
        }
    }
}
