//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the conversion route under the configured root
//! - Wire up middleware (real IP, request ID, headers, CORS, access log)
//! - Translate HTTP bodies to and from the conversion contract
//! - Bind server to listener and drain on shutdown

use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Request, State},
    http::HeaderMap,
    middleware,
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::config::ServiceConfig;
use crate::http::request::{self, ClientIp, X_REQUEST_ID};
use crate::http::response::{self, ApiError};
use crate::security::headers::{self, ServiceStamp};
use crate::service::{ConversionRequest, Endpoint, SharedHandler, CONVERT_PATH};

/// State injected into the conversion handler.
#[derive(Clone)]
pub struct HttpState {
    pub handler: SharedHandler,
    pub timeout: Duration,
}

/// REST binding of the conversion service.
pub struct HttpServer {
    router: Router,
    endpoint: Endpoint,
    registry_name: String,
}

impl HttpServer {
    /// Create a new HTTP server around an already composed handler chain.
    pub fn new(config: &ServiceConfig, handler: SharedHandler) -> Self {
        let state = HttpState {
            handler,
            timeout: Duration::from_secs(config.timeouts.request_secs),
        };

        Self {
            router: Self::build_router(config, state),
            endpoint: Endpoint::convert(&config.rpc.service, &config.http.root, "http"),
            registry_name: format!("{}.{}", config.http.namespace, config.name),
        }
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// Layers are listed outermost first.
    fn build_router(config: &ServiceConfig, state: HttpState) -> Router {
        let api = Router::new()
            .route(CONVERT_PATH, post(convert))
            .with_state(state);

        mount(&config.http.root, api)
            .layer(DefaultBodyLimit::max(config.security.max_body_size))
            .layer(
                ServiceBuilder::new()
                    .layer(middleware::from_fn(request::real_ip))
                    .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid))
                    .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
                    .layer(middleware::from_fn(headers::no_cache))
                    .layer(headers::cors())
                    .layer(middleware::from_fn_with_state(
                        config.security.enable_headers,
                        headers::secure_headers,
                    ))
                    .layer(middleware::from_fn_with_state(
                        ServiceStamp::new(&config.name, crate::VERSION),
                        headers::version,
                    ))
                    .layer(
                        TraceLayer::new_for_http()
                            .make_span_with(access_span)
                            .on_response(DefaultOnResponse::new().level(Level::INFO)),
                    ),
            )
    }

    /// The router, for embedding or in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
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
            service = %self.registry_name,
            endpoint = %self.endpoint.name,
            path = ?self.endpoint.path,
            "HTTP server starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Nest `api` under `root`; `/` mounts it at the top level.
fn mount(root: &str, api: Router) -> Router {
    let root = root.trim_end_matches('/');
    if root.is_empty() {
        api
    } else {
        Router::new().nest(root, api)
    }
}

fn access_span(req: &Request) -> tracing::Span {
    let request_id = req
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-");
    let client_ip = req
        .extensions()
        .get::<ClientIp>()
        .map(|ip| ip.0.to_string())
        .unwrap_or_default();

    tracing::info_span!(
        "http.request",
        method = %req.method(),
        uri = %req.uri(),
        request_id = %request_id,
        client_ip = %client_ip,
    )
}

/// Decode the body, run the chain, encode the result.
async fn convert(State(state): State<HttpState>, headers: HeaderMap, body: Bytes) -> Response {
    let req = match ConversionRequest::from_json_slice(&body) {
        Ok(req) => req,
        Err(err) => {
            tracing::debug!(error = %err, "Rejected conversion request");
            return ApiError::from(err).into_response();
        }
    };

    // Dropping the guard cancels the call if the client goes away.
    let (ctx, _guard) = request::call_context(&headers, state.timeout);

    match state.handler.convert(&ctx, req).await {
        Ok(rsp) => response::conversion(&headers, rsp),
        Err(err) => ApiError::from(err).into_response(),
    }
}
