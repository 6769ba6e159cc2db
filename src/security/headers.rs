//! Response header middlewares.
//!
//! # Responsibilities
//! - Suppress client and proxy caching of conversion results
//! - Add security response headers (optional)
//! - Stamp responses with the service name and version
//! - Permissive CORS for browser clients
//!
//! # Design Decisions
//! - Headers are set after the inner service runs, so error responses get them too
//! - Values are built once at router construction

use axum::{
    extract::{Request, State},
    http::{header, HeaderName, HeaderValue, Method},
    middleware::Next,
    response::Response,
};
use tower_http::cors::{Any, CorsLayer};

pub const X_SERVICE: HeaderName = HeaderName::from_static("x-service");
pub const X_VERSION: HeaderName = HeaderName::from_static("x-version");

/// Forbid caching of any response.
pub async fn no_cache(req: Request, next: Next) -> Response {
    let mut response = next.run(req).await;
    let headers = response.headers_mut();
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-cache, no-store, max-age=0, must-revalidate"),
    );
    headers.insert(
        header::EXPIRES,
        HeaderValue::from_static("Thu, 01 Jan 1970 00:00:00 GMT"),
    );
    response
}

/// Add clickjacking / sniffing protections when `enabled`.
pub async fn secure_headers(State(enabled): State<bool>, req: Request, next: Next) -> Response {
    let mut response = next.run(req).await;
    if enabled {
        let headers = response.headers_mut();
        headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
        headers.insert(header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
        headers.insert(header::X_XSS_PROTECTION, HeaderValue::from_static("1; mode=block"));
    }
    response
}

/// Service identity stamped on every response.
#[derive(Debug, Clone)]
pub struct ServiceStamp {
    name: HeaderValue,
    version: HeaderValue,
}

impl ServiceStamp {
    pub fn new(name: &str, version: &str) -> Self {
        Self {
            name: HeaderValue::from_str(name)
                .unwrap_or_else(|_| HeaderValue::from_static("notebook-service")),
            version: HeaderValue::from_str(version)
                .unwrap_or_else(|_| HeaderValue::from_static("unknown")),
        }
    }
}

pub async fn version(State(stamp): State<ServiceStamp>, req: Request, next: Next) -> Response {
    let mut response = next.run(req).await;
    let headers = response.headers_mut();
    headers.insert(X_SERVICE, stamp.name);
    headers.insert(X_VERSION, stamp.version);
    response
}

/// Any origin may call the API.
pub fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any)
        .max_age(std::time::Duration::from_secs(86_400))
}
