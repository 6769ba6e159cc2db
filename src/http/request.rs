//! Request handling and transformation.
//!
//! # Responsibilities
//! - Assign a unique request ID (UUID v4) when the caller sent none
//! - Resolve the real client IP behind proxies
//! - Build the per-call [`CallContext`] from request headers
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - Both transports share header propagation since both ride on HTTP

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use axum::{
    extract::{ConnectInfo, Request},
    http::{HeaderMap, HeaderName},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::observability::tracing::remote_parent;
use crate::service::{CallContext, CancelGuard};

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

const X_REAL_IP: &str = "x-real-ip";
const X_FORWARDED_FOR: &str = "x-forwarded-for";
const TRUE_CLIENT_IP: &str = "true-client-ip";

/// Client address as seen through any fronting proxies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientIp(pub IpAddr);

/// Resolve the client IP and attach it as a [`ClientIp`] extension.
///
/// `True-Client-IP`, then `X-Real-IP`, then the first `X-Forwarded-For` hop,
/// then the socket peer.
pub async fn real_ip(mut req: Request, next: Next) -> Response {
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());

    if let Some(ip) = forwarded_ip(req.headers()).or(peer) {
        req.extensions_mut().insert(ClientIp(ip));
    }
    next.run(req).await
}

fn forwarded_ip(headers: &HeaderMap) -> Option<IpAddr> {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());

    [TRUE_CLIENT_IP, X_REAL_IP]
        .into_iter()
        .filter_map(header)
        .chain(header(X_FORWARDED_FOR).and_then(|v| v.split(',').next()))
        .find_map(|v| v.trim().parse().ok())
}

/// The request ID a call was tagged with, or a fresh one.
pub fn request_id(headers: &HeaderMap) -> String {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

/// Build the context for one call.
///
/// The returned guard cancels the context when dropped, so it must live as
/// long as the request future.
pub fn call_context(headers: &HeaderMap, timeout: Duration) -> (CallContext, CancelGuard) {
    let (ctx, guard) = CallContext::new(request_id(headers));
    let ctx = ctx.with_timeout(timeout);

    let ctx = match remote_parent(headers) {
        Some(parent) => ctx.with_trace(parent),
        None => ctx,
    };
    (ctx, guard)
}
