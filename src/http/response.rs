//! Response handling and transformation.
//!
//! # Responsibilities
//! - Write a [`ConversionResponse`] as JSON or raw HTML, per `Accept`
//! - Map handler errors to appropriate HTTP status codes
//!
//! # Design Decisions
//! - JSON (`{"HTMLString": ...}`) unless the client asks for `text/html` only
//! - Error bodies share one shape: `{"error": {"code", "message"}}`

use axum::{
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::service::{ConversionResponse, ErrorKind, ServiceError};

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub error: ApiErrorMessage,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorMessage {
    pub code: String,
    pub message: String,
}

/// A [`ServiceError`] on its way to an HTTP client.
#[derive(Debug)]
pub struct ApiError(pub ServiceError);

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        Self(err)
    }
}

/// HTTP status for each error kind.
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
        ErrorKind::ConversionFailure => StatusCode::INTERNAL_SERVER_ERROR,
        ErrorKind::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::DeadlineExceeded => StatusCode::GATEWAY_TIMEOUT,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.0.kind();
        let body = ApiErrorBody {
            error: ApiErrorMessage {
                code: kind.as_str().to_string(),
                message: self.0.to_string(),
            },
        };
        (status_for(kind), Json(body)).into_response()
    }
}

/// Write a successful conversion.
pub fn conversion(headers: &HeaderMap, rsp: ConversionResponse) -> Response {
    if wants_html(headers) {
        Html(rsp.html).into_response()
    } else {
        Json(rsp).into_response()
    }
}

fn wants_html(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .map(|accept| accept.contains("text/html") && !accept.contains("application/json"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_for(ErrorKind::InvalidInput), StatusCode::BAD_REQUEST);
        assert!(status_for(ErrorKind::ConversionFailure).is_server_error());
        assert_eq!(status_for(ErrorKind::DeadlineExceeded), StatusCode::GATEWAY_TIMEOUT);
    }

    #[test]
    fn test_error_response() {
        let response = ApiError::from(ServiceError::invalid_input("document is empty")).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_content_negotiation() {
        let rsp = ConversionResponse { html: "<p>x</p>".into() };

        let json = conversion(&HeaderMap::new(), rsp.clone());
        assert_eq!(
            json.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );

        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static("text/html"));
        let html = conversion(&headers, rsp);
        assert!(html
            .headers()
            .get(header::CONTENT_TYPE)
            .unwrap()
            .to_str()
            .unwrap()
            .starts_with("text/html"));
    }
}
