//! JSON response envelopes with per-configuration security headers.
//!
//! Every public endpoint answers with a JSON body, an explicit status code,
//! a CORS origin resolved from the matching API configuration (wildcard
//! fallback), and - when the configuration enforces HTTPS - an HSTS header.

use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::Value;

use crate::domains::api_config::ApiConfiguration;

const HSTS_VALUE: &str = "max-age=31536000; includeSubDomains";

/// Build the standard secured JSON response.
pub fn secure_json(
    status: StatusCode,
    payload: Value,
    config: Option<&ApiConfiguration>,
) -> Response {
    (status, security_headers(config), Json(payload)).into_response()
}

/// CORS / HSTS headers for a response scoped to an optional configuration.
pub fn security_headers(config: Option<&ApiConfiguration>) -> HeaderMap {
    let mut headers = HeaderMap::new();

    let origin = config
        .and_then(|c| c.cors_origin.as_deref())
        .unwrap_or("*");
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_str(origin).unwrap_or(HeaderValue::from_static("*")),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type, api_key"),
    );

    if config.is_some_and(|c| c.enforce_https) {
        headers.insert(
            header::STRICT_TRANSPORT_SECURITY,
            HeaderValue::from_static(HSTS_VALUE),
        );
    }

    headers
}
