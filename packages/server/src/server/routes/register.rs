//! Public member registration endpoint.

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Extension, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use crate::domains::ingestion::{RegistrationError, RegistrationPipeline, RegistrationReceipt};
use crate::kernel::ServerDeps;
use crate::server::middleware::ClientIp;
use crate::server::responses::secure_json;

/// POST /api/club/member/register
///
/// Accepts a `{api_key, data}` envelope and answers with a success or
/// failure envelope; security headers are resolved from the matching API
/// configuration even on failure so browsers can read the error.
pub async fn register_member_handler(
    State(deps): State<Arc<ServerDeps>>,
    client_ip: Option<Extension<ClientIp>>,
    body: Bytes,
) -> Response {
    let pipeline = RegistrationPipeline::new(deps);
    let config = pipeline.peek_config(&body);
    let ip = client_ip
        .map(|Extension(ClientIp(ip))| ip)
        .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST));

    match pipeline.register(&body, ip, Utc::now()) {
        Ok(receipt) => secure_json(StatusCode::OK, success_envelope(&receipt), config.as_ref()),
        Err(e) => {
            let status =
                StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            secure_json(status, error_envelope(&e), config.as_ref())
        }
    }
}

#[derive(Deserialize, Default)]
pub struct PreflightQuery {
    api_key: Option<String>,
}

/// OPTIONS /api/club/member/register
///
/// CORS preflight: resolves the allowed origin from the configuration when
/// the request carries a recognizable key (header or query), wildcard
/// otherwise.
pub async fn register_preflight_handler(
    State(deps): State<Arc<ServerDeps>>,
    Query(query): Query<PreflightQuery>,
    headers: HeaderMap,
) -> Response {
    let api_key = headers
        .get("api_key")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .or(query.api_key);

    let config = api_key.and_then(|key| deps.api_configs.find_by_key(&key));
    secure_json(StatusCode::OK, json!({}), config.as_ref())
}

fn success_envelope(receipt: &RegistrationReceipt) -> serde_json::Value {
    json!({
        "status": "success",
        "member_id": receipt.member_id,
        "member_name": receipt.member_name,
        "organization": {
            "id": receipt.organization.id,
            "name": receipt.organization.name,
        },
        "current_state": receipt.current_state.as_ref().map(|s| json!({
            "code": s.code,
            "label": s.label,
            "category": s.category,
        })),
    })
}

fn error_envelope(error: &RegistrationError) -> serde_json::Value {
    let mut envelope = json!({
        "status": "failed",
        "error": error.to_string(),
    });

    let details = match error {
        RegistrationError::MissingRequiredFields(fields) => Some(json!(fields)),
        RegistrationError::ValidationFailed(violations) => Some(json!(violations)),
        RegistrationError::Internal(e) => Some(json!(e.to_string())),
        _ => None,
    };
    if let Some(details) = details {
        envelope["details"] = details;
    }
    envelope
}
