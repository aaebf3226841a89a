//! Read-only lookup endpoints used by external forms to self-configure.

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;

use axum::extract::{Extension, Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::kernel::{RateKey, ServerDeps};
use crate::server::middleware::ClientIp;
use crate::server::responses::secure_json;

fn rate_limited(deps: &ServerDeps, client_ip: Option<Extension<ClientIp>>) -> bool {
    let ip = client_ip
        .map(|Extension(ClientIp(ip))| ip)
        .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST));
    !deps
        .rate_limiter
        .check(RateKey::Ip(ip), &deps.fallback_rate_policy(), Utc::now())
}

fn rate_limit_response() -> Response {
    secure_json(
        StatusCode::TOO_MANY_REQUESTS,
        json!({"status": "failed", "error": "rate limit exceeded"}),
        None,
    )
}

#[derive(Deserialize, Default)]
pub struct FieldsQuery {
    organization_id: Option<i64>,
    api_name: Option<String>,
}

/// GET /api/club/lookup/fields?organization_id=&api_name=
///
/// Returns the ordered allowed field list of the active configuration
/// serving the organization, for dynamic form generation.
pub async fn lookup_fields_handler(
    State(deps): State<Arc<ServerDeps>>,
    client_ip: Option<Extension<ClientIp>>,
    Query(query): Query<FieldsQuery>,
) -> Response {
    if rate_limited(&deps, client_ip) {
        return rate_limit_response();
    }

    let Some(organization_id) = query.organization_id else {
        return secure_json(
            StatusCode::BAD_REQUEST,
            json!({"status": "failed", "error": "missing organization_id query parameter"}),
            None,
        );
    };
    let Some(api_name) = query.api_name else {
        return secure_json(
            StatusCode::BAD_REQUEST,
            json!({"status": "failed", "error": "missing api_name query parameter"}),
            None,
        );
    };

    let Some(config) = deps
        .api_configs
        .find_for_organization(organization_id, &api_name)
    else {
        return secure_json(
            StatusCode::NOT_FOUND,
            json!({
                "status": "failed",
                "error": "no API configuration found for this organization or API type",
            }),
            None,
        );
    };

    let fields: Vec<serde_json::Value> = deps
        .api_configs
        .effective_allowed_fields(&config)
        .into_iter()
        .map(|f| {
            json!({
                "sequence": f.sequence,
                "name": f.technical_name,
                "label": f.label,
                "type": f.value_type,
                "required": f.required,
                "source": f.source_kind,
            })
        })
        .collect();

    info!(
        organization = organization_id,
        api = %api_name,
        count = fields.len(),
        "field lookup served"
    );

    secure_json(
        StatusCode::OK,
        json!({
            "status": "success",
            "organization_id": organization_id,
            "api_name": api_name,
            "count": fields.len(),
            "fields": fields,
        }),
        Some(&config),
    )
}

/// GET /api/club/lookup/organizations
///
/// Returns the organization directory for external clients.
pub async fn lookup_organizations_handler(
    State(deps): State<Arc<ServerDeps>>,
    client_ip: Option<Extension<ClientIp>>,
) -> Response {
    if rate_limited(&deps, client_ip) {
        return rate_limit_response();
    }

    let organizations: Vec<serde_json::Value> = deps
        .organizations
        .all()
        .into_iter()
        .map(|o| json!({"id": o.id, "name": o.name}))
        .collect();

    info!(count = organizations.len(), "organization lookup served");

    secure_json(
        StatusCode::OK,
        json!({
            "status": "success",
            "count": organizations.len(),
            "organizations": organizations,
        }),
        None,
    )
}
