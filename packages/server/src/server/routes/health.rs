use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::kernel::ServerDeps;

#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    members: usize,
    rules: usize,
}

/// Health check endpoint
pub async fn health_handler(
    State(deps): State<Arc<ServerDeps>>,
) -> (StatusCode, Json<HealthResponse>) {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            members: deps.members.len(),
            rules: deps.rules.rules().len(),
        }),
    )
}
