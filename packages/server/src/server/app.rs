//! Application setup and router configuration.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::kernel::ServerDeps;
use crate::server::middleware::extract_client_ip;
use crate::server::routes::{
    health_handler, lookup_fields_handler, lookup_organizations_handler, register_member_handler,
    register_preflight_handler,
};

/// Build the Axum application router.
///
/// CORS headers are written per-response from the matching API
/// configuration (see `server::responses`), so no blanket CORS layer is
/// installed here.
pub fn build_app(deps: Arc<ServerDeps>) -> Router {
    Router::new()
        .route(
            "/api/club/member/register",
            post(register_member_handler).options(register_preflight_handler),
        )
        .route("/api/club/lookup/fields", get(lookup_fields_handler))
        .route(
            "/api/club/lookup/organizations",
            get(lookup_organizations_handler),
        )
        // Health check (no rate limit)
        .route("/health", get(health_handler))
        // Middleware layers (applied in reverse order - last added runs first)
        .layer(middleware::from_fn(extract_client_ip))
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(TraceLayer::new_for_http())
        .with_state(deps)
}
