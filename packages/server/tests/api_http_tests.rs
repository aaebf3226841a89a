//! HTTP-level tests for the public endpoints: envelopes, status codes and
//! security headers.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use club_core::config::Config;
use club_core::domains::api_config::{NewApiConfiguration, RateLimitSettings};
use club_core::domains::fields::OwnerModel;
use club_core::domains::organization::Organization;
use club_core::kernel::ServerDeps;
use club_core::server::build_app;
use serde_json::{json, Value};
use tower::ServiceExt;

fn setup(cors_origin: Option<&str>) -> (Arc<ServerDeps>, String) {
    let deps = Arc::new(ServerDeps::new(Config::default()));
    deps.organizations.upsert(Organization {
        id: 1,
        name: "Demo Club".to_string(),
    });
    let config = deps.api_configs.create(NewApiConfiguration {
        api_name: "register_member".to_string(),
        owner_organization: 1,
        issuing_organizations: vec![1],
        allowed_fields: deps.fields.describe(OwnerModel::Member),
        cors_origin: cors_origin.map(str::to_string),
        enforce_https: true,
        rate_limit: RateLimitSettings::default(),
        acting_identity: "api-user".to_string(),
    });
    (deps, config.api_key)
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn register_request(api_key: &str, data: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/club/member/register")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            serde_json::to_vec(&json!({"api_key": api_key, "data": data})).unwrap(),
        ))
        .unwrap()
}

fn ada() -> Value {
    json!({
        "firstname": "Ada",
        "lastname": "Lovelace",
        "gender": "female",
        "company_id": "1",
    })
}

#[tokio::test]
async fn successful_registration_returns_success_envelope() {
    let (deps, key) = setup(Some("https://portal.demo.club"));
    let app = build_app(deps);

    let response = app.oneshot(register_request(&key, ada())).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .unwrap(),
        "https://portal.demo.club"
    );
    assert_eq!(
        response
            .headers()
            .get(header::STRICT_TRANSPORT_SECURITY)
            .unwrap(),
        "max-age=31536000; includeSubDomains"
    );

    let body = json_body(response).await;
    assert_eq!(body["status"], "success");
    assert_eq!(body["organization"]["id"], 1);
    assert_eq!(body["current_state"]["code"], "pending");
}

#[tokio::test]
async fn missing_credential_is_a_structured_400() {
    let (deps, _) = setup(None);
    let app = build_app(deps);

    let request = Request::builder()
        .method("POST")
        .uri("/api/club/member/register")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"data": {"firstname": "Ada"}}"#))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["status"], "failed");
    assert!(body["error"].as_str().unwrap().contains("api_key"));
}

#[tokio::test]
async fn invalid_credential_is_401() {
    let (deps, _) = setup(None);
    let app = build_app(deps);

    let response = app
        .oneshot(register_request("wrong-key", ada()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn missing_fields_are_named_in_details() {
    let (deps, key) = setup(None);
    let app = build_app(deps);

    let mut data = ada();
    data.as_object_mut().unwrap().remove("lastname");
    let response = app.oneshot(register_request(&key, data)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["details"], json!(["lastname"]));
}

#[tokio::test]
async fn preflight_resolves_origin_from_api_key() {
    let (deps, key) = setup(Some("https://portal.demo.club"));
    let app = build_app(deps);

    let request = Request::builder()
        .method("OPTIONS")
        .uri("/api/club/member/register")
        .header("api_key", &key)
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .unwrap(),
        "https://portal.demo.club"
    );
}

#[tokio::test]
async fn preflight_without_key_falls_back_to_wildcard() {
    let (deps, _) = setup(Some("https://portal.demo.club"));
    let app = build_app(deps);

    let request = Request::builder()
        .method("OPTIONS")
        .uri("/api/club/member/register")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .unwrap(),
        "*"
    );
}

#[tokio::test]
async fn field_lookup_lists_allowed_fields_in_order() {
    let (deps, _) = setup(None);
    let app = build_app(deps);

    let request = Request::builder()
        .uri("/api/club/lookup/fields?organization_id=1&api_name=register_member")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "success");
    let fields = body["fields"].as_array().unwrap();
    assert!(!fields.is_empty());
    assert!(fields.iter().any(|f| f["name"] == "firstname" && f["required"] == true));

    // ordered by sequence
    let sequences: Vec<i64> = fields.iter().map(|f| f["sequence"].as_i64().unwrap()).collect();
    let mut sorted = sequences.clone();
    sorted.sort();
    assert_eq!(sequences, sorted);
}

#[tokio::test]
async fn field_lookup_for_unknown_organization_is_404() {
    let (deps, _) = setup(None);
    let app = build_app(deps);

    let request = Request::builder()
        .uri("/api/club/lookup/fields?organization_id=42&api_name=register_member")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn organization_lookup_lists_directory() {
    let (deps, _) = setup(None);
    let app = build_app(deps);

    let request = Request::builder()
        .uri("/api/club/lookup/organizations")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["organizations"][0]["name"], "Demo Club");
}

#[tokio::test]
async fn health_reports_member_count() {
    let (deps, _) = setup(None);
    let app = build_app(deps);

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["members"], 0);
}
