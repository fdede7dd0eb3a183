//! Integration tests for the liveness probe and bearer-token auth.

mod common;

use axum::http::StatusCode;
use common::{body_json, build_test_app, get, get_with_token, UNREACHABLE};
use serde_json::json;

#[tokio::test]
async fn healthz_returns_exactly_status_ok() {
    let app = build_test_app(UNREACHABLE, None);

    let response = get(app.router(), "/healthz").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "status": "ok" }));

    // the probe does not touch any backend
    assert!(app.events.events().is_empty());
}

#[tokio::test]
async fn unknown_route_returns_404() {
    let app = build_test_app(UNREACHABLE, None);
    let response = get(app.router(), "/v1/nope").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn api_key_guards_v1_but_not_healthz() {
    let app = build_test_app(UNREACHABLE, Some("s3cret"));

    let response = get(app.router(), "/healthz").await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = get(app.router(), "/v1/search?q=anything").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await, json!({ "detail": "Unauthorized" }));

    let response = get_with_token(app.router(), "/v1/search?q=anything", "wrong").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = get_with_token(app.router(), "/v1/search?q=anything", "s3cret").await;
    assert_eq!(response.status(), StatusCode::OK);
}
