//! Cross-cutting middleware behavior: CORS, error normalization, request IDs.

#![allow(clippy::unwrap_used)]

use axum::http::{Method, StatusCode, header};
use serde_json::json;

use receipts_api::Environment;
use receipts_api::db::MemoryStore;
use receipts_integration_tests::{TestApp, TestRequest};

const APP_ORIGIN: &str = "https://receipts.example.com";

fn app_with_origin() -> TestApp {
    TestApp::with(MemoryStore::new(), Environment::Production, &[APP_ORIGIN])
}

#[tokio::test]
async fn test_preflight_never_reaches_handlers() {
    let app = app_with_origin();

    let response = app
        .send(
            TestRequest::new(Method::OPTIONS, "/api/auth/register")
                .header(header::ORIGIN, APP_ORIGIN)
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST"),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.is_empty());
    assert_eq!(response.header("access-control-allow-origin"), Some(APP_ORIGIN));
    assert_eq!(response.header("access-control-allow-credentials"), Some("true"));
    assert!(response.header("access-control-allow-methods").is_some());
    assert!(response.session_cookie().is_none());
}

#[tokio::test]
async fn test_preflight_on_guarded_route_skips_guard() {
    let app = app_with_origin();

    let response = app
        .send(
            TestRequest::new(Method::OPTIONS, "/api/receipts").header(header::ORIGIN, APP_ORIGIN),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.is_empty());
}

#[tokio::test]
async fn test_allowed_origin_is_echoed_on_errors() {
    let app = app_with_origin();

    let response = app
        .send(TestRequest::get("/api/receipts").header(header::ORIGIN, APP_ORIGIN))
        .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.header("access-control-allow-origin"), Some(APP_ORIGIN));
    assert_eq!(response.header("vary"), Some("Origin"));
}

#[tokio::test]
async fn test_unknown_origin_is_not_echoed() {
    let app = app_with_origin();

    let response = app
        .send(TestRequest::get("/health").header(header::ORIGIN, "https://evil.example"))
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.header("access-control-allow-origin").is_none());
    assert!(response.header("access-control-allow-credentials").is_none());
}

#[tokio::test]
async fn test_localhost_origin_allowed_for_development() {
    let app = app_with_origin();

    let response = app
        .send(TestRequest::get("/health").header(header::ORIGIN, "http://localhost:5173"))
        .await;

    assert_eq!(
        response.header("access-control-allow-origin"),
        Some("http://localhost:5173")
    );
}

#[tokio::test]
async fn test_unknown_route_and_method_are_json() {
    let app = TestApp::new();

    let missing = app.send(TestRequest::get("/nowhere")).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
    assert_eq!(missing.json(), json!({ "error": "Not Found" }));

    let wrong_method = app.send(TestRequest::get("/api/auth/login")).await;
    assert_eq!(wrong_method.status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(wrong_method.json(), json!({ "error": "Method Not Allowed" }));
    assert!(wrong_method.header("allow").is_some());
}

#[tokio::test]
async fn test_request_id_is_propagated() {
    let app = TestApp::new();

    let echoed = app
        .send(
            TestRequest::get("/health")
                .header(header::HeaderName::from_static("x-request-id"), "abc-123"),
        )
        .await;
    assert_eq!(echoed.header("x-request-id"), Some("abc-123"));

    let generated = app.send(TestRequest::get("/health")).await;
    assert!(!generated.header("x-request-id").unwrap().is_empty());
}

#[tokio::test]
async fn test_validation_details_survive_production() {
    let app = app_with_origin();

    let response = app
        .send(
            TestRequest::post("/api/auth/register").json(&json!({ "email": "ada@example.com" })),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json()["details"][0]["field"], "password");
}
