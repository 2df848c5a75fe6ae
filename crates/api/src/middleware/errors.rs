//! Error normalizer.
//!
//! Sits between the request-id middleware and the router so that every error
//! produced further in (handlers, extractors, the auth guard, router 404/405,
//! panics caught by [`catch_panic_layer`]) leaves as `{ "error", "details"? }`
//! JSON with the right status.

use std::any::Any;

use axum::{
    body::Body,
    extract::{Request, State},
    http::{
        HeaderValue,
        header::{CONTENT_LENGTH, CONTENT_TYPE},
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use tower_http::catch_panic::CatchPanicLayer;

use crate::config::Environment;
use crate::error::{AppError, ErrorReport};

/// Render every error response as normalized JSON.
///
/// Responses built from an [`AppError`] carry an [`ErrorReport`]; its details
/// are shown or hidden according to `environment`. Other error responses are
/// rewritten to `{ "error": <reason phrase> }` unless they already carry JSON.
pub async fn error_normalizer(
    State(environment): State<Environment>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();

    let mut response = next.run(request).await;

    if let Some(report) = response.extensions_mut().remove::<ErrorReport>() {
        return with_json_body(response, &report.body(environment));
    }

    let status = response.status();
    if (status.is_client_error() || status.is_server_error()) && !is_json(&response) {
        tracing::debug!(%method, %path, status = status.as_u16(), "Normalizing bare error response");
        let reason = status.canonical_reason().unwrap_or("Error");
        return with_json_body(response, &json!({ "error": reason }));
    }

    response
}

/// Panic boundary. A panic becomes an `Unexpected` failure, which the error
/// normalizer then renders like any other.
#[must_use]
pub fn catch_panic_layer() -> CatchPanicLayer<fn(Box<dyn Any + Send + 'static>) -> Response> {
    CatchPanicLayer::custom(panic_response as fn(Box<dyn Any + Send + 'static>) -> Response)
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .cloned()
        .or_else(|| panic.downcast_ref::<&str>().map(ToString::to_string))
        .unwrap_or_else(|| "handler panicked".to_string());

    AppError::Unexpected(detail).into_response()
}

fn is_json(response: &Response) -> bool {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"))
}

/// Replace the body while keeping status and headers (`Allow`, `Set-Cookie`, ...).
fn with_json_body(response: Response, body: &Value) -> Response {
    let (mut parts, _) = response.into_parts();
    parts.headers.remove(CONTENT_LENGTH);
    parts
        .headers
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    let bytes = serde_json::to_vec(body).unwrap_or_else(|_| br#"{"error":"Error"}"#.to_vec());
    Response::from_parts(parts, Body::from(bytes))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::{
        Router,
        body::to_bytes,
        http::{Method, Request, StatusCode, header::ALLOW},
        middleware::from_fn_with_state,
        routing::get,
    };
    use tower::ServiceExt;

    use super::*;
    use crate::db::RepositoryError;
    use crate::error::FieldViolation;

    fn app(environment: Environment) -> Router {
        Router::new()
            .route("/ok", get(|| async { "fine" }))
            .route(
                "/validation",
                get(|| async {
                    Err::<(), _>(AppError::Validation(vec![FieldViolation::new(
                        "title",
                        "required",
                        "title is required",
                    )]))
                }),
            )
            .route(
                "/store-down",
                get(|| async {
                    Err::<(), _>(AppError::from(RepositoryError::DataCorruption(
                        "sessions table returned garbage".to_string(),
                    )))
                }),
            )
            .route(
                "/panic",
                get(|| async {
                    if true {
                        panic!("renderer exploded");
                    }
                    "unreachable"
                }),
            )
            .layer(catch_panic_layer())
            .layer(from_fn_with_state(environment, error_normalizer))
    }

    async fn call(app: Router, method: Method, uri: &str) -> (StatusCode, Option<Value>) {
        let response = app
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).ok())
    }

    #[tokio::test]
    async fn test_success_passes_through() {
        let (status, body) = call(app(Environment::Development), Method::GET, "/ok").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.is_none());
    }

    #[tokio::test]
    async fn test_validation_details_in_production() {
        let (status, body) = call(app(Environment::Production), Method::GET, "/validation").await;
        let body = body.unwrap();

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Validation failed");
        assert_eq!(body["details"][0]["field"], "title");
    }

    #[tokio::test]
    async fn test_dependency_details_depend_on_environment() {
        let (status, body) = call(app(Environment::Production), Method::GET, "/store-down").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.unwrap(), json!({ "error": "Internal server error" }));

        let (_, body) = call(app(Environment::Development), Method::GET, "/store-down").await;
        let details = body.unwrap()["details"].as_str().unwrap().to_string();
        assert!(details.contains("sessions table returned garbage"));
    }

    #[tokio::test]
    async fn test_panic_becomes_500() {
        let (status, body) = call(app(Environment::Development), Method::GET, "/panic").await;
        let body = body.unwrap();

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Internal server error");
        assert_eq!(body["details"], "renderer exploded");
    }

    #[tokio::test]
    async fn test_router_404_is_json() {
        let (status, body) = call(app(Environment::Production), Method::GET, "/missing").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.unwrap(), json!({ "error": "Not Found" }));
    }

    #[tokio::test]
    async fn test_method_not_allowed_keeps_allow_header() {
        let response = app(Environment::Production)
            .oneshot(
                Request::builder()
                    .method(Method::DELETE)
                    .uri("/ok")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert!(response.headers().contains_key(ALLOW));
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "Method Not Allowed");
    }
}
