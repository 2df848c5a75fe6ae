//! Integration tests for Receipt Studio.
//!
//! The full application router (middleware pipeline included) is driven
//! in-process with [`tower::ServiceExt::oneshot`] against a
//! [`MemoryStore`], so no database or running server is needed.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p receipts-integration-tests
//! ```

use axum::{
    Router,
    body::{Body, Bytes, to_bytes},
    http::{HeaderMap, Method, Request, StatusCode, header},
};
use serde_json::Value;
use tower::ServiceExt;

use receipts_api::db::MemoryStore;
use receipts_api::middleware::{CorsPolicy, SESSION_COOKIE_NAME};
use receipts_api::{AppState, Environment, app};

/// An application instance plus a handle on its backing store.
#[derive(Debug, Clone)]
pub struct TestApp {
    pub store: MemoryStore,
    router: Router,
}

/// A fully buffered response.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    /// Body parsed as JSON, or `Value::Null` when it is empty or not JSON.
    #[must_use]
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap_or(Value::Null)
    }

    /// First value of `name`, if present and valid UTF-8.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// The `name=value` pair from a `Set-Cookie` header that sets the
    /// session cookie, ready to send back in a `Cookie` header.
    #[must_use]
    pub fn session_cookie(&self) -> Option<String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .filter_map(|v| v.split(';').next())
            .find(|pair| pair.starts_with(&format!("{SESSION_COOKIE_NAME}=")))
            .map(str::to_owned)
    }
}

/// Builder for a single request.
#[derive(Debug)]
pub struct TestRequest {
    method: Method,
    uri: String,
    headers: Vec<(header::HeaderName, String)>,
    body: Option<String>,
}

impl TestRequest {
    #[must_use]
    pub fn new(method: Method, uri: &str) -> Self {
        Self {
            method,
            uri: uri.to_owned(),
            headers: Vec::new(),
            body: None,
        }
    }

    #[must_use]
    pub fn get(uri: &str) -> Self {
        Self::new(Method::GET, uri)
    }

    #[must_use]
    pub fn post(uri: &str) -> Self {
        Self::new(Method::POST, uri)
    }

    /// Attach a JSON body.
    #[must_use]
    pub fn json(self, body: &Value) -> Self {
        self.raw_json(&body.to_string())
    }

    /// Attach a body verbatim with a JSON content type.
    #[must_use]
    pub fn raw_json(mut self, body: &str) -> Self {
        self.headers
            .push((header::CONTENT_TYPE, "application/json".to_owned()));
        self.body = Some(body.to_owned());
        self
    }

    /// Send a `Cookie` header.
    #[must_use]
    pub fn cookie(self, cookie: &str) -> Self {
        self.header(header::COOKIE, cookie)
    }

    #[must_use]
    pub fn header(mut self, name: header::HeaderName, value: &str) -> Self {
        self.headers.push((name, value.to_owned()));
        self
    }

    fn build(self) -> Request<Body> {
        let mut builder = Request::builder().method(self.method).uri(self.uri);
        for (name, value) in self.headers {
            builder = builder.header(name, value);
        }
        let body = self.body.map_or_else(Body::empty, Body::from);
        builder
            .body(body)
            .unwrap_or_else(|e| panic!("invalid test request: {e}"))
    }
}

impl TestApp {
    /// Development-mode app with no CORS allow-list.
    #[must_use]
    pub fn new() -> Self {
        Self::with(MemoryStore::new(), Environment::Development, &[])
    }

    /// App with a specific store, environment and CORS allow-list.
    #[must_use]
    pub fn with(store: MemoryStore, environment: Environment, origins: &[&str]) -> Self {
        let state = AppState::in_memory(
            store.clone(),
            environment,
            CorsPolicy::new(origins.iter().copied()),
        );
        Self {
            store,
            router: app(state),
        }
    }

    /// Send a request through the whole middleware stack.
    pub async fn send(&self, request: TestRequest) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request.build())
            .await
            .unwrap_or_else(|e| match e {});

        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap_or_else(|e| panic!("failed to read response body: {e}"));

        TestResponse {
            status,
            headers,
            body,
        }
    }

    /// Register an account and return the session cookie pair.
    pub async fn register(&self, email: &str, username: Option<&str>, password: &str) -> String {
        let mut body = serde_json::json!({ "email": email, "password": password });
        if let Some(username) = username {
            body["username"] = Value::from(username);
        }

        let response = self
            .send(TestRequest::post("/api/auth/register").json(&body))
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.json());

        response
            .session_cookie()
            .unwrap_or_else(|| panic!("register did not set a session cookie"))
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}
