//! HTTP routes for the receipts API.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                 - Liveness
//! GET    /health/ready           - Readiness (pings the session store)
//!
//! # Auth
//! POST   /api/auth/register      - Create account, open session
//! POST   /api/auth/login         - Open session
//! POST   /api/auth/logout        - Close session, clear cookie
//! GET    /api/auth/me            - Current account (requires auth)
//!
//! # Receipts (requires auth)
//! GET    /api/receipts           - List own receipts
//! POST   /api/receipts           - Save a receipt
//! GET    /api/receipts/{id}      - Fetch one
//! PUT    /api/receipts/{id}      - Partial update
//! DELETE /api/receipts/{id}      - Delete
//! ```

pub mod auth;
pub mod receipts;

use axum::{
    Router,
    extract::{Request, State},
    http::StatusCode,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
};
use tower_http::trace::TraceLayer;
use tracing::field::Empty;

use crate::middleware::{
    auth_guard, catch_panic_layer, cors_middleware, error_normalizer, request_id_middleware,
};
use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes(state: &AppState) -> Router<AppState> {
    let guarded = Router::new()
        .route("/me", get(auth::me))
        .route_layer(from_fn_with_state(state.clone(), auth_guard));

    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .merge(guarded)
}

/// Create the receipt routes router. Every route requires auth.
pub fn receipt_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(receipts::list).post(receipts::create))
        .route(
            "/{id}",
            get(receipts::show)
                .put(receipts::update)
                .delete(receipts::delete),
        )
        .route_layer(from_fn_with_state(state.clone(), auth_guard))
}

/// Create all routes, without the outer middleware stack.
pub fn routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/api/auth", auth_routes(state))
        .nest("/api/receipts", receipt_routes(state))
}

/// Build the complete application: routes plus the middleware pipeline.
///
/// Layers are listed innermost first; the last `.layer` call wraps everything
/// before it.
pub fn app(state: AppState) -> Router {
    routes(&state)
        .layer(catch_panic_layer())
        .layer(from_fn_with_state(state.environment(), error_normalizer))
        .layer(from_fn(request_id_middleware))
        .layer(from_fn_with_state(state.cors().clone(), cors_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request| {
            tracing::info_span!(
                "request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = Empty,
                user_id = Empty,
            )
        }))
        .with_state(state)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the session store does not answer.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.sessions().ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
