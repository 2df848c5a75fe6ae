//! Authentication guard and extractor.
//!
//! [`auth_guard`] is installed with `route_layer` on every route that needs a
//! session. It resolves the session cookie to an [`AuthenticatedUser`] and
//! stores it in the request extensions, where [`RequireAuth`] picks it up.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use tracing::Span;

use crate::error::AppError;
use crate::models::AuthenticatedUser;
use crate::state::AppState;

/// Reject the request unless it carries a live session.
///
/// Missing cookie, malformed cookie, unknown session and expired session all
/// produce the same `401 {"error":"Unauthorized"}`. The guard never touches
/// session state.
///
/// # Errors
///
/// Returns `AppError::Unauthorized` without a live session, and
/// `AppError::Dependency` if the session store fails.
pub async fn auth_guard(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let session_id = state
        .cookies()
        .session_from_headers(request.headers())
        .ok_or(AppError::Unauthorized)?;

    let session = state
        .sessions()
        .get(&session_id)
        .await?
        .ok_or(AppError::Unauthorized)?;

    Span::current().record("user_id", session.user_id.as_i32());

    request.extensions_mut().insert(AuthenticatedUser {
        user_id: session.user_id,
    });

    Ok(next.run(request).await)
}

/// Extractor for the identity attached by [`auth_guard`].
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(RequireAuth(user): RequireAuth) -> impl IntoResponse {
///     format!("Hello, user {}!", user.user_id)
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct RequireAuth(pub AuthenticatedUser);

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .copied()
            .map(Self)
            .ok_or(AppError::Unauthorized)
    }
}
