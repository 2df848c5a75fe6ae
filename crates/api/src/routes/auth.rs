//! Account route handlers.
//!
//! Registration and login open a session and set the session cookie; logout
//! deletes the session and clears the cookie.

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode, header::SET_COOKIE},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use receipts_core::Email;

use crate::error::{AppError, Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{
    FieldKind, FieldSpec, RequestSchema, RequireAuth, ValidatedJson, at_least_one_of,
};
use crate::models::{LoginIdentity, User};
use crate::services::auth::AuthService;
use crate::state::AppState;

// =============================================================================
// Request Types
// =============================================================================

/// Registration body.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(custom(function = "validate_email_address"))]
    pub email: String,
    #[validate(length(min = 8, max = 128, message = "password must be 8-128 characters"))]
    pub password: String,
    #[validate(
        length(min = 3, max = 32, message = "username must be 3-32 characters"),
        custom(function = "validate_username")
    )]
    pub username: Option<String>,
}

impl RequestSchema for RegisterRequest {
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::required("email", FieldKind::String),
        FieldSpec::required("password", FieldKind::String),
        FieldSpec::optional("username", FieldKind::String),
    ];
}

/// Login body. Either `email` or `username` names the account.
#[derive(Debug, Deserialize, Validate)]
#[validate(schema(function = "require_login_identity"))]
pub struct LoginRequest {
    #[validate(custom(function = "validate_email_address"))]
    pub email: Option<String>,
    #[validate(length(min = 1, message = "username cannot be empty"))]
    pub username: Option<String>,
    #[validate(length(min = 1, max = 128, message = "password must be 1-128 characters"))]
    pub password: String,
}

impl RequestSchema for LoginRequest {
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::optional("email", FieldKind::String),
        FieldSpec::optional("username", FieldKind::String),
        FieldSpec::required("password", FieldKind::String),
    ];
}

impl LoginRequest {
    /// The identity to look up, preferring email when both are given.
    fn identity(&self) -> Result<LoginIdentity> {
        match (&self.email, &self.username) {
            (Some(email), _) => Email::parse(email)
                .map(LoginIdentity::Email)
                .map_err(|_| AppError::InvalidCredentials),
            (None, Some(username)) => Ok(LoginIdentity::Username(username.clone())),
            (None, None) => Err(AppError::InvalidCredentials),
        }
    }
}

fn validate_email_address(email: &str) -> std::result::Result<(), ValidationError> {
    Email::parse(email).map(|_| ()).map_err(|e| {
        let mut error = ValidationError::new("email");
        error.message = Some(e.to_string().into());
        error
    })
}

fn validate_username(username: &str) -> std::result::Result<(), ValidationError> {
    let allowed = username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if allowed {
        return Ok(());
    }

    let mut error = ValidationError::new("charset");
    error.message = Some("username may only contain letters, digits, '_' and '-'".into());
    Err(error)
}

fn require_login_identity(body: &LoginRequest) -> std::result::Result<(), ValidationError> {
    if body.email.is_none() && body.username.is_none() {
        return Err(at_least_one_of(&["email", "username"]));
    }
    Ok(())
}

// =============================================================================
// Response Types
// =============================================================================

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub user: User,
}

// =============================================================================
// Handlers
// =============================================================================

/// `POST /api/auth/register`
#[tracing::instrument(name = "Register", skip_all)]
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<RegisterRequest>,
) -> Result<Response> {
    let auth = AuthService::new(state.users(), state.sessions());
    let (user, session_id) = auth
        .register(&body.email, body.username, &body.password)
        .await?;

    set_sentry_user(&user.id);

    Ok((
        StatusCode::CREATED,
        [(SET_COOKIE, state.cookies().encode_set(&session_id))],
        Json(UserResponse { user }),
    )
        .into_response())
}

/// `POST /api/auth/login`
#[tracing::instrument(name = "Login", skip_all)]
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<LoginRequest>,
) -> Result<Response> {
    let identity = body.identity()?;

    let auth = AuthService::new(state.users(), state.sessions());
    let (user, session_id) = auth.login(&identity, &body.password).await?;

    set_sentry_user(&user.id);

    Ok((
        [(SET_COOKIE, state.cookies().encode_set(&session_id))],
        Json(UserResponse { user }),
    )
        .into_response())
}

/// `POST /api/auth/logout`
///
/// Always clears the cookie, even when the session is unknown or the store
/// fails.
#[tracing::instrument(name = "Logout", skip_all)]
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let session_id = state.cookies().session_from_headers(&headers);
    let cleared = [(SET_COOKIE, state.cookies().encode_clear())];

    clear_sentry_user();

    let auth = AuthService::new(state.users(), state.sessions());
    match auth.logout(session_id.as_ref()).await {
        Ok(()) => (StatusCode::NO_CONTENT, cleared).into_response(),
        Err(e) => (cleared, AppError::from(e)).into_response(),
    }
}

/// `GET /api/auth/me`
pub async fn me(
    State(state): State<AppState>,
    RequireAuth(identity): RequireAuth,
) -> Result<Json<UserResponse>> {
    let auth = AuthService::new(state.users(), state.sessions());
    let user = auth.current_user(identity.user_id).await?;

    Ok(Json(UserResponse { user }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::middleware::validate::validate_body;

    fn field_names(err: AppError) -> Vec<String> {
        match err {
            AppError::Validation(violations) => violations.into_iter().map(|v| v.field).collect(),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_register_request_valid() {
        let body: RegisterRequest = validate_body(
            br#"{"email": "ada@example.com", "password": "analytical", "username": "ada_l-1"}"#,
        )
        .unwrap();
        assert_eq!(body.username.as_deref(), Some("ada_l-1"));
    }

    #[test]
    fn test_register_request_rules() {
        let err = validate_body::<RegisterRequest>(
            br#"{"email": "not-an-email", "password": "short", "username": "a b"}"#,
        )
        .unwrap_err();

        assert_eq!(field_names(err), ["email", "password", "username"]);
    }

    #[test]
    fn test_register_wrong_type_keeps_other_rules() {
        let err = validate_body::<RegisterRequest>(
            br#"{"email": "not-an-email", "password": 5, "username": "a b"}"#,
        )
        .unwrap_err();

        let AppError::Validation(violations) = err else {
            panic!("expected validation error");
        };
        let found: Vec<_> = violations
            .iter()
            .map(|v| (v.field.as_str(), v.code.as_str()))
            .collect();
        assert_eq!(
            found,
            [("email", "email"), ("password", "type"), ("username", "charset")]
        );
    }

    #[test]
    fn test_register_request_missing_fields() {
        let err = validate_body::<RegisterRequest>(br#"{"username": "ada"}"#).unwrap_err();
        assert_eq!(field_names(err), ["email", "password"]);
    }

    #[test]
    fn test_login_requires_identity() {
        let err = validate_body::<LoginRequest>(br#"{"password": "analytical"}"#).unwrap_err();
        assert_eq!(field_names(err), ["email", "username"]);
    }

    #[test]
    fn test_login_identity_prefers_email() {
        let body: LoginRequest = validate_body(
            br#"{"email": "Ada@Example.com", "username": "ada", "password": "x"}"#,
        )
        .unwrap();

        assert_eq!(
            body.identity().unwrap(),
            LoginIdentity::Email(Email::parse("ada@example.com").unwrap())
        );
    }

    #[test]
    fn test_login_by_username() {
        let body: LoginRequest =
            validate_body(br#"{"username": "ada", "password": "x"}"#).unwrap();
        assert_eq!(
            body.identity().unwrap(),
            LoginIdentity::Username("ada".to_string())
        );
    }
}
