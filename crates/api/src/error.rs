//! Unified error handling with Sentry integration.
//!
//! Every handler and middleware returns `Result<T, AppError>`. Converting an
//! `AppError` into a response records the failure (Sentry + `tracing` for
//! server errors) and attaches an [`ErrorReport`] to the response extensions.
//! The error normalizer renders that report into the final JSON body, deciding
//! how much detail the configured environment may see.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error;

use crate::config::Environment;
use crate::db::RepositoryError;

/// A single failing field reported by request validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    /// Name of the offending field.
    pub field: String,
    /// Human readable description of the violated rule.
    pub message: String,
    /// Machine readable rule identifier (`required`, `type`, `length`, ...).
    pub code: String,
}

impl FieldViolation {
    pub fn new(
        field: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            code: code.into(),
        }
    }
}

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Request body could not be parsed at all.
    #[error("Invalid request body")]
    InvalidBody,

    /// Request body parsed but violated its schema.
    #[error("Validation failed")]
    Validation(Vec<FieldViolation>),

    /// Missing, malformed, unknown or expired session.
    #[error("Unauthorized")]
    Unauthorized,

    /// Login with an unknown identity or a wrong password.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Resource not found (or owned by someone else).
    #[error("Not found: {0}")]
    NotFound(String),

    /// Unique field already taken. Holds the client-facing message.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The backing store failed or returned something unexpected.
    #[error("Dependency error: {0}")]
    Dependency(RepositoryError),

    /// Anything else.
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

/// Who may see the `details` of an error body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailExposure {
    /// Safe for any caller (field-level validation failures).
    Always,
    /// Diagnostic detail, hidden in production.
    DevelopmentOnly,
}

/// Rendering instructions for an error response.
///
/// Travels in the response extensions from [`AppError::into_response`] to the
/// error normalizer.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub message: String,
    pub details: Option<Value>,
    pub exposure: DetailExposure,
}

impl ErrorReport {
    /// Render the `{ "error", "details"? }` body for `environment`.
    #[must_use]
    pub fn body(&self, environment: Environment) -> Value {
        let show_details = match self.exposure {
            DetailExposure::Always => true,
            DetailExposure::DevelopmentOnly => !environment.is_production(),
        };

        match &self.details {
            Some(details) if show_details => json!({
                "error": self.message,
                "details": details,
            }),
            _ => json!({ "error": self.message }),
        }
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Conflict(message) => Self::Conflict(message),
            RepositoryError::NotFound => Self::NotFound("resource".to_string()),
            other => Self::Dependency(other),
        }
    }
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::InvalidBody | Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized | Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Dependency(_) | Self::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Build the report the normalizer renders.
    #[must_use]
    pub fn report(&self) -> ErrorReport {
        let (message, details, exposure) = match self {
            Self::Validation(violations) => (
                "Validation failed".to_string(),
                Some(json!(violations)),
                DetailExposure::Always,
            ),
            Self::NotFound(_) => ("Not found".to_string(), None, DetailExposure::Always),
            Self::Conflict(message) => (message.clone(), None, DetailExposure::Always),
            Self::Dependency(err) => (
                "Internal server error".to_string(),
                Some(Value::String(err.to_string())),
                DetailExposure::DevelopmentOnly,
            ),
            Self::Unexpected(detail) => (
                "Internal server error".to_string(),
                Some(Value::String(detail.clone())),
                DetailExposure::DevelopmentOnly,
            ),
            Self::InvalidBody | Self::Unauthorized | Self::InvalidCredentials => {
                (self.to_string(), None, DetailExposure::Always)
            }
        };

        ErrorReport {
            message,
            details,
            exposure,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Request rejected");
        }

        let report = self.report();

        // Production-safe body in case nothing downstream re-renders it
        let mut response = (status, Json(report.body(Environment::Production))).into_response();
        response.extensions_mut().insert(report);
        response
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_status_codes() {
        fn get_status(err: AppError) -> StatusCode {
            err.into_response().status()
        }

        assert_eq!(get_status(AppError::InvalidBody), StatusCode::BAD_REQUEST);
        assert_eq!(
            get_status(AppError::Validation(Vec::new())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(get_status(AppError::Unauthorized), StatusCode::UNAUTHORIZED);
        assert_eq!(
            get_status(AppError::InvalidCredentials),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::NotFound("receipt".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Conflict("account already exists".to_string())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(AppError::Dependency(RepositoryError::Database(
                sqlx::Error::PoolTimedOut
            ))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            get_status(AppError::Unexpected("boom".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_response_carries_report() {
        let response = AppError::Unauthorized.into_response();
        let report = response.extensions().get::<ErrorReport>().unwrap();
        assert_eq!(report.message, "Unauthorized");
        assert!(report.details.is_none());
    }

    #[test]
    fn test_validation_details_always_shown() {
        let err = AppError::Validation(vec![FieldViolation::new(
            "title",
            "required",
            "title is required",
        )]);
        let body = err.report().body(Environment::Production);

        assert_eq!(body["error"], "Validation failed");
        assert_eq!(body["details"][0]["field"], "title");
        assert_eq!(body["details"][0]["code"], "required");
    }

    #[test]
    fn test_unexpected_details_hidden_in_production() {
        let report = AppError::Unexpected("stack overflow in renderer".to_string()).report();

        let production = report.body(Environment::Production);
        assert_eq!(production, json!({ "error": "Internal server error" }));

        let development = report.body(Environment::Development);
        assert_eq!(development["details"], "stack overflow in renderer");
    }

    #[test]
    fn test_auth_errors_never_carry_details() {
        for err in [AppError::Unauthorized, AppError::InvalidCredentials] {
            let body = err.report().body(Environment::Development);
            assert!(body.get("details").is_none());
        }
    }

    #[test]
    fn test_repository_conflict_maps_to_409() {
        let err = AppError::from(RepositoryError::Conflict(
            "account already exists".to_string(),
        ));
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert_eq!(
            err.report().body(Environment::Development),
            json!({ "error": "account already exists" })
        );
    }

    #[test]
    fn test_repository_failure_maps_to_dependency() {
        let err = AppError::from(RepositoryError::DataCorruption("bad email".to_string()));
        assert!(matches!(err, AppError::Dependency(_)));
    }
}
