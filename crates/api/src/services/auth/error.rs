//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;
use crate::error::{AppError, FieldViolation};

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] receipts_core::EmailError),

    /// Invalid credentials (wrong password or user not found).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The session's user no longer exists.
    #[error("user not found")]
    UserNotFound,

    /// Email or username already registered.
    #[error("user already exists: {0}")]
    UserAlreadyExists(String),

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidEmail(e) => {
                Self::Validation(vec![FieldViolation::new("email", "email", e.to_string())])
            }
            AuthError::WeakPassword(message) => {
                Self::Validation(vec![FieldViolation::new("password", "length", message)])
            }
            AuthError::InvalidCredentials => Self::InvalidCredentials,
            AuthError::UserNotFound => Self::Unauthorized,
            AuthError::UserAlreadyExists(message) => Self::Conflict(message),
            AuthError::Repository(e) => e.into(),
            AuthError::PasswordHash => Self::Unexpected("password hashing failed".to_string()),
        }
    }
}
