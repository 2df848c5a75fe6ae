//! Authentication service.
//!
//! Password accounts backed by Argon2id hashes, and the session lifecycle
//! around them: registration and login open a session, logout closes it.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use receipts_core::{Email, SessionId, UserId};

use crate::db::{RepositoryError, SessionStore, UserStore};
use crate::models::{LoginIdentity, NewUser, User};

/// Minimum password length.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Maximum password length.
pub const MAX_PASSWORD_LENGTH: usize = 128;

/// Authentication service.
///
/// Handles user registration, login and logout.
pub struct AuthService<'a> {
    users: &'a dyn UserStore,
    sessions: &'a dyn SessionStore,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(users: &'a dyn UserStore, sessions: &'a dyn SessionStore) -> Self {
        Self { users, sessions }
    }

    /// Register a new user and open their first session.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::UserAlreadyExists` if the email or username is taken.
    pub async fn register(
        &self,
        email: &str,
        username: Option<String>,
        password: &str,
    ) -> Result<(User, SessionId), AuthError> {
        let email = Email::parse(email)?;
        validate_password(password)?;
        let password_hash = hash_password(password)?;

        let user = self
            .users
            .create(NewUser {
                email,
                username,
                password_hash,
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(message) => AuthError::UserAlreadyExists(message),
                other => AuthError::Repository(other),
            })?;

        let session_id = self.sessions.create(user.id).await?;
        tracing::info!(user_id = %user.id, "User registered");

        Ok((user, session_id))
    }

    /// Check credentials and open a new session.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the account is unknown or
    /// the password is wrong; the two are indistinguishable.
    pub async fn login(
        &self,
        identity: &LoginIdentity,
        password: &str,
    ) -> Result<(User, SessionId), AuthError> {
        let (user, password_hash) = self
            .users
            .get_password_hash(identity)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        let session_id = self.sessions.create(user.id).await?;
        tracing::info!(user_id = %user.id, "User logged in");

        Ok((user, session_id))
    }

    /// Close a session. Unknown or missing sessions are not an error.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the session store fails.
    pub async fn logout(&self, session_id: Option<&SessionId>) -> Result<(), AuthError> {
        if let Some(session_id) = session_id {
            self.sessions.delete(session_id).await?;
        }
        Ok(())
    }

    /// Load the account behind an authenticated request.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if the account was deleted while the
    /// session was still live.
    pub async fn current_user(&self, user_id: UserId) -> Result<User, AuthError> {
        self.users
            .get_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }
}

// =============================================================================
// Password Helpers
// =============================================================================

/// Check password length bounds (in characters).
fn validate_password(password: &str) -> Result<(), AuthError> {
    let length = password.chars().count();

    if length < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    if length > MAX_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at most {MAX_PASSWORD_LENGTH} characters"
        )));
    }

    Ok(())
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a stored hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}
