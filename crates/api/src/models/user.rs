//! User domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use receipts_core::{Email, UserId};

/// A registered account.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// User's email address (canonical lowercase form).
    pub email: Email,
    /// Optional login name.
    pub username: Option<String>,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
}

/// Data needed to insert a new user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: Email,
    pub username: Option<String>,
    /// Argon2id PHC string.
    pub password_hash: String,
}

/// How a login request names the account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginIdentity {
    Email(Email),
    Username(String),
}
