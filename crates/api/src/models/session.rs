//! Session-related types.

use chrono::{DateTime, Duration, Utc};

use receipts_core::{SessionId, UserId};

/// Absolute session lifetime in seconds (7 days).
///
/// Sessions are a fixed window from creation: activity does not extend them.
pub const SESSION_TTL_SECONDS: i64 = 7 * 24 * 60 * 60;

/// A server-side session binding an opaque token to a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Opaque token, primary lookup key.
    pub session_id: SessionId,
    /// Owning account. Many sessions may reference one user.
    pub user_id: UserId,
    /// The session is invalid once "now" reaches this instant.
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Default session lifetime.
    #[must_use]
    pub fn ttl() -> Duration {
        Duration::seconds(SESSION_TTL_SECONDS)
    }

    /// Whether the session is still valid at `now`.
    #[must_use]
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

/// Identity attached to a request by the auth guard.
///
/// Lives in request extensions for the duration of one request and is never
/// persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser {
    /// The user the request's session belongs to.
    pub user_id: UserId,
}
