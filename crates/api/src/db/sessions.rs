//! Session store.
//!
//! Owns the lifecycle of [`Session`] rows: create on login/registration, read
//! on every authenticated request, delete on logout, sweep once expired.
//!
//! Every backend filters expired rows on read. Callers never need to re-check
//! `expires_at`, and cannot tell an unknown token from an expired one.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use receipts_core::{SessionId, UserId};

use super::{RepositoryError, conflict_or_database};
use crate::models::Session;

/// Storage backend for sessions.
///
/// `create`, `get` and `delete` are independent single-row operations; no
/// transaction spans them.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Create a session for `user_id` with a fresh token.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the insert fails. A failed create never
    /// yields a usable token.
    async fn create(&self, user_id: UserId) -> Result<SessionId, RepositoryError>;

    /// Look up a live session.
    ///
    /// Returns `None` both for unknown tokens and for expired rows that have not
    /// been swept yet.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the backend is unreachable.
    async fn get(&self, session_id: &SessionId) -> Result<Option<Session>, RepositoryError>;

    /// Delete a session. Deleting an unknown session is not an error.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the backend is unreachable.
    async fn delete(&self, session_id: &SessionId) -> Result<(), RepositoryError>;

    /// Delete every session whose expiry has passed, returning how many rows
    /// were removed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the backend is unreachable.
    async fn sweep_expired(&self) -> Result<u64, RepositoryError>;

    /// Check that the backend answers.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the backend is unreachable.
    async fn ping(&self) -> Result<(), RepositoryError>;
}

/// `PostgreSQL`-backed session store.
#[derive(Debug, Clone)]
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    /// Create a store issuing sessions with the default 7 day lifetime.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct SessionRow {
    session_id: SessionId,
    user_id: UserId,
    expires_at: DateTime<Utc>,
}

impl From<SessionRow> for Session {
    fn from(row: SessionRow) -> Self {
        Self {
            session_id: row.session_id,
            user_id: row.user_id,
            expires_at: row.expires_at,
        }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    #[tracing::instrument(name = "Create session", level = "debug", skip_all, fields(user_id = %user_id))]
    async fn create(&self, user_id: UserId) -> Result<SessionId, RepositoryError> {
        let session_id = SessionId::generate();
        let expires_at = Utc::now() + Session::ttl();

        sqlx::query(
            r"
            INSERT INTO sessions (session_id, user_id, expires_at)
            VALUES ($1, $2, $3)
            ",
        )
        .bind(&session_id)
        .bind(user_id)
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_or_database(e, "session"))?;

        Ok(session_id)
    }

    #[tracing::instrument(name = "Load session", level = "debug", skip_all)]
    async fn get(&self, session_id: &SessionId) -> Result<Option<Session>, RepositoryError> {
        let row = sqlx::query_as::<_, SessionRow>(
            r"
            SELECT session_id, user_id, expires_at
            FROM sessions
            WHERE session_id = $1 AND expires_at > $2
            ",
        )
        .bind(session_id)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Session::from))
    }

    #[tracing::instrument(name = "Delete session", level = "debug", skip_all)]
    async fn delete(&self, session_id: &SessionId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM sessions WHERE session_id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    #[tracing::instrument(name = "Sweep expired sessions", level = "debug", skip_all)]
    async fn sweep_expired(&self) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= $1")
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
