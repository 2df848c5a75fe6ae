//! A session store whose backend is always down.

use async_trait::async_trait;

use receipts_core::{SessionId, UserId};

use super::{RepositoryError, SessionStore};
use crate::models::Session;

/// Fails every call the way an unreachable pool does.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableSessionStore;

fn outage() -> RepositoryError {
    RepositoryError::Database(sqlx::Error::PoolTimedOut)
}

#[async_trait]
impl SessionStore for UnavailableSessionStore {
    async fn create(&self, _user_id: UserId) -> Result<SessionId, RepositoryError> {
        Err(outage())
    }

    async fn get(&self, _session_id: &SessionId) -> Result<Option<Session>, RepositoryError> {
        Err(outage())
    }

    async fn delete(&self, _session_id: &SessionId) -> Result<(), RepositoryError> {
        Err(outage())
    }

    async fn sweep_expired(&self) -> Result<u64, RepositoryError> {
        Err(outage())
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        Err(outage())
    }
}
