//! Expired session sweep.
//!
//! Expired rows are already invisible to lookups; the sweep only reclaims
//! space. It is idempotent and safe to run alongside live traffic.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, instrument};

use crate::db::{RepositoryError, SessionStore};

/// Run one sweep, returning how many sessions were deleted.
///
/// # Errors
///
/// Returns `RepositoryError` if the session store fails.
#[instrument(name = "Session sweep", skip_all)]
pub async fn sweep_once(sessions: &dyn SessionStore) -> Result<u64, RepositoryError> {
    let removed = sessions.sweep_expired().await?;
    info!(removed, "Expired sessions swept");
    Ok(removed)
}

/// Spawn a background task sweeping expired sessions every `interval`.
///
/// Failures are logged and the loop carries on with the next tick.
pub fn spawn_session_sweeper(sessions: Arc<dyn SessionStore>, interval: Duration) -> JoinHandle<()> {
    info!(interval_secs = interval.as_secs(), "Spawning session sweep task");
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if let Err(e) = sweep_once(sessions.as_ref()).await {
                error!(error = %e, "Failed to sweep expired sessions");
            }
        }
    })
}
