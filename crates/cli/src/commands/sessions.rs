//! Session maintenance commands.
//!
//! The API server sweeps expired sessions on its own when
//! `RECEIPTS_SESSION_SWEEP_SECS` is non-zero; this command runs a single sweep
//! for deployments that prefer a cron job.

use receipts_api::db::PgSessionStore;
use receipts_api::services::sweep::sweep_once;

use super::{CommandError, connect};

/// Delete every expired session and return how many rows were removed.
pub async fn sweep() -> Result<u64, CommandError> {
    let pool = connect().await?;
    let store = PgSessionStore::new(pool);

    let removed = sweep_once(&store).await?;
    tracing::info!("Removed {} expired session(s)", removed);

    Ok(removed)
}
