//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! receipts-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `RECEIPTS_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! Migrations live in `crates/api/migrations/` and are embedded at compile time.

use super::{CommandError, connect};

/// Run the receipts database migrations.
pub async fn run() -> Result<(), CommandError> {
    let pool = connect().await?;

    tracing::info!("Running receipts migrations...");
    sqlx::migrate!("../api/migrations").run(&pool).await?;

    tracing::info!("Receipts migrations complete!");
    Ok(())
}
