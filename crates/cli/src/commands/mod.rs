//! CLI subcommand implementations.

pub mod migrate;
pub mod sessions;

use receipts_api::config::{ConfigError, get_database_url};
use receipts_api::db::create_pool;
use sqlx::PgPool;

/// Connect to the receipts database named by `RECEIPTS_DATABASE_URL`
/// (falling back to `DATABASE_URL`).
async fn connect() -> Result<PgPool, CommandError> {
    dotenvy::dotenv().ok();

    let database_url = get_database_url("RECEIPTS_DATABASE_URL")?;

    tracing::info!("Connecting to receipts database...");
    Ok(create_pool(&database_url).await?)
}

/// Errors shared by every subcommand.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// Configuration error (missing database URL).
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Database connection error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration error.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Session store error.
    #[error("Session store error: {0}")]
    Repository(#[from] receipts_api::db::RepositoryError),
}
