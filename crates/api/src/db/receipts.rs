//! Receipt store.
//!
//! Every query carries an equality filter on `user_id`, so a receipt owned by
//! someone else behaves exactly like a missing one.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;
use sqlx::types::Json;

use receipts_core::{ReceiptId, UserId};

use super::RepositoryError;
use crate::models::{NewReceipt, Receipt, ReceiptChanges};

/// Storage backend for saved receipts.
#[async_trait]
pub trait ReceiptStore: Send + Sync {
    /// List a user's receipts, most recently updated first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    async fn list(&self, owner: UserId) -> Result<Vec<Receipt>, RepositoryError>;

    /// Fetch a single receipt.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    async fn get(&self, owner: UserId, id: ReceiptId) -> Result<Option<Receipt>, RepositoryError>;

    /// Insert a receipt.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    async fn create(&self, owner: UserId, receipt: NewReceipt) -> Result<Receipt, RepositoryError>;

    /// Apply a partial update, returning the updated row if it exists.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    async fn update(
        &self,
        owner: UserId,
        id: ReceiptId,
        changes: ReceiptChanges,
    ) -> Result<Option<Receipt>, RepositoryError>;

    /// Delete a receipt.
    ///
    /// # Returns
    ///
    /// Returns `true` if the receipt was deleted, `false` if it didn't exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    async fn delete(&self, owner: UserId, id: ReceiptId) -> Result<bool, RepositoryError>;
}

/// `PostgreSQL`-backed receipt store.
#[derive(Debug, Clone)]
pub struct PgReceiptStore {
    pool: PgPool,
}

impl PgReceiptStore {
    /// Create a new receipt store.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ReceiptRow {
    id: ReceiptId,
    user_id: UserId,
    title: String,
    template: Option<String>,
    data: Json<Value>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ReceiptRow> for Receipt {
    fn from(row: ReceiptRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            title: row.title,
            template: row.template,
            data: row.data.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl ReceiptStore for PgReceiptStore {
    async fn list(&self, owner: UserId) -> Result<Vec<Receipt>, RepositoryError> {
        let rows = sqlx::query_as::<_, ReceiptRow>(
            r"
            SELECT id, user_id, title, template, data, created_at, updated_at
            FROM receipts
            WHERE user_id = $1
            ORDER BY updated_at DESC, id DESC
            ",
        )
        .bind(owner)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Receipt::from).collect())
    }

    async fn get(&self, owner: UserId, id: ReceiptId) -> Result<Option<Receipt>, RepositoryError> {
        let row = sqlx::query_as::<_, ReceiptRow>(
            r"
            SELECT id, user_id, title, template, data, created_at, updated_at
            FROM receipts
            WHERE id = $1 AND user_id = $2
            ",
        )
        .bind(id)
        .bind(owner)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Receipt::from))
    }

    async fn create(&self, owner: UserId, receipt: NewReceipt) -> Result<Receipt, RepositoryError> {
        let row = sqlx::query_as::<_, ReceiptRow>(
            r"
            INSERT INTO receipts (user_id, title, template, data)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, title, template, data, created_at, updated_at
            ",
        )
        .bind(owner)
        .bind(&receipt.title)
        .bind(receipt.template.as_deref())
        .bind(Json(&receipt.data))
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn update(
        &self,
        owner: UserId,
        id: ReceiptId,
        changes: ReceiptChanges,
    ) -> Result<Option<Receipt>, RepositoryError> {
        let row = sqlx::query_as::<_, ReceiptRow>(
            r"
            UPDATE receipts
            SET title = COALESCE($3, title),
                template = COALESCE($4, template),
                data = COALESCE($5, data),
                updated_at = now()
            WHERE id = $1 AND user_id = $2
            RETURNING id, user_id, title, template, data, created_at, updated_at
            ",
        )
        .bind(id)
        .bind(owner)
        .bind(changes.title.as_deref())
        .bind(changes.template.as_deref())
        .bind(changes.data.as_ref().map(Json))
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Receipt::from))
    }

    async fn delete(&self, owner: UserId, id: ReceiptId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM receipts WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(owner)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
