//! Persisted receipt documents.
//!
//! The receipt body is an opaque JSON object owned by the front end; the API
//! only stores it and scopes it to its owner.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use receipts_core::{ReceiptId, UserId};

/// A saved receipt.
#[derive(Debug, Clone, Serialize)]
pub struct Receipt {
    pub id: ReceiptId,
    #[serde(skip)]
    pub user_id: UserId,
    pub title: String,
    pub template: Option<String>,
    pub data: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Data needed to insert a receipt.
#[derive(Debug, Clone)]
pub struct NewReceipt {
    pub title: String,
    pub template: Option<String>,
    pub data: Value,
}

/// Partial update. `None` leaves the column unchanged.
#[derive(Debug, Clone, Default)]
pub struct ReceiptChanges {
    pub title: Option<String>,
    pub template: Option<String>,
    pub data: Option<Value>,
}
