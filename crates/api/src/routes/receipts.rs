//! Saved receipt handlers.
//!
//! Every handler runs behind the auth guard and scopes its query to the
//! caller's `user_id`. Someone else's receipt is a plain 404.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::{Validate, ValidationError};

use receipts_core::ReceiptId;

use crate::error::{AppError, Result};
use crate::middleware::{
    FieldKind, FieldSpec, RequestSchema, RequireAuth, ValidatedJson, at_least_one_of,
};
use crate::models::{NewReceipt, Receipt, ReceiptChanges};
use crate::state::AppState;

// =============================================================================
// Request Types
// =============================================================================

/// Body of `POST /api/receipts`.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateReceiptRequest {
    #[validate(length(min = 1, max = 120, message = "title must be 1-120 characters"))]
    pub title: String,
    #[validate(length(min = 1, max = 64, message = "template must be 1-64 characters"))]
    pub template: Option<String>,
    pub data: Value,
}

impl RequestSchema for CreateReceiptRequest {
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::required("title", FieldKind::String),
        FieldSpec::optional("template", FieldKind::String),
        FieldSpec::required("data", FieldKind::Object),
    ];
}

/// Body of `PUT /api/receipts/{id}`. At least one field must be present.
#[derive(Debug, Deserialize, Validate)]
#[validate(schema(function = "require_any_change"))]
pub struct UpdateReceiptRequest {
    #[validate(length(min = 1, max = 120, message = "title must be 1-120 characters"))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 64, message = "template must be 1-64 characters"))]
    pub template: Option<String>,
    pub data: Option<Value>,
}

impl RequestSchema for UpdateReceiptRequest {
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::optional("title", FieldKind::String),
        FieldSpec::optional("template", FieldKind::String),
        FieldSpec::optional("data", FieldKind::Object),
    ];
}

fn require_any_change(body: &UpdateReceiptRequest) -> std::result::Result<(), ValidationError> {
    if body.title.is_none() && body.template.is_none() && body.data.is_none() {
        return Err(at_least_one_of(&["title", "template", "data"]));
    }
    Ok(())
}

impl From<CreateReceiptRequest> for NewReceipt {
    fn from(body: CreateReceiptRequest) -> Self {
        Self {
            title: body.title,
            template: body.template,
            data: body.data,
        }
    }
}

impl From<UpdateReceiptRequest> for ReceiptChanges {
    fn from(body: UpdateReceiptRequest) -> Self {
        Self {
            title: body.title,
            template: body.template,
            data: body.data,
        }
    }
}

// =============================================================================
// Response Types
// =============================================================================

#[derive(Debug, Serialize)]
pub struct ReceiptResponse {
    pub receipt: Receipt,
}

#[derive(Debug, Serialize)]
pub struct ReceiptListResponse {
    pub receipts: Vec<Receipt>,
}

fn not_found(id: ReceiptId) -> AppError {
    AppError::NotFound(format!("receipt {id}"))
}

// =============================================================================
// Handlers
// =============================================================================

/// `GET /api/receipts`
pub async fn list(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<ReceiptListResponse>> {
    let receipts = state.receipts().list(user.user_id).await?;
    Ok(Json(ReceiptListResponse { receipts }))
}

/// `POST /api/receipts`
#[tracing::instrument(name = "Create receipt", skip_all)]
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ValidatedJson(body): ValidatedJson<CreateReceiptRequest>,
) -> Result<(StatusCode, Json<ReceiptResponse>)> {
    let receipt = state.receipts().create(user.user_id, body.into()).await?;
    tracing::info!(user_id = %user.user_id, receipt_id = %receipt.id, "Receipt created");

    Ok((StatusCode::CREATED, Json(ReceiptResponse { receipt })))
}

/// `GET /api/receipts/{id}`
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<ReceiptId>,
) -> Result<Json<ReceiptResponse>> {
    let receipt = state
        .receipts()
        .get(user.user_id, id)
        .await?
        .ok_or_else(|| not_found(id))?;

    Ok(Json(ReceiptResponse { receipt }))
}

/// `PUT /api/receipts/{id}`
#[tracing::instrument(name = "Update receipt", skip_all)]
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<ReceiptId>,
    ValidatedJson(body): ValidatedJson<UpdateReceiptRequest>,
) -> Result<Json<ReceiptResponse>> {
    let receipt = state
        .receipts()
        .update(user.user_id, id, body.into())
        .await?
        .ok_or_else(|| not_found(id))?;

    Ok(Json(ReceiptResponse { receipt }))
}

/// `DELETE /api/receipts/{id}`
#[tracing::instrument(name = "Delete receipt", skip_all)]
pub async fn delete(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<ReceiptId>,
) -> Result<StatusCode> {
    if state.receipts().delete(user.user_id, id).await? {
        tracing::info!(user_id = %user.user_id, receipt_id = %id, "Receipt deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found(id))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::middleware::validate::validate_body;

    fn field_names(err: AppError) -> Vec<String> {
        match err {
            AppError::Validation(violations) => violations.into_iter().map(|v| v.field).collect(),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_create_requires_object_data() {
        let err = validate_body::<CreateReceiptRequest>(br#"{"title": "Lunch", "data": [1]}"#)
            .unwrap_err();
        assert_eq!(field_names(err), ["data"]);
    }

    #[test]
    fn test_create_title_bounds() {
        let long = format!(r#"{{"title": "{}", "data": {{}}}}"#, "t".repeat(121));
        let err = validate_body::<CreateReceiptRequest>(long.as_bytes()).unwrap_err();
        assert_eq!(field_names(err), ["title"]);

        let err = validate_body::<CreateReceiptRequest>(br#"{"title": "", "data": {}}"#)
            .unwrap_err();
        assert_eq!(field_names(err), ["title"]);
    }

    #[test]
    fn test_create_valid() {
        let body: CreateReceiptRequest = validate_body(
            br#"{"title": "Lunch", "template": "thermal-80mm", "data": {"items": []}}"#,
        )
        .unwrap();
        let receipt: NewReceipt = body.into();
        assert_eq!(receipt.template.as_deref(), Some("thermal-80mm"));
        assert!(receipt.data["items"].is_array());
    }

    #[test]
    fn test_update_requires_a_change() {
        let err = validate_body::<UpdateReceiptRequest>(b"{}").unwrap_err();
        assert_eq!(field_names(err), ["data", "template", "title"]);
    }

    #[test]
    fn test_update_partial() {
        let body: UpdateReceiptRequest = validate_body(br#"{"title": "Dinner"}"#).unwrap();
        let changes: ReceiptChanges = body.into();
        assert_eq!(changes.title.as_deref(), Some("Dinner"));
        assert!(changes.data.is_none());
    }
}
