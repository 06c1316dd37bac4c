//! Event type definitions.
//!
//! Flexible attribute sets stored in the `eventTypes` collection and
//! addressed by their unique `event_type` name:
//!
//! - GET /event-types - List definitions
//! - POST /event-types - Create a definition
//! - GET /event-types/:name - Get a definition
//! - PUT /event-types/:name - Merge fields into a definition
//! - DELETE /event-types/:name - Delete a definition

use crate::server::state::AppState;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use youthgroup_core::documents::{
    Collection, Document, DocumentFilter, Fields, prepare_insert, prepare_update,
};
use youthgroup_core::{Result, YouthGroupError};
use youthgroup_web::{AppError, JsonBody};

use super::notes::CreatedDocument;

const NAME_FIELD: &str = "event_type";

async fn find_by_name(state: &AppState, name: &str) -> Result<Option<Document>> {
    let mut matches = state
        .documents
        .find(
            Collection::EventTypes,
            DocumentFilter::field_eq(NAME_FIELD, name),
        )
        .await?;
    Ok(if matches.is_empty() {
        None
    } else {
        Some(matches.swap_remove(0))
    })
}

async fn require_by_name(state: &AppState, name: &str) -> Result<Document> {
    find_by_name(state, name)
        .await?
        .ok_or_else(|| YouthGroupError::not_found(Collection::EventTypes.resource(), name))
}

async fn ensure_name_free(state: &AppState, name: &str) -> Result<()> {
    if find_by_name(state, name).await?.is_some() {
        return Err(YouthGroupError::validation(format!(
            "event type '{name}' already exists"
        )));
    }
    Ok(())
}

/// List every event type definition.
///
/// # Errors
///
/// Returns `STORE_ERROR` if the document store fails.
pub async fn list_event_types(
    State(state): State<AppState>,
) -> std::result::Result<Json<Vec<Document>>, AppError> {
    let documents = state
        .documents
        .find(Collection::EventTypes, DocumentFilter::All)
        .await?;
    Ok(Json(documents))
}

/// Get a definition by name.
///
/// # Errors
///
/// Returns `NOT_FOUND` for an unknown name.
pub async fn get_event_type(
    Path(name): Path<String>,
    State(state): State<AppState>,
) -> std::result::Result<Json<Document>, AppError> {
    Ok(Json(require_by_name(&state, &name).await?))
}

/// Create a definition.
///
/// # Example
///
/// ```bash
/// curl -X POST http://localhost:8000/event-types \
///   -H "Content-Type: application/json" \
///   -d '{"event_type": "Retreat", "overnight": true, "permissionSlip": true}'
/// ```
///
/// # Errors
///
/// Returns `VALIDATION_ERROR` when `event_type` is missing or already used.
pub async fn create_event_type(
    State(state): State<AppState>,
    JsonBody(fields): JsonBody<Fields>,
) -> std::result::Result<(StatusCode, Json<CreatedDocument>), AppError> {
    let fields = prepare_insert(Collection::EventTypes, None, fields)?;
    let name = fields
        .get(NAME_FIELD)
        .and_then(serde_json::Value::as_str)
        .unwrap_or_default()
        .to_string();
    ensure_name_free(&state, &name).await?;

    let id = state.documents.insert(Collection::EventTypes, fields).await?;
    tracing::info!(event_type = %name, document_id = %id, "Event type created");
    Ok((
        StatusCode::CREATED,
        Json(CreatedDocument {
            id,
            message: format!("Event type '{name}' created"),
        }),
    ))
}

/// Merge fields into a definition. Renaming to a name in use is rejected.
///
/// # Errors
///
/// Returns `NOT_FOUND` for an unknown name and `VALIDATION_ERROR` for an
/// empty update or a clashing rename.
pub async fn update_event_type(
    Path(name): Path<String>,
    State(state): State<AppState>,
    JsonBody(fields): JsonBody<Fields>,
) -> std::result::Result<Json<Document>, AppError> {
    let fields = prepare_update(Collection::EventTypes, fields)?;
    let existing = require_by_name(&state, &name).await?;

    match fields.get(NAME_FIELD).map(|v| v.as_str().map(str::trim)) {
        Some(Some(renamed)) if renamed.is_empty() => {
            return Err(AppError::validation("event_type must not be blank"));
        }
        Some(Some(renamed)) if renamed != name => ensure_name_free(&state, renamed).await?,
        Some(None) => return Err(AppError::validation("event_type must be a string")),
        _ => {}
    }

    let updated = state
        .documents
        .update(Collection::EventTypes, &existing.id, fields)
        .await?;
    Ok(Json(updated))
}

/// Delete a definition.
///
/// # Errors
///
/// Returns `NOT_FOUND` for an unknown name.
pub async fn delete_event_type(
    Path(name): Path<String>,
    State(state): State<AppState>,
) -> std::result::Result<StatusCode, AppError> {
    let existing = require_by_name(&state, &name).await?;
    state
        .documents
        .delete(Collection::EventTypes, &existing.id)
        .await?;
    tracing::info!(event_type = %name, "Event type deleted");
    Ok(StatusCode::NO_CONTENT)
}
