//! Person notes, parent contacts and event notes.
//!
//! All three are schema-free documents owned by a relational record:
//!
//! - GET/POST /persons/:id/notes, PUT/DELETE /notes/:note_id
//! - GET/POST /persons/:id/contacts, PUT/DELETE /contacts/:contact_id
//! - GET/POST /events/:id/notes, PUT/DELETE /event-notes/:note_id
//!
//! Owner ids are not checked against the relational store.

use crate::server::state::AppState;
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
};
use serde::Serialize;
use youthgroup_core::documents::{
    Collection, Document, DocumentFilter, Fields, prepare_insert, prepare_update,
};
use youthgroup_web::{AppError, JsonBody};

/// Response after creating a document.
#[derive(Debug, Serialize)]
pub struct CreatedDocument {
    /// Store-assigned id
    pub id: String,
    /// Success message
    pub message: String,
}

/// Routes for every owned document collection.
pub fn document_routes() -> Router<AppState> {
    Router::new()
        .merge(owned_collection(
            Collection::PersonNotes,
            "/persons/:id/notes",
            "/notes/:note_id",
        ))
        .merge(owned_collection(
            Collection::ParentContacts,
            "/persons/:id/contacts",
            "/contacts/:contact_id",
        ))
        .merge(owned_collection(
            Collection::EventNotes,
            "/events/:id/notes",
            "/event-notes/:note_id",
        ))
}

fn owned_collection(
    collection: Collection,
    list_path: &str,
    item_path: &str,
) -> Router<AppState> {
    Router::new()
        .route(
            list_path,
            get(move |Path(owner_id): Path<i64>, State(state): State<AppState>| {
                list_documents(state, collection, owner_id)
            })
            .post(
                move |Path(owner_id): Path<i64>,
                      State(state): State<AppState>,
                      JsonBody(fields): JsonBody<Fields>| {
                    create_document(state, collection, owner_id, fields)
                },
            ),
        )
        .route(
            item_path,
            put(
                move |Path(id): Path<String>,
                      State(state): State<AppState>,
                      JsonBody(fields): JsonBody<Fields>| {
                    update_document(state, collection, id, fields)
                },
            )
            .delete(move |Path(id): Path<String>, State(state): State<AppState>| {
                delete_document(state, collection, id)
            }),
        )
}

async fn list_documents(
    state: AppState,
    collection: Collection,
    owner_id: i64,
) -> Result<Json<Vec<Document>>, AppError> {
    let documents = state
        .documents
        .find(collection, DocumentFilter::owned_by(collection, owner_id))
        .await?;
    Ok(Json(documents))
}

async fn create_document(
    state: AppState,
    collection: Collection,
    owner_id: i64,
    fields: Fields,
) -> Result<(StatusCode, Json<CreatedDocument>), AppError> {
    let fields = prepare_insert(collection, Some(owner_id), fields)?;
    let id = state.documents.insert(collection, fields).await?;
    tracing::info!(collection = %collection, owner_id, document_id = %id, "Document created");
    Ok((
        StatusCode::CREATED,
        Json(CreatedDocument {
            id,
            message: format!("{} created", collection.resource()),
        }),
    ))
}

async fn update_document(
    state: AppState,
    collection: Collection,
    id: String,
    fields: Fields,
) -> Result<Json<Document>, AppError> {
    let fields = prepare_update(collection, fields)?;
    Ok(Json(state.documents.update(collection, &id, fields).await?))
}

async fn delete_document(
    state: AppState,
    collection: Collection,
    id: String,
) -> Result<StatusCode, AppError> {
    state.documents.delete(collection, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
