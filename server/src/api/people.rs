//! People endpoints.
//!
//! - GET /people - List people
//! - POST /people - Create a person
//! - GET /people/:id - Get a person
//! - PUT /people/:id - Update a person
//! - DELETE /people/:id - Delete a person (fails while they hold a role)

use crate::server::state::AppState;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use youthgroup_core::model::{Person, PersonInput, PersonUpdate};
use youthgroup_web::{AppError, CorrelationId, JsonBody};

/// List every person, ordered by last then first name.
///
/// # Errors
///
/// Returns `STORE_ERROR` if the relational store fails.
pub async fn list_people(State(state): State<AppState>) -> Result<Json<Vec<Person>>, AppError> {
    Ok(Json(state.relational.list_people().await?))
}

/// Get a person by id.
///
/// # Errors
///
/// Returns `NOT_FOUND` for an unknown id.
pub async fn get_person(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<Person>, AppError> {
    state
        .relational
        .get_person(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Person", id))
}

/// Create a person.
///
/// # Example
///
/// ```bash
/// curl -X POST http://localhost:8000/people \
///   -H "Content-Type: application/json" \
///   -d '{"firstName": "Ada", "lastName": "Lovelace", "age": 15}'
/// ```
///
/// # Errors
///
/// Returns `VALIDATION_ERROR` for a missing name.
pub async fn create_person(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    JsonBody(input): JsonBody<PersonInput>,
) -> Result<(StatusCode, Json<Person>), AppError> {
    let person = state.relational.create_person(input.validate()?).await?;
    tracing::info!(correlation_id = %correlation_id, person_id = person.id, "Person created");
    Ok((StatusCode::CREATED, Json(person)))
}

/// Update the given fields of a person.
///
/// # Errors
///
/// Returns `NOT_FOUND` for an unknown id and `VALIDATION_ERROR` for blank
/// names.
pub async fn update_person(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    JsonBody(update): JsonBody<PersonUpdate>,
) -> Result<Json<Person>, AppError> {
    let person = state.relational.update_person(id, update.validate()?).await?;
    Ok(Json(person))
}

/// Delete a person.
///
/// # Errors
///
/// Returns `NOT_FOUND` for an unknown id and `VALIDATION_ERROR` while the
/// person still holds an attendee, leader or volunteer record, or has
/// attendance history.
pub async fn delete_person(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    correlation_id: CorrelationId,
) -> Result<StatusCode, AppError> {
    state.relational.delete_person(id).await?;
    tracing::info!(correlation_id = %correlation_id, person_id = id, "Person deleted");
    Ok(StatusCode::NO_CONTENT)
}
