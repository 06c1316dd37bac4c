//! Registration endpoints.
//!
//! - GET /events/:id/registrations - Registrations with the registrant's name
//! - POST /events/:id/registrations - Register exactly one attendee, leader
//!   or volunteer
//! - DELETE /registrations/:id - Remove a registration

use crate::server::state::AppState;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use youthgroup_core::model::{Registration, RegistrationInput};
use youthgroup_web::{AppError, CorrelationId, JsonBody};

/// List the registrations for an event.
///
/// # Errors
///
/// Returns `NOT_FOUND` for an unknown event.
pub async fn list_registrations(
    Path(event_id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<Vec<Registration>>, AppError> {
    if state.relational.get_event(event_id).await?.is_none() {
        return Err(AppError::not_found("Event", event_id));
    }
    Ok(Json(state.relational.list_registrations(event_id).await?))
}

/// Register for an event.
///
/// # Example
///
/// ```bash
/// curl -X POST http://localhost:8000/events/1/registrations \
///   -H "Content-Type: application/json" \
///   -d '{"attendeeId": 3, "emergencyContact": "Mum 555-0100"}'
/// ```
///
/// # Errors
///
/// Returns `VALIDATION_ERROR` unless exactly one role id and an emergency
/// contact are given, and `NOT_FOUND` for an unknown event or role.
pub async fn create_registration(
    Path(event_id): Path<i64>,
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    JsonBody(input): JsonBody<RegistrationInput>,
) -> Result<(StatusCode, Json<Registration>), AppError> {
    let registration = state
        .relational
        .create_registration(event_id, input.validate()?)
        .await?;
    tracing::info!(
        correlation_id = %correlation_id,
        event_id,
        registration_id = registration.id,
        "Registration created"
    );
    Ok((StatusCode::CREATED, Json(registration)))
}

/// Remove a registration.
///
/// # Errors
///
/// Returns `NOT_FOUND` for an unknown id.
pub async fn delete_registration(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    state.relational.delete_registration(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
