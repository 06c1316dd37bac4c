//! Event management API endpoints.
//!
//! - GET /events - List events, newest first
//! - POST /events - Create an event
//! - GET /events/:id - Get an event
//! - PUT /events/:id - Update an event
//! - DELETE /events/:id - Delete an event and clean up every store
//! - GET /events/:id/comprehensive - Summary across all three stores
//! - GET /events/:id/attendance - Durable check-in history

use crate::server::state::AppState;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use youthgroup_core::aggregator::{ComprehensiveEventSummary, EventDeletion};
use youthgroup_core::model::{AttendanceRecord, Event, EventInput, EventUpdate};
use youthgroup_web::{AppError, CorrelationId, JsonBody};

/// List events by date-time, newest first.
///
/// # Errors
///
/// Returns `STORE_ERROR` if the relational store fails.
pub async fn list_events(State(state): State<AppState>) -> Result<Json<Vec<Event>>, AppError> {
    Ok(Json(state.relational.list_events().await?))
}

/// Get event details by id.
///
/// # Errors
///
/// Returns `NOT_FOUND` for an unknown id.
pub async fn get_event(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<Event>, AppError> {
    state
        .relational
        .get_event(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Event", id))
}

/// Create a new event.
///
/// # Example
///
/// ```bash
/// curl -X POST http://localhost:8000/events \
///   -H "Content-Type: application/json" \
///   -d '{
///     "name": "Friday Youth Night",
///     "type": "Youth_Night",
///     "dateTime": "2025-01-03T19:00:00Z",
///     "location": "Fellowship Hall"
///   }'
/// ```
///
/// # Errors
///
/// Returns `VALIDATION_ERROR` when a required field is missing.
pub async fn create_event(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    JsonBody(input): JsonBody<EventInput>,
) -> Result<(StatusCode, Json<Event>), AppError> {
    let event = state.relational.create_event(input.validate()?).await?;
    tracing::info!(correlation_id = %correlation_id, event_id = event.id, "Event created");
    Ok((StatusCode::CREATED, Json(event)))
}

/// Update the given fields of an event.
///
/// # Errors
///
/// Returns `NOT_FOUND` for an unknown id and `VALIDATION_ERROR` for blank
/// fields.
pub async fn update_event(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    JsonBody(update): JsonBody<EventUpdate>,
) -> Result<Json<Event>, AppError> {
    let event = state.relational.update_event(id, update.validate()?).await?;
    Ok(Json(event))
}

/// Delete an event.
///
/// Registrations and attendance go with it in one transaction; event notes
/// and live check-in state are then removed on a best-effort basis. The
/// response reports what was removed.
///
/// # Errors
///
/// Returns `NOT_FOUND` for an unknown id and `STORE_ERROR` if the
/// relational delete fails.
pub async fn delete_event(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    correlation_id: CorrelationId,
) -> Result<Json<EventDeletion>, AppError> {
    let deletion = state.aggregator.delete_event(id).await?;
    tracing::info!(correlation_id = %correlation_id, event_id = id, "Event delete handled");
    Ok(Json(deletion))
}

/// Comprehensive summary: registrations, live check-ins, notes and
/// attendance rate.
///
/// # Example
///
/// ```bash
/// curl http://localhost:8000/events/1/comprehensive
/// # {"event":{...},"registrations":{"total":10,"attendees":7,...},
/// #  "summary":{"attendanceRate":40.0,...},"dataSources":{...}}
/// ```
///
/// # Errors
///
/// Returns `NOT_FOUND` for an unknown event and `STORE_ERROR` if the
/// relational store fails. Document and Redis failures only zero their
/// sections.
pub async fn comprehensive_summary(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<ComprehensiveEventSummary>, AppError> {
    Ok(Json(state.aggregator.comprehensive_summary(id).await?))
}

/// Attendance history for an event.
///
/// # Errors
///
/// Returns `NOT_FOUND` for an unknown event.
pub async fn list_attendance(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<Vec<AttendanceRecord>>, AppError> {
    if state.relational.get_event(id).await?.is_none() {
        return Err(AppError::not_found("Event", id));
    }
    Ok(Json(state.relational.list_attendance(id).await?))
}
