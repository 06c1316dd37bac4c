//! Live check-in endpoints.
//!
//! - POST /event/:id/checkin/:person_id - Check a person in
//! - DELETE /event/:id/checkin/:person_id - Check a person out
//! - GET /event/:id/checkins - Who is checked in right now

use crate::server::state::AppState;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use youthgroup_core::checkin::{CheckInReceipt, LiveCheckInSummary};
use youthgroup_web::{AppError, CorrelationId};

/// Check a person in.
///
/// Appends an attendance record, then marks the person as present in
/// Redis with the current time.
///
/// # Errors
///
/// Returns `NOT_FOUND` for an unknown event or person and `STORE_ERROR`
/// if either write fails.
pub async fn check_in(
    Path((event_id, person_id)): Path<(i64, i64)>,
    State(state): State<AppState>,
    correlation_id: CorrelationId,
) -> Result<(StatusCode, Json<CheckInReceipt>), AppError> {
    let receipt = state.aggregator.check_in(event_id, person_id).await?;
    tracing::debug!(correlation_id = %correlation_id, event_id, person_id, "Check-in handled");
    Ok((StatusCode::CREATED, Json(receipt)))
}

/// Check a person out. Attendance history is kept.
///
/// # Errors
///
/// Returns `NOT_FOUND` if the person is not checked in.
pub async fn check_out(
    Path((event_id, person_id)): Path<(i64, i64)>,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    state.aggregator.check_out(event_id, person_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Students currently checked in, by name.
///
/// A Redis outage yields the empty listing rather than an error.
///
/// # Errors
///
/// Returns `STORE_ERROR` if the name lookup fails.
pub async fn live_check_ins(
    Path(event_id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<LiveCheckInSummary>, AppError> {
    Ok(Json(state.aggregator.live_check_ins(event_id).await?))
}
