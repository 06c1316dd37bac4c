//! Small group endpoints.
//!
//! - GET /smallgroups, POST /smallgroups
//! - GET /smallgroups/:id, DELETE /smallgroups/:id
//! - GET/POST /smallgroups/:id/members, DELETE /smallgroups/:id/members/:attendee_id
//! - GET/POST /smallgroups/:id/leaders, DELETE /smallgroups/:id/leaders/:leader_id

use crate::server::state::AppState;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use youthgroup_core::model::{
    GroupLeaderInput, MemberInput, SmallGroup, SmallGroupInput, SmallGroupLeader, SmallGroupMember,
};
use youthgroup_web::{AppError, JsonBody};

/// List small groups by name.
///
/// # Errors
///
/// Returns `STORE_ERROR` if the relational store fails.
pub async fn list_groups(State(state): State<AppState>) -> Result<Json<Vec<SmallGroup>>, AppError> {
    Ok(Json(state.relational.list_groups().await?))
}

/// Get a small group.
///
/// # Errors
///
/// Returns `NOT_FOUND` for an unknown id.
pub async fn get_group(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<SmallGroup>, AppError> {
    state
        .relational
        .get_group(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Small group", id))
}

/// Create a small group. Its id is one past the largest existing id.
///
/// # Errors
///
/// Returns `VALIDATION_ERROR` for a missing name.
pub async fn create_group(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<SmallGroupInput>,
) -> Result<(StatusCode, Json<SmallGroup>), AppError> {
    let group = state.relational.create_group(input.validate()?).await?;
    Ok((StatusCode::CREATED, Json(group)))
}

/// Delete a small group with its member and leader assignments.
///
/// # Errors
///
/// Returns `NOT_FOUND` for an unknown id.
pub async fn delete_group(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    state.relational.delete_group(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Members of a group, by name.
///
/// # Errors
///
/// Returns `STORE_ERROR` if the relational store fails.
pub async fn list_members(
    Path(group_id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<Vec<SmallGroupMember>>, AppError> {
    Ok(Json(state.relational.list_members(group_id).await?))
}

/// Add an attendee to a group.
///
/// # Errors
///
/// Returns `NOT_FOUND` for an unknown group or attendee and
/// `VALIDATION_ERROR` if the attendee is already a member.
pub async fn add_member(
    Path(group_id): Path<i64>,
    State(state): State<AppState>,
    JsonBody(input): JsonBody<MemberInput>,
) -> Result<(StatusCode, Json<SmallGroupMember>), AppError> {
    let member = state
        .relational
        .add_member(group_id, input.validate()?)
        .await?;
    Ok((StatusCode::CREATED, Json(member)))
}

/// Remove an attendee from a group.
///
/// # Errors
///
/// Returns `NOT_FOUND` if the attendee is not a member.
pub async fn remove_member(
    Path((group_id, attendee_id)): Path<(i64, i64)>,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    state.relational.remove_member(group_id, attendee_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Leaders of a group, by name.
///
/// # Errors
///
/// Returns `STORE_ERROR` if the relational store fails.
pub async fn list_leaders(
    Path(group_id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<Vec<SmallGroupLeader>>, AppError> {
    Ok(Json(state.relational.list_group_leaders(group_id).await?))
}

/// Assign a leader to a group.
///
/// # Errors
///
/// Returns `NOT_FOUND` for an unknown group or leader and
/// `VALIDATION_ERROR` if the leader is already assigned.
pub async fn add_leader(
    Path(group_id): Path<i64>,
    State(state): State<AppState>,
    JsonBody(input): JsonBody<GroupLeaderInput>,
) -> Result<(StatusCode, Json<SmallGroupLeader>), AppError> {
    let leader = state
        .relational
        .add_group_leader(group_id, input.validate()?)
        .await?;
    Ok((StatusCode::CREATED, Json(leader)))
}

/// Unassign a leader from a group.
///
/// # Errors
///
/// Returns `NOT_FOUND` if the leader is not assigned.
pub async fn remove_leader(
    Path((group_id, leader_id)): Path<(i64, i64)>,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    state
        .relational
        .remove_group_leader(group_id, leader_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
