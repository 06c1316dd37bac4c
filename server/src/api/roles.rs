//! Attendee, leader and volunteer endpoints.
//!
//! The three role tables share one set of handlers; [`role_routes`] binds
//! them to a [`RoleKind`]:
//!
//! - GET /{kind} - List role records with the person's name
//! - POST /{kind} - Create a role record for an existing person
//! - GET /{kind}/:id - Get a role record
//! - DELETE /{kind}/:id - Delete a role record

use crate::server::state::AppState;
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};
use youthgroup_core::model::{RoleInput, RoleKind, RoleRecord};
use youthgroup_web::{AppError, JsonBody};

/// Routes for one role table, to be nested under `/attendees`,
/// `/leaders` or `/volunteers`.
pub fn role_routes(kind: RoleKind) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(move |State(state): State<AppState>| list_roles(state, kind)).post(
                move |State(state): State<AppState>, JsonBody(input): JsonBody<RoleInput>| {
                    create_role(state, kind, input)
                },
            ),
        )
        .route(
            "/:id",
            get(move |Path(id): Path<i64>, State(state): State<AppState>| {
                get_role(state, kind, id)
            })
            .delete(move |Path(id): Path<i64>, State(state): State<AppState>| {
                delete_role(state, kind, id)
            }),
        )
}

async fn list_roles(state: AppState, kind: RoleKind) -> Result<Json<Vec<RoleRecord>>, AppError> {
    Ok(Json(state.relational.list_roles(kind).await?))
}

async fn get_role(state: AppState, kind: RoleKind, id: i64) -> Result<Json<RoleRecord>, AppError> {
    state
        .relational
        .get_role(kind, id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found(kind.resource(), id))
}

async fn create_role(
    state: AppState,
    kind: RoleKind,
    input: RoleInput,
) -> Result<(StatusCode, Json<RoleRecord>), AppError> {
    let record = state
        .relational
        .create_role(kind, input.validate(kind)?)
        .await?;
    tracing::info!(role = %kind, role_id = record.id, person_id = record.person_id, "Role created");
    Ok((StatusCode::CREATED, Json(record)))
}

async fn delete_role(state: AppState, kind: RoleKind, id: i64) -> Result<StatusCode, AppError> {
    state.relational.delete_role(kind, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
