//! Health, readiness, welcome and metrics endpoints.

use super::state::AppState;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use youthgroup_web::handlers::{ComponentHealth, ReadinessResponse};

/// Welcome response body.
#[derive(Debug, Serialize)]
pub struct WelcomeResponse {
    /// Greeting
    pub message: &'static str,
    /// Crate version
    pub version: &'static str,
}

/// `GET /`
#[allow(clippy::unused_async)]
pub async fn welcome() -> Json<WelcomeResponse> {
    Json(WelcomeResponse {
        message: "Welcome to the Youth Group API",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Readiness check endpoint.
///
/// Pings PostgreSQL, MongoDB and Redis in turn. Returns 503 when any of
/// them fails.
///
/// # Example
///
/// ```bash
/// curl http://localhost:8000/ready
/// # {"status":"ready","components":[{"name":"postgres","healthy":true}, ...]}
/// ```
pub async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    let components = vec![
        ComponentHealth::from_result("postgres", state.relational.ping().await),
        ComponentHealth::from_result("mongodb", state.documents.ping().await),
        ComponentHealth::from_result("redis", state.checkins.ping().await),
    ];
    let response = ReadinessResponse::new(components);

    if response.status_code() != StatusCode::OK {
        tracing::warn!(components = ?response.components, "Readiness check failed");
    }
    (response.status_code(), Json(response))
}

/// `GET /metrics` in Prometheus text format; 404 when metrics are disabled.
#[allow(clippy::unused_async)]
pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    match state.metrics {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (StatusCode::NOT_FOUND, "metrics are disabled".to_string()),
    }
}
