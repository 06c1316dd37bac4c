//! Health check endpoints and response types.
//!
//! Liveness never touches a store. Readiness is assembled by the server from
//! one [`ComponentHealth`] per backing store.

use axum::{Json, http::StatusCode};
use serde::Serialize;

/// Liveness response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    /// Always `"ok"` when the process can answer.
    pub status: &'static str,
    /// Crate version.
    pub version: &'static str,
}

/// Simple health check endpoint (for basic liveness).
///
/// # Endpoint
///
/// ```text
/// GET /health
/// ```
///
/// # Response
///
/// ```json
/// { "status": "ok", "version": "0.1.0" }
/// ```
#[allow(clippy::unused_async)]
pub async fn health_check() -> (StatusCode, Json<HealthResponse>) {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok",
            version: env!("CARGO_PKG_VERSION"),
        }),
    )
}

/// Reachability of one backing store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComponentHealth {
    /// Store name, e.g. `"postgres"`.
    pub name: &'static str,
    /// Whether the ping succeeded.
    pub healthy: bool,
    /// Failure description when unhealthy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ComponentHealth {
    /// Builds a component entry from a ping result.
    pub fn from_result<E: std::fmt::Display>(name: &'static str, result: Result<(), E>) -> Self {
        match result {
            Ok(()) => Self {
                name,
                healthy: true,
                error: None,
            },
            Err(e) => Self {
                name,
                healthy: false,
                error: Some(e.to_string()),
            },
        }
    }
}

/// Readiness response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReadinessResponse {
    /// `"ready"` when every component is healthy, otherwise `"not_ready"`.
    pub status: &'static str,
    /// Per-store results.
    pub components: Vec<ComponentHealth>,
}

impl ReadinessResponse {
    /// Summarizes component results.
    #[must_use]
    pub fn new(components: Vec<ComponentHealth>) -> Self {
        let ready = components.iter().all(|c| c.healthy);
        Self {
            status: if ready { "ready" } else { "not_ready" },
            components,
        }
    }

    /// 200 when ready, 503 otherwise.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        if self.components.iter().all(|c| c.healthy) {
            StatusCode::OK
        } else {
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_simple_health_check() {
        let (status, Json(body)) = health_check().await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.status, "ok");
    }

    #[test]
    fn test_readiness_with_failed_component() {
        let response = ReadinessResponse::new(vec![
            ComponentHealth::from_result::<String>("postgres", Ok(())),
            ComponentHealth::from_result("redis", Err("connection refused")),
        ]);

        assert_eq!(response.status, "not_ready");
        assert_eq!(response.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.components[1].error.as_deref(), Some("connection refused"));
    }

    #[test]
    fn test_readiness_all_healthy() {
        let response =
            ReadinessResponse::new(vec![ComponentHealth::from_result::<String>("mongo", Ok(()))]);

        assert_eq!(response.status, "ready");
        assert_eq!(response.status_code(), StatusCode::OK);
    }
}
