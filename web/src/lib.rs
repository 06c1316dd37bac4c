//! Axum integration for the youth group backend.
//!
//! This crate holds the HTTP glue that is independent of any particular
//! route table:
//!
//! - [`AppError`]: maps [`YouthGroupError`](youthgroup_core::YouthGroupError)
//!   to `400`/`404`/`500` JSON responses
//! - [`correlation_id_layer`]: request correlation ids and tracing spans
//! - [`JsonBody`] and [`CorrelationId`] extractors
//! - Liveness and readiness response types
//!
//! # Example
//!
//! ```ignore
//! use youthgroup_web::{AppError, JsonBody, WebResult};
//! use axum::{Router, routing::post, Json};
//!
//! async fn create_group(
//!     State(state): State<AppState>,
//!     JsonBody(input): JsonBody<SmallGroupInput>,
//! ) -> WebResult<Json<SmallGroup>> {
//!     let name = input.validate()?;
//!     Ok(Json(state.relational.create_group(name).await?))
//! }
//!
//! let app = Router::new()
//!     .route("/smallgroups", post(create_group))
//!     .layer(correlation_id_layer())
//!     .with_state(app_state);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;

// Re-export key types for convenience
pub use error::AppError;
pub use extractors::{CorrelationId, JsonBody};
pub use middleware::{CORRELATION_ID_HEADER, correlation_id_layer};

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;
