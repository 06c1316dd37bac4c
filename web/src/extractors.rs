//! Custom Axum extractors.
//!
//! - [`CorrelationId`]: the request's correlation id, as assigned by
//!   [`correlation_id_layer`](crate::middleware::correlation_id_layer)
//! - [`JsonBody`]: `Json<T>` whose rejections are reported as [`AppError`]
//!
//! # Examples
//!
//! ```ignore
//! use youthgroup_web::extractors::{CorrelationId, JsonBody};
//!
//! async fn create_person(
//!     State(state): State<AppState>,
//!     correlation_id: CorrelationId,
//!     JsonBody(input): JsonBody<PersonInput>,
//! ) -> Result<(StatusCode, Json<Person>), AppError> {
//!     tracing::info!(correlation_id = %correlation_id, "Creating person");
//!     // ...
//! }
//! ```

use axum::{
    Json, async_trait,
    extract::{FromRequest, FromRequestParts, Request},
    http::request::Parts,
};
use serde::de::DeserializeOwned;
use std::fmt;
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::CORRELATION_ID_HEADER;

/// Correlation ID for request tracing.
///
/// Read from request extensions when the middleware is installed, otherwise
/// from the `X-Correlation-ID` header, otherwise freshly generated.
///
/// # Example
///
/// ```ignore
/// async fn handler(correlation_id: CorrelationId) -> String {
///     format!("Request ID: {correlation_id}")
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelationId(pub String);

impl CorrelationId {
    /// A new random (UUID v4) correlation id.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Accepts an inbound id if it is short, visible ASCII.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        let acceptable = !value.is_empty()
            && value.len() <= 128
            && value.bytes().all(|b| b.is_ascii_graphic());
        acceptable.then(|| Self(value.to_string()))
    }

    /// The id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CorrelationId
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(id) = parts.extensions.get::<Self>() {
            return Ok(id.clone());
        }

        let correlation_id = parts
            .headers
            .get(CORRELATION_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(Self::parse)
            .unwrap_or_else(Self::generate);

        Ok(correlation_id)
    }
}

/// JSON request body whose parse failures become `400 BAD_REQUEST`.
///
/// Input types keep every field optional, so a body that parses but lacks a
/// required field reaches the validator and is reported as
/// `VALIDATION_ERROR` instead.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::bad_request(rejection.body_text()))?;
        Ok(Self(value))
    }
}
