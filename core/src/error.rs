//! Error taxonomy shared by every gateway and the aggregator.
//!
//! Gateways translate driver failures into [`YouthGroupError::Store`] tagged
//! with the [`StoreKind`] that failed. Whether such a failure is fatal is
//! decided by the caller, not the gateway: relational failures always
//! propagate, document and ephemeral failures are absorbed on enrichment
//! paths (see [`crate::aggregator`]).

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type for domain and gateway operations.
pub type Result<T> = std::result::Result<T, YouthGroupError>;

/// The three backing stores behind the gateways.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StoreKind {
    /// Authoritative structured store (people, events, registrations, groups).
    Relational,
    /// Schema-free notes, contacts and event type definitions.
    Document,
    /// Live check-in state.
    Ephemeral,
}

impl StoreKind {
    /// Name of the backing technology, as reported in summary manifests.
    #[must_use]
    pub const fn backend_name(self) -> &'static str {
        match self {
            Self::Relational => "PostgreSQL",
            Self::Document => "MongoDB",
            Self::Ephemeral => "Redis",
        }
    }

    /// Lowercase label used for metrics and log fields.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Relational => "relational",
            Self::Document => "document",
            Self::Ephemeral => "ephemeral",
        }
    }
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.backend_name())
    }
}

/// Errors surfaced by gateways, validators and the aggregator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum YouthGroupError {
    // ═══════════════════════════════════════════════════════════════════════
    // Caller errors
    // ═══════════════════════════════════════════════════════════════════════
    /// Input rejected at the boundary; no store was contacted.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The referenced record does not exist in the relevant store.
    #[error("{resource} not found: {id}")]
    NotFound {
        /// Kind of record that was looked up.
        resource: &'static str,
        /// Identifier that was looked up.
        id: String,
    },

    // ═══════════════════════════════════════════════════════════════════════
    // Store errors
    // ═══════════════════════════════════════════════════════════════════════
    /// Connectivity or driver failure in one of the backing stores.
    #[error("{store} error: {message}")]
    Store {
        /// Which store failed.
        store: StoreKind,
        /// Driver-level description.
        message: String,
    },

    /// The relational schema lacks an optional column required by a write.
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),
}

impl YouthGroupError {
    /// Builds a [`YouthGroupError::NotFound`].
    pub fn not_found(resource: &'static str, id: impl fmt::Display) -> Self {
        Self::NotFound {
            resource,
            id: id.to_string(),
        }
    }

    /// Builds a [`YouthGroupError::Validation`].
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Relational store failure.
    pub fn relational(message: impl fmt::Display) -> Self {
        Self::Store {
            store: StoreKind::Relational,
            message: message.to_string(),
        }
    }

    /// Document store failure.
    pub fn document(message: impl fmt::Display) -> Self {
        Self::Store {
            store: StoreKind::Document,
            message: message.to_string(),
        }
    }

    /// Ephemeral store failure.
    pub fn ephemeral(message: impl fmt::Display) -> Self {
        Self::Store {
            store: StoreKind::Ephemeral,
            message: message.to_string(),
        }
    }

    /// Returns `true` for [`YouthGroupError::NotFound`].
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
