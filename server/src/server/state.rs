//! Application state for the youth group HTTP server.
//!
//! Holds the three store gateways, the aggregator composed from them and
//! the optional Prometheus handle. Cloned (cheaply, via `Arc`) per request.

use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use youthgroup_core::aggregator::Aggregator;
use youthgroup_core::environment::Clock;
use youthgroup_core::stores::{CheckInStore, DocumentStore, RelationalStore};

/// Application state shared across all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    /// People, roles, events, registrations and small groups
    pub relational: Arc<dyn RelationalStore>,

    /// Notes, parent contacts and event type definitions
    pub documents: Arc<dyn DocumentStore>,

    /// Live check-in state
    pub checkins: Arc<dyn CheckInStore>,

    /// Cross-store operations over the gateways above
    pub aggregator: Aggregator,

    /// Renders `/metrics`; `None` when metrics are disabled
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Create a new application state from explicitly constructed gateways.
    #[must_use]
    pub fn new(
        relational: Arc<dyn RelationalStore>,
        documents: Arc<dyn DocumentStore>,
        checkins: Arc<dyn CheckInStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let aggregator = Aggregator::new(
            Arc::clone(&relational),
            Arc::clone(&documents),
            Arc::clone(&checkins),
            clock,
        );
        Self {
            relational,
            documents,
            checkins,
            aggregator,
            metrics: None,
        }
    }

    /// Serve `/metrics` from `handle`.
    #[must_use]
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}
