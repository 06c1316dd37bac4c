//! # Youth Group Testing
//!
//! Testing utilities for the youth group backend.
//!
//! This crate provides:
//! - In-memory implementations of the three store gateways, each with a
//!   failure switch and a call counter
//! - A fixed clock for deterministic timestamps
//! - [`TestStores`], which wires the in-memory gateways into an
//!   [`Aggregator`]
//!
//! ## Example
//!
//! ```
//! use youthgroup_testing::TestStores;
//!
//! # async fn example() -> youthgroup_core::Result<()> {
//! let stores = TestStores::new();
//! stores.documents.set_failing(true);
//!
//! let aggregator = stores.aggregator();
//! // Document failures degrade to empty values on enrichment paths.
//! # Ok(())
//! # }
//! ```

use chrono::{DateTime, Utc};
use std::sync::Arc;
use youthgroup_core::aggregator::Aggregator;
use youthgroup_core::environment::Clock;

mod checkin_mocks;
mod document_mocks;
mod relational_mocks;

pub use checkin_mocks::InMemoryCheckInStore;
pub use document_mocks::InMemoryDocumentStore;
pub use relational_mocks::InMemoryRelationalStore;

/// Mock implementations of environment traits.
pub mod mocks {
    use super::{Clock, DateTime, Utc};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use youthgroup_testing::mocks::FixedClock;
    /// use youthgroup_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 18:30:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T18:30:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

/// Test helpers and utilities.
pub mod helpers {
    /// Installs a test-friendly `tracing` subscriber.
    ///
    /// Honors `RUST_LOG`; safe to call from every test.
    pub fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }
}

// Re-export commonly used items
pub use mocks::{FixedClock, test_clock};

/// The three in-memory gateways plus a fixed clock.
///
/// Fields are shared handles: flipping a failure switch or reading a call
/// count affects the same store the aggregator uses.
#[derive(Clone, Debug)]
pub struct TestStores {
    /// Relational gateway.
    pub relational: InMemoryRelationalStore,
    /// Document gateway.
    pub documents: InMemoryDocumentStore,
    /// Ephemeral check-in gateway.
    pub checkins: InMemoryCheckInStore,
    /// Clock handed to the aggregator.
    pub clock: FixedClock,
}

impl Default for TestStores {
    fn default() -> Self {
        Self::new()
    }
}

impl TestStores {
    /// Fresh, empty stores using [`test_clock`].
    #[must_use]
    pub fn new() -> Self {
        let clock = test_clock();
        Self {
            relational: InMemoryRelationalStore::new(),
            documents: InMemoryDocumentStore::with_clock(Arc::new(clock.clone())),
            checkins: InMemoryCheckInStore::new(),
            clock,
        }
    }

    /// An aggregator over these stores.
    #[must_use]
    pub fn aggregator(&self) -> Aggregator {
        Aggregator::new(
            Arc::new(self.relational.clone()),
            Arc::new(self.documents.clone()),
            Arc::new(self.checkins.clone()),
            Arc::new(self.clock.clone()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock() {
        let clock = test_clock();
        let time1 = clock.now();
        let time2 = clock.now();
        assert_eq!(time1, time2);
    }

    #[test]
    fn test_cloned_stores_share_failure_switches() {
        use youthgroup_core::stores::RelationalStore;

        let stores = TestStores::new();
        let copy = stores.clone();
        copy.relational.set_failing(true);

        let result = tokio_test::block_on(stores.relational.ping());
        assert!(result.is_err());
        assert_eq!(copy.relational.calls(), 1);
    }
}
