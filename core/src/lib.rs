//! # Youth Group Core
//!
//! Domain types and store contracts for the youth group membership backend.
//!
//! Three independent stores back the service:
//!
//! - **Relational** (authoritative): people, roles, events, registrations,
//!   small groups and attendance history
//! - **Document** (flexible): person notes, parent contacts, event notes and
//!   event type definitions
//! - **Ephemeral** (live): who is checked in to an event right now
//!
//! Each store sits behind a gateway trait in [`stores`]. The [`aggregator`]
//! composes them with a fixed failure policy: relational failures are fatal,
//! document and ephemeral failures on enrichment paths degrade to empty
//! values.
//!
//! ## Example
//!
//! ```ignore
//! use youthgroup_core::aggregator::Aggregator;
//!
//! let aggregator = Aggregator::new(relational, documents, checkins, clock);
//! let summary = aggregator.comprehensive_summary(event_id).await?;
//! println!("{}% attended", summary.summary.attendance_rate);
//! ```

pub mod aggregator;
pub mod checkin;
pub mod documents;
pub mod error;
pub mod model;
pub mod stores;
pub mod validation;

pub use error::{Result, StoreKind, YouthGroupError};

// Re-export commonly used types
pub use chrono::{DateTime, Utc};

/// Environment module - injected dependencies that are not stores.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// Check-in timestamps and document `created`/`updated` stamps are taken
    /// from a `Clock` so tests can pin them.
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock backed by the system time.
    #[derive(Clone, Copy, Debug, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}
