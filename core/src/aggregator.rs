//! Cross-store composition: the comprehensive event summary, check-in flow
//! and event deletion.
//!
//! The relational store is the source of truth. Reads from the document and
//! ephemeral stores on enrichment paths are wrapped in [`SubFetch`]: a
//! failure becomes [`SubFetch::Degraded`], is logged and counted, and the
//! response carries the empty/zero value in its place.
//!
//! All gateway calls are issued sequentially.

use crate::checkin::{
    CheckInReceipt, CheckInState, CheckedInStudent, LiveCheckInSummary, format_check_in_time,
};
use crate::documents::{Collection, DocumentFilter};
use crate::environment::Clock;
use crate::error::{Result, StoreKind, YouthGroupError};
use crate::model::{Event, Registration, RegistrationRole};
use crate::stores::{CheckInStore, DocumentStore, RelationalStore};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

/// Outcome of a non-fatal read from a secondary store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubFetch<T> {
    /// The store answered.
    Fetched(T),
    /// The store failed; the caller continues with a default.
    Degraded {
        /// Which store failed.
        store: StoreKind,
        /// Error description, for logs and metrics only.
        reason: String,
    },
}

impl<T> SubFetch<T> {
    /// Converts a gateway result, recording a failure as degraded.
    pub fn settle(store: StoreKind, operation: &'static str, event_id: i64, result: Result<T>) -> Self {
        match result {
            Ok(value) => Self::Fetched(value),
            Err(error) => {
                let reason = error.to_string();
                tracing::warn!(
                    event_id,
                    store = store.label(),
                    operation,
                    reason = %reason,
                    "Secondary store fetch degraded"
                );
                metrics::counter!(
                    "youthgroup_degraded_fetches_total",
                    "store" => store.label(),
                    "operation" => operation,
                )
                .increment(1);
                Self::Degraded { store, reason }
            }
        }
    }

    /// Whether the fetch failed.
    #[must_use]
    pub const fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }
}

impl<T: Default> SubFetch<T> {
    /// The fetched value, or the type's default when degraded.
    pub fn into_value(self) -> T {
        match self {
            Self::Fetched(value) => value,
            Self::Degraded { .. } => T::default(),
        }
    }
}

/// `checked_in / total_registered * 100`, rounded to two decimals.
///
/// Zero when nobody is registered, whatever the check-in count.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn attendance_rate(checked_in: usize, total_registered: usize) -> f64 {
    if total_registered == 0 {
        return 0.0;
    }
    let rate = checked_in as f64 / total_registered as f64 * 100.0;
    (rate * 100.0).round() / 100.0
}

/// Registration counts per role.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RegistrationBreakdown {
    /// Every registration, classified or not.
    pub total: usize,
    /// Registrations by attendees.
    pub attendees: usize,
    /// Registrations by leaders.
    pub leaders: usize,
    /// Registrations by volunteers.
    pub volunteers: usize,
}

impl RegistrationBreakdown {
    /// Classifies each registration by its populated role key.
    #[must_use]
    pub fn from_registrations(registrations: &[Registration]) -> Self {
        registrations.iter().fold(
            Self {
                total: registrations.len(),
                ..Self::default()
            },
            |mut acc, registration| {
                match registration.role() {
                    Some(RegistrationRole::Attendee(_)) => acc.attendees += 1,
                    Some(RegistrationRole::Leader(_)) => acc.leaders += 1,
                    Some(RegistrationRole::Volunteer(_)) => acc.volunteers += 1,
                    None => {}
                }
                acc
            },
        )
    }
}

/// A count with the store it came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct SourcedCount {
    /// Number of items.
    pub count: usize,
    /// Backing store name.
    pub source: &'static str,
}

/// Derived numbers for an event.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventStatistics {
    /// Registrations.
    pub total_registered: usize,
    /// People currently checked in.
    pub total_checked_in: usize,
    /// Percentage, two decimals.
    pub attendance_rate: f64,
    /// Event notes.
    pub notes_count: usize,
}

/// Which store supplied each section of the summary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSources {
    /// Event row.
    pub event_info: &'static str,
    /// Registration counts.
    pub registrations: &'static str,
    /// Live check-ins.
    pub live_check_ins: &'static str,
    /// Event notes.
    pub notes: &'static str,
}

impl Default for DataSources {
    fn default() -> Self {
        Self {
            event_info: StoreKind::Relational.backend_name(),
            registrations: StoreKind::Relational.backend_name(),
            live_check_ins: StoreKind::Ephemeral.backend_name(),
            notes: StoreKind::Document.backend_name(),
        }
    }
}

/// One composite view of an event across all three stores.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComprehensiveEventSummary {
    /// The event itself.
    pub event: Event,
    /// Registration counts.
    pub registrations: RegistrationBreakdown,
    /// Live check-in count.
    pub live_check_ins: SourcedCount,
    /// Event note count.
    pub notes: SourcedCount,
    /// Derived statistics.
    pub summary: EventStatistics,
    /// Store manifest.
    pub data_sources: DataSources,
}

/// What an event deletion removed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDeletion {
    /// Deleted event.
    pub event_id: i64,
    /// Registrations removed with it.
    pub registrations_removed: u64,
    /// Attendance records removed with it.
    pub attendance_records_removed: u64,
    /// Event notes removed; `None` if the document store failed.
    pub notes_removed: Option<u64>,
    /// Whether live check-in state was purged.
    pub check_ins_purged: bool,
}

/// Composes the three gateways.
#[derive(Clone)]
pub struct Aggregator {
    relational: Arc<dyn RelationalStore>,
    documents: Arc<dyn DocumentStore>,
    checkins: Arc<dyn CheckInStore>,
    clock: Arc<dyn Clock>,
}

impl Aggregator {
    /// Creates an aggregator over explicitly constructed gateways.
    #[must_use]
    pub fn new(
        relational: Arc<dyn RelationalStore>,
        documents: Arc<dyn DocumentStore>,
        checkins: Arc<dyn CheckInStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            relational,
            documents,
            checkins,
            clock,
        }
    }

    async fn require_event(&self, event_id: i64) -> Result<Event> {
        self.relational
            .get_event(event_id)
            .await?
            .ok_or_else(|| YouthGroupError::not_found("Event", event_id))
    }

    /// Builds the comprehensive summary for an event.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the event does not exist; no other store is contacted
    /// - relational store errors from the event or registration fetch
    ///
    /// Document and ephemeral failures never surface.
    pub async fn comprehensive_summary(&self, event_id: i64) -> Result<ComprehensiveEventSummary> {
        let started = Instant::now();
        let event = self.require_event(event_id).await?;

        let registrations = self.relational.list_registrations(event_id).await?;
        let breakdown = RegistrationBreakdown::from_registrations(&registrations);

        let live: CheckInState = SubFetch::settle(
            StoreKind::Ephemeral,
            "list_checked_in",
            event_id,
            self.checkins.list_checked_in(event_id).await,
        )
        .into_value();

        let notes = SubFetch::settle(
            StoreKind::Document,
            "find_event_notes",
            event_id,
            self.documents
                .find(
                    Collection::EventNotes,
                    DocumentFilter::owned_by(Collection::EventNotes, event_id),
                )
                .await,
        )
        .into_value();

        let checked_in = live.count();
        tracing::debug!(
            event_id,
            registrations = breakdown.total,
            checked_in,
            notes = notes.len(),
            "Built comprehensive summary"
        );
        metrics::histogram!("youthgroup_summary_duration_seconds")
            .record(started.elapsed().as_secs_f64());

        Ok(ComprehensiveEventSummary {
            event,
            registrations: breakdown,
            live_check_ins: SourcedCount {
                count: checked_in,
                source: StoreKind::Ephemeral.backend_name(),
            },
            notes: SourcedCount {
                count: notes.len(),
                source: StoreKind::Document.backend_name(),
            },
            summary: EventStatistics {
                total_registered: breakdown.total,
                total_checked_in: checked_in,
                attendance_rate: attendance_rate(checked_in, breakdown.total),
                notes_count: notes.len(),
            },
            data_sources: DataSources::default(),
        })
    }

    /// Checks a person in: durable attendance record, then live state.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the event or person does not exist
    /// - relational or ephemeral store errors
    pub async fn check_in(&self, event_id: i64, person_id: i64) -> Result<CheckInReceipt> {
        self.require_event(event_id).await?;
        self.relational
            .get_person(person_id)
            .await?
            .ok_or_else(|| YouthGroupError::not_found("Person", person_id))?;

        let at = self.clock.now();
        let record = self
            .relational
            .record_attendance(event_id, person_id, at)
            .await?;
        self.checkins.check_in(event_id, person_id, at).await?;

        tracing::info!(event_id, person_id, attendance_id = record.id, "Person checked in");
        metrics::counter!("youthgroup_check_ins_total").increment(1);

        Ok(CheckInReceipt {
            event_id,
            person_id,
            check_in_time: format_check_in_time(at),
            message: format!("Person {person_id} checked in to event {event_id}."),
        })
    }

    /// Removes a person from the live state. Attendance history is kept.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the person was not checked in
    /// - ephemeral store errors
    pub async fn check_out(&self, event_id: i64, person_id: i64) -> Result<()> {
        if !self.checkins.check_out(event_id, person_id).await? {
            return Err(YouthGroupError::not_found(
                "Check-in",
                format!("person {person_id} at event {event_id}"),
            ));
        }
        tracing::info!(event_id, person_id, "Person checked out");
        metrics::counter!("youthgroup_check_outs_total").increment(1);
        Ok(())
    }

    /// Currently checked-in students with names and times.
    ///
    /// An ephemeral store failure yields the empty listing.
    ///
    /// # Errors
    ///
    /// Returns relational store errors from the name lookup.
    pub async fn live_check_ins(&self, event_id: i64) -> Result<LiveCheckInSummary> {
        let state: CheckInState = SubFetch::settle(
            StoreKind::Ephemeral,
            "list_checked_in",
            event_id,
            self.checkins.list_checked_in(event_id).await,
        )
        .into_value();

        if state.is_empty() {
            return Ok(LiveCheckInSummary::new(event_id, Vec::new()));
        }

        let mut people = self
            .relational
            .find_people(state.person_ids.iter().copied().collect())
            .await?;
        people.sort_by(|a, b| {
            (a.last_name.as_str(), a.first_name.as_str())
                .cmp(&(b.last_name.as_str(), b.first_name.as_str()))
        });

        let students = people
            .into_iter()
            .map(|person| CheckedInStudent {
                check_in_time: state.times.get(&person.id).cloned(),
                student_id: person.id,
                first_name: person.first_name,
                last_name: person.last_name,
            })
            .collect();

        Ok(LiveCheckInSummary::new(event_id, students))
    }

    /// Deletes an event: relational rows first, then best-effort cleanup of
    /// its notes and live state.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the event does not exist
    /// - relational store errors (nothing else is attempted)
    pub async fn delete_event(&self, event_id: i64) -> Result<EventDeletion> {
        let cascade = self.relational.delete_event(event_id).await?;

        let notes = SubFetch::settle(
            StoreKind::Document,
            "delete_event_notes",
            event_id,
            self.documents
                .delete_matching(
                    Collection::EventNotes,
                    DocumentFilter::owned_by(Collection::EventNotes, event_id),
                )
                .await,
        );
        let purge = SubFetch::settle(
            StoreKind::Ephemeral,
            "purge_check_ins",
            event_id,
            self.checkins.purge(event_id).await,
        );

        let deletion = EventDeletion {
            event_id,
            registrations_removed: cascade.registrations,
            attendance_records_removed: cascade.attendance_records,
            notes_removed: match notes {
                SubFetch::Fetched(count) => Some(count),
                SubFetch::Degraded { .. } => None,
            },
            check_ins_purged: !purge.is_degraded(),
        };
        tracing::info!(
            event_id,
            registrations = deletion.registrations_removed,
            notes = ?deletion.notes_removed,
            purged = deletion.check_ins_purged,
            "Event deleted"
        );
        Ok(deletion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn registration(id: i64, role: RegistrationRole) -> Registration {
        let (attendee_id, leader_id, volunteer_id) = role.keys();
        Registration {
            id,
            event_id: 1,
            attendee_id,
            leader_id,
            volunteer_id,
            emergency_contact: "555-0100".to_string(),
            person_id: None,
            first_name: None,
            last_name: None,
        }
    }

    #[test]
    fn attendance_rate_with_no_registrations_is_zero() {
        assert!(attendance_rate(0, 0).abs() < f64::EPSILON);
        assert!(attendance_rate(12, 0).abs() < f64::EPSILON);
    }

    #[test]
    fn attendance_rate_rounds_to_two_decimals() {
        assert!((attendance_rate(4, 10) - 40.0).abs() < f64::EPSILON);
        assert!((attendance_rate(1, 3) - 33.33).abs() < 1e-9);
        assert!((attendance_rate(2, 3) - 66.67).abs() < 1e-9);
    }

    #[test]
    fn breakdown_counts_each_role() {
        let registrations = vec![
            registration(1, RegistrationRole::Attendee(1)),
            registration(2, RegistrationRole::Attendee(2)),
            registration(3, RegistrationRole::Leader(1)),
            registration(4, RegistrationRole::Volunteer(1)),
        ];
        let breakdown = RegistrationBreakdown::from_registrations(&registrations);
        assert_eq!(
            breakdown,
            RegistrationBreakdown {
                total: 4,
                attendees: 2,
                leaders: 1,
                volunteers: 1
            }
        );
    }

    #[test]
    fn degraded_fetch_yields_default() {
        let fetch: SubFetch<Vec<i64>> = SubFetch::settle(
            StoreKind::Document,
            "find_event_notes",
            1,
            Err(YouthGroupError::document("timeout")),
        );
        assert!(fetch.is_degraded());
        assert!(fetch.into_value().is_empty());
    }

    #[test]
    fn data_sources_name_backends() {
        let sources = DataSources::default();
        assert_eq!(sources.event_info, "PostgreSQL");
        assert_eq!(sources.live_check_ins, "Redis");
        assert_eq!(sources.notes, "MongoDB");
    }

    proptest! {
        #[test]
        fn attendance_rate_never_nan(checked_in in 0_usize..10_000, total in 0_usize..10_000) {
            let rate = attendance_rate(checked_in, total);
            prop_assert!(rate.is_finite());
            prop_assert!(rate >= 0.0);
        }
    }
}
