//! Live check-in state and the views built from it.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Checked-in people for one event, as held by the ephemeral store.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInState {
    /// Members of the checked-in set.
    pub person_ids: BTreeSet<i64>,
    /// Check-in timestamp per person, ISO-8601.
    pub times: BTreeMap<i64, String>,
}

impl CheckInState {
    /// Number of people currently checked in.
    #[must_use]
    pub fn count(&self) -> usize {
        self.person_ids.len()
    }

    /// An empty state means no one is checked in.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.person_ids.is_empty()
    }
}

/// Formats a check-in instant the way it is stored in the time map.
#[must_use]
pub fn format_check_in_time(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// One student in the live check-in listing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckedInStudent {
    /// Person id.
    pub student_id: i64,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// When they checked in, if the time map has an entry.
    pub check_in_time: Option<String>,
}

/// Live check-in listing for an event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveCheckInSummary {
    /// Event id.
    pub event_id: i64,
    /// Number of listed students. Ids that no longer resolve to a person
    /// are skipped here but still counted by the event summary.
    pub count: usize,
    /// Students ordered by last then first name.
    pub students: Vec<CheckedInStudent>,
    /// Human-readable status line.
    pub message: String,
}

impl LiveCheckInSummary {
    /// Builds the listing and its status line.
    #[must_use]
    pub fn new(event_id: i64, students: Vec<CheckedInStudent>) -> Self {
        let message = if students.is_empty() {
            "No students are currently checked in.".to_string()
        } else {
            format!("{} students are currently checked in.", students.len())
        };
        Self {
            event_id,
            count: students.len(),
            students,
            message,
        }
    }
}

/// Returned by a successful check-in.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInReceipt {
    /// Event id.
    pub event_id: i64,
    /// Person id.
    pub person_id: i64,
    /// Recorded timestamp.
    pub check_in_time: String,
    /// Human-readable confirmation.
    pub message: String,
}
