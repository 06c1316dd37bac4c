//! Relational entities and the validated inputs that create them.
//!
//! Request bodies deserialize into the `*Input` types, whose fields are all
//! optional so that a missing field is reported as a validation failure
//! rather than a deserialization failure. [`crate::validation`] turns them
//! into the `New*` types the gateways accept.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Next id for a table whose ids are assigned by the application.
///
/// `max` is the largest existing id, or `None` for an empty table.
#[must_use]
pub const fn next_manual_id(max: Option<i64>) -> i64 {
    match max {
        Some(current) => current + 1,
        None => 1,
    }
}

/// Optional relational columns detected once at startup.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaCapabilities {
    /// Whether `registration.volunteer_id` exists.
    pub registration_volunteer: bool,
}

impl Default for SchemaCapabilities {
    fn default() -> Self {
        Self {
            registration_volunteer: true,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// People and roles
// ═══════════════════════════════════════════════════════════════════════════

/// Root identity record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    /// Identity column.
    pub id: i64,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Age in years, when known.
    pub age: Option<i32>,
}

/// Request body for creating a person.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonInput {
    /// Given name (required).
    pub first_name: Option<String>,
    /// Family name (required).
    pub last_name: Option<String>,
    /// Age in years.
    pub age: Option<i32>,
}

/// Validated person ready for insertion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewPerson {
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Age in years.
    pub age: Option<i32>,
}

/// Partial update; absent fields are left untouched.
///
/// A `null` reads the same as an absent field, so an update cannot clear
/// `age` once it is set.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonUpdate {
    /// New given name.
    pub first_name: Option<String>,
    /// New family name.
    pub last_name: Option<String>,
    /// New age.
    pub age: Option<i32>,
}

/// The three role tables extending a person.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleKind {
    /// A student attending events; carries a guardian.
    Attendee,
    /// An adult leader.
    Leader,
    /// A helper.
    Volunteer,
}

impl RoleKind {
    /// All role kinds, in classification order.
    pub const ALL: [Self; 3] = [Self::Attendee, Self::Leader, Self::Volunteer];

    /// Singular resource name used in not-found errors.
    #[must_use]
    pub const fn resource(self) -> &'static str {
        match self {
            Self::Attendee => "Attendee",
            Self::Leader => "Leader",
            Self::Volunteer => "Volunteer",
        }
    }
}

impl fmt::Display for RoleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.resource())
    }
}

/// A row of one of the role tables, joined with the person's name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleRecord {
    /// Which role table the row lives in.
    pub kind: RoleKind,
    /// Role id (manually assigned).
    pub id: i64,
    /// Back-reference to [`Person`].
    pub person_id: i64,
    /// Guardian, attendees only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guardian: Option<String>,
    /// Joined from the person.
    pub first_name: Option<String>,
    /// Joined from the person.
    pub last_name: Option<String>,
}

/// Request body for creating a role record.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleInput {
    /// Person taking the role (required).
    pub person_id: Option<i64>,
    /// Guardian (required for attendees).
    pub guardian: Option<String>,
}

/// Validated role record ready for insertion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewRoleRecord {
    /// Person taking the role.
    pub person_id: i64,
    /// Guardian, set only for attendees.
    pub guardian: Option<String>,
}

// ═══════════════════════════════════════════════════════════════════════════
// Events, registrations, attendance
// ═══════════════════════════════════════════════════════════════════════════

/// A scheduled event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Identity column (database generated).
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Free-text category, e.g. `Youth_Night`.
    #[serde(rename = "type")]
    pub event_type: String,
    /// When the event starts.
    pub date_time: DateTime<Utc>,
    /// Where the event happens.
    pub location: String,
    /// Optional free text.
    pub notes: Option<String>,
}

/// Request body for creating an event.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventInput {
    /// Display name (required).
    pub name: Option<String>,
    /// Category (required).
    #[serde(rename = "type")]
    pub event_type: Option<String>,
    /// Start time (required).
    pub date_time: Option<DateTime<Utc>>,
    /// Location (required).
    pub location: Option<String>,
    /// Free text.
    pub notes: Option<String>,
}

/// Validated event ready for insertion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewEvent {
    /// Display name.
    pub name: String,
    /// Category.
    pub event_type: String,
    /// Start time.
    pub date_time: DateTime<Utc>,
    /// Location.
    pub location: String,
    /// Free text.
    pub notes: Option<String>,
}

/// Partial event update. Absent and `null` fields are left untouched, so
/// `notes` cannot be cleared once set.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventUpdate {
    /// New name.
    pub name: Option<String>,
    /// New category.
    #[serde(rename = "type")]
    pub event_type: Option<String>,
    /// New start time.
    pub date_time: Option<DateTime<Utc>>,
    /// New location.
    pub location: Option<String>,
    /// New notes.
    pub notes: Option<String>,
}

/// Which role a registration points at, with that role's id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RegistrationRole {
    /// `attendee_id` is set.
    Attendee(i64),
    /// `leader_id` is set.
    Leader(i64),
    /// `volunteer_id` is set.
    Volunteer(i64),
}

impl RegistrationRole {
    /// Role table the id refers to.
    #[must_use]
    pub const fn kind(self) -> RoleKind {
        match self {
            Self::Attendee(_) => RoleKind::Attendee,
            Self::Leader(_) => RoleKind::Leader,
            Self::Volunteer(_) => RoleKind::Volunteer,
        }
    }

    /// The referenced role id.
    #[must_use]
    pub const fn role_id(self) -> i64 {
        match self {
            Self::Attendee(id) | Self::Leader(id) | Self::Volunteer(id) => id,
        }
    }

    /// `(attendee_id, leader_id, volunteer_id)` with exactly one set.
    #[must_use]
    pub const fn keys(self) -> (Option<i64>, Option<i64>, Option<i64>) {
        match self {
            Self::Attendee(id) => (Some(id), None, None),
            Self::Leader(id) => (None, Some(id), None),
            Self::Volunteer(id) => (None, None, Some(id)),
        }
    }
}

/// A person's registration for an event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    /// Registration id (manually assigned).
    pub id: i64,
    /// Event registered for.
    pub event_id: i64,
    /// Set when an attendee registered.
    pub attendee_id: Option<i64>,
    /// Set when a leader registered.
    pub leader_id: Option<i64>,
    /// Set when a volunteer registered; always `None` without the column.
    pub volunteer_id: Option<i64>,
    /// Required emergency contact.
    pub emergency_contact: String,
    /// Joined through the role table.
    pub person_id: Option<i64>,
    /// Joined through the role table.
    pub first_name: Option<String>,
    /// Joined through the role table.
    pub last_name: Option<String>,
}

impl Registration {
    /// Classifies the registration by its populated foreign key.
    ///
    /// Rows written through this service always carry exactly one key;
    /// legacy rows with several are classified by the first in
    /// attendee, leader, volunteer order.
    #[must_use]
    pub fn role(&self) -> Option<RegistrationRole> {
        self.attendee_id
            .map(RegistrationRole::Attendee)
            .or_else(|| self.leader_id.map(RegistrationRole::Leader))
            .or_else(|| self.volunteer_id.map(RegistrationRole::Volunteer))
    }
}

/// Request body for registering for an event.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationInput {
    /// Attendee id.
    pub attendee_id: Option<i64>,
    /// Leader id.
    pub leader_id: Option<i64>,
    /// Volunteer id.
    pub volunteer_id: Option<i64>,
    /// Emergency contact (required).
    pub emergency_contact: Option<String>,
}

/// Validated registration: exactly one role, non-blank emergency contact.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewRegistration {
    /// The registering role.
    pub role: RegistrationRole,
    /// Emergency contact.
    pub emergency_contact: String,
}

/// Durable history of a check-in.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    /// Identity column (database generated).
    pub id: i64,
    /// Event attended.
    pub event_id: i64,
    /// Person who checked in.
    pub person_id: i64,
    /// When the check-in happened.
    pub checked_in_at: DateTime<Utc>,
}

// ═══════════════════════════════════════════════════════════════════════════
// Small groups
// ═══════════════════════════════════════════════════════════════════════════

/// A small group.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmallGroup {
    /// Manually assigned id.
    pub id: i64,
    /// Display name.
    pub name: String,
}

/// Request body for creating a small group.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct SmallGroupInput {
    /// Display name (required).
    pub name: Option<String>,
}

/// Attendee membership in a small group.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmallGroupMember {
    /// Manually assigned id.
    pub id: i64,
    /// Group.
    pub small_group_id: i64,
    /// Member.
    pub attendee_id: i64,
    /// Joined from the person.
    pub first_name: Option<String>,
    /// Joined from the person.
    pub last_name: Option<String>,
}

/// Leader assignment to a small group.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmallGroupLeader {
    /// Manually assigned id.
    pub id: i64,
    /// Group.
    pub small_group_id: i64,
    /// Assigned leader.
    pub leader_id: i64,
    /// Joined from the person.
    pub first_name: Option<String>,
    /// Joined from the person.
    pub last_name: Option<String>,
}

/// Request body for adding a member to a group.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberInput {
    /// Attendee to add (required).
    pub attendee_id: Option<i64>,
}

/// Request body for assigning a leader to a group.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupLeaderInput {
    /// Leader to assign (required).
    pub leader_id: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn registration(attendee: Option<i64>, leader: Option<i64>, volunteer: Option<i64>) -> Registration {
        Registration {
            id: 1,
            event_id: 1,
            attendee_id: attendee,
            leader_id: leader,
            volunteer_id: volunteer,
            emergency_contact: "555-0100".to_string(),
            person_id: None,
            first_name: None,
            last_name: None,
        }
    }

    #[test]
    fn first_manual_id_is_one() {
        assert_eq!(next_manual_id(None), 1);
        assert_eq!(next_manual_id(Some(7)), 8);
    }

    #[test]
    fn registration_classified_by_populated_key() {
        assert_eq!(
            registration(Some(3), None, None).role(),
            Some(RegistrationRole::Attendee(3))
        );
        assert_eq!(
            registration(None, Some(4), None).role(),
            Some(RegistrationRole::Leader(4))
        );
        assert_eq!(
            registration(None, None, Some(5)).role().map(RegistrationRole::kind),
            Some(RoleKind::Volunteer)
        );
        assert_eq!(registration(None, None, None).role(), None);
    }

    #[test]
    fn event_serializes_type_field() {
        let event = Event {
            id: 1,
            name: "Friday Night".to_string(),
            event_type: "Youth_Night".to_string(),
            date_time: DateTime::parse_from_rfc3339("2025-01-03T19:00:00Z")
                .map(|d| d.with_timezone(&Utc))
                .unwrap_or_default(),
            location: "Gym".to_string(),
            notes: None,
        };
        let json = serde_json::to_value(&event).unwrap_or_default();
        assert_eq!(json["type"], "Youth_Night");
        assert_eq!(json["dateTime"], "2025-01-03T19:00:00Z");
    }

    proptest! {
        #[test]
        fn next_manual_id_exceeds_every_existing_id(ids in proptest::collection::vec(1_i64..10_000, 0..50)) {
            let next = next_manual_id(ids.iter().copied().max());
            prop_assert!(ids.iter().all(|id| *id < next));
            prop_assert!(next >= 1);
        }
    }
}
