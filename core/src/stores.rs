//! Gateway contracts for the three backing stores.
//!
//! Every method returns a boxed future so the traits stay dyn-compatible and
//! can be shared as `Arc<dyn …>` between the aggregator and HTTP handlers.
//!
//! # Implementations
//!
//! - `PostgresStore` (in `youthgroup-postgres`): [`RelationalStore`]
//! - `MongoDocumentStore` (in `youthgroup-mongo`): [`DocumentStore`]
//! - `RedisCheckInStore` (in `youthgroup-redis`): [`CheckInStore`]
//! - In-memory versions of all three (in `youthgroup-testing`)

use crate::checkin::CheckInState;
use crate::documents::{Collection, Document, DocumentFilter, Fields};
use crate::error::Result;
use crate::model::{
    AttendanceRecord, Event, EventUpdate, NewEvent, NewPerson, NewRegistration, NewRoleRecord,
    Person, PersonUpdate, Registration, RoleKind, RoleRecord, SchemaCapabilities, SmallGroup,
    SmallGroupLeader, SmallGroupMember,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;

/// Future returned by every gateway method.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Rows removed alongside an event.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventCascade {
    /// Registrations deleted.
    pub registrations: u64,
    /// Attendance records deleted.
    pub attendance_records: u64,
}

/// People and their role records.
///
/// Write operations verify their target exists first and fail with
/// `NotFound` otherwise; nothing is committed unless every statement of the
/// operation succeeds.
pub trait PeopleRepository: Send + Sync {
    /// All people, ordered by last then first name.
    ///
    /// # Errors
    ///
    /// Returns a store error if the query fails.
    fn list_people(&self) -> StoreFuture<'_, Vec<Person>>;

    /// One person, if present.
    ///
    /// # Errors
    ///
    /// Returns a store error if the query fails.
    fn get_person(&self, id: i64) -> StoreFuture<'_, Option<Person>>;

    /// The people among `ids` that exist, in no particular order.
    ///
    /// # Errors
    ///
    /// Returns a store error if the query fails.
    fn find_people(&self, ids: Vec<i64>) -> StoreFuture<'_, Vec<Person>>;

    /// Inserts a person with a database-generated id.
    ///
    /// # Errors
    ///
    /// Returns a store error if the insert fails.
    fn create_person(&self, person: NewPerson) -> StoreFuture<'_, Person>;

    /// Applies a partial update.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the person does not exist
    /// - store error if the update fails
    fn update_person(&self, id: i64, update: PersonUpdate) -> StoreFuture<'_, Person>;

    /// Deletes a person who holds no role records.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the person does not exist
    /// - `Validation` if the person still holds a role record
    /// - store error if the delete fails
    fn delete_person(&self, id: i64) -> StoreFuture<'_, ()>;

    /// All records of one role kind, joined with names.
    ///
    /// # Errors
    ///
    /// Returns a store error if the query fails.
    fn list_roles(&self, kind: RoleKind) -> StoreFuture<'_, Vec<RoleRecord>>;

    /// One role record, if present.
    ///
    /// # Errors
    ///
    /// Returns a store error if the query fails.
    fn get_role(&self, kind: RoleKind, id: i64) -> StoreFuture<'_, Option<RoleRecord>>;

    /// Inserts a role record with a manually allocated id.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the person does not exist
    /// - `Validation` if the person already holds this role
    /// - store error if the insert fails
    fn create_role(&self, kind: RoleKind, role: NewRoleRecord) -> StoreFuture<'_, RoleRecord>;

    /// Deletes a role record.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the record does not exist
    /// - store error if the delete fails
    fn delete_role(&self, kind: RoleKind, id: i64) -> StoreFuture<'_, ()>;
}

/// Events, registrations and attendance history.
pub trait EventRepository: Send + Sync {
    /// All events, newest first.
    ///
    /// # Errors
    ///
    /// Returns a store error if the query fails.
    fn list_events(&self) -> StoreFuture<'_, Vec<Event>>;

    /// One event, if present.
    ///
    /// # Errors
    ///
    /// Returns a store error if the query fails.
    fn get_event(&self, id: i64) -> StoreFuture<'_, Option<Event>>;

    /// Inserts an event with a database-generated id.
    ///
    /// # Errors
    ///
    /// Returns a store error if the insert fails.
    fn create_event(&self, event: NewEvent) -> StoreFuture<'_, Event>;

    /// Applies a partial update.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the event does not exist
    /// - store error if the update fails
    fn update_event(&self, id: i64, update: EventUpdate) -> StoreFuture<'_, Event>;

    /// Deletes an event with its registrations and attendance records.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the event does not exist
    /// - store error if any delete fails (nothing is committed)
    fn delete_event(&self, id: i64) -> StoreFuture<'_, EventCascade>;

    /// Registrations for an event, joined with the registrant's name.
    ///
    /// # Errors
    ///
    /// Returns a store error if the query fails.
    fn list_registrations(&self, event_id: i64) -> StoreFuture<'_, Vec<Registration>>;

    /// Registers a role for an event with a manually allocated id.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the event or the referenced role does not exist
    /// - `Validation` for a volunteer registration when the schema lacks
    ///   the volunteer column
    /// - store error if the insert fails
    fn create_registration(
        &self,
        event_id: i64,
        registration: NewRegistration,
    ) -> StoreFuture<'_, Registration>;

    /// Deletes a registration.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the registration does not exist
    /// - store error if the delete fails
    fn delete_registration(&self, id: i64) -> StoreFuture<'_, ()>;

    /// Appends an attendance record.
    ///
    /// # Errors
    ///
    /// Returns a store error if the insert fails.
    fn record_attendance(
        &self,
        event_id: i64,
        person_id: i64,
        at: DateTime<Utc>,
    ) -> StoreFuture<'_, AttendanceRecord>;

    /// Attendance history for an event, oldest first.
    ///
    /// # Errors
    ///
    /// Returns a store error if the query fails.
    fn list_attendance(&self, event_id: i64) -> StoreFuture<'_, Vec<AttendanceRecord>>;
}

/// Small groups and their member/leader join tables.
pub trait SmallGroupRepository: Send + Sync {
    /// All groups ordered by name.
    ///
    /// # Errors
    ///
    /// Returns a store error if the query fails.
    fn list_groups(&self) -> StoreFuture<'_, Vec<SmallGroup>>;

    /// One group, if present.
    ///
    /// # Errors
    ///
    /// Returns a store error if the query fails.
    fn get_group(&self, id: i64) -> StoreFuture<'_, Option<SmallGroup>>;

    /// Inserts a group with id `max(id) + 1` (or 1).
    ///
    /// # Errors
    ///
    /// Returns a store error if the insert fails.
    fn create_group(&self, name: String) -> StoreFuture<'_, SmallGroup>;

    /// Deletes a group together with its memberships.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the group does not exist
    /// - store error if the delete fails
    fn delete_group(&self, id: i64) -> StoreFuture<'_, ()>;

    /// Members of a group ordered by name.
    ///
    /// # Errors
    ///
    /// Returns a store error if the query fails.
    fn list_members(&self, group_id: i64) -> StoreFuture<'_, Vec<SmallGroupMember>>;

    /// Adds an attendee to a group.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the group or attendee does not exist
    /// - `Validation` if the attendee is already a member
    /// - store error if the insert fails
    fn add_member(&self, group_id: i64, attendee_id: i64) -> StoreFuture<'_, SmallGroupMember>;

    /// Removes an attendee from a group.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the attendee is not a member
    /// - store error if the delete fails
    fn remove_member(&self, group_id: i64, attendee_id: i64) -> StoreFuture<'_, ()>;

    /// Leaders of a group ordered by name.
    ///
    /// # Errors
    ///
    /// Returns a store error if the query fails.
    fn list_group_leaders(&self, group_id: i64) -> StoreFuture<'_, Vec<SmallGroupLeader>>;

    /// Assigns a leader to a group.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the group or leader does not exist
    /// - `Validation` if the leader is already assigned
    /// - store error if the insert fails
    fn add_group_leader(&self, group_id: i64, leader_id: i64) -> StoreFuture<'_, SmallGroupLeader>;

    /// Removes a leader from a group.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the leader is not assigned
    /// - store error if the delete fails
    fn remove_group_leader(&self, group_id: i64, leader_id: i64) -> StoreFuture<'_, ()>;
}

/// The complete relational gateway.
pub trait RelationalStore: PeopleRepository + EventRepository + SmallGroupRepository {
    /// Optional columns detected at startup.
    fn capabilities(&self) -> SchemaCapabilities;

    /// Round trip used by readiness checks.
    ///
    /// # Errors
    ///
    /// Returns a store error if the store is unreachable.
    fn ping(&self) -> StoreFuture<'_, ()>;
}

/// Schema-free document collections.
pub trait DocumentStore: Send + Sync {
    /// Documents in `collection` matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns a store error if the query fails.
    fn find(&self, collection: Collection, filter: DocumentFilter) -> StoreFuture<'_, Vec<Document>>;

    /// Inserts a document, stamping `created`, and returns its opaque id.
    ///
    /// # Errors
    ///
    /// Returns a store error if the insert fails.
    fn insert(&self, collection: Collection, fields: Fields) -> StoreFuture<'_, String>;

    /// Merges `fields` into a document and stamps `updated`.
    ///
    /// # Errors
    ///
    /// - `NotFound` if no document has this id
    /// - store error if the update fails
    fn update(&self, collection: Collection, id: &str, fields: Fields) -> StoreFuture<'_, Document>;

    /// Deletes a document.
    ///
    /// # Errors
    ///
    /// - `NotFound` if nothing was removed
    /// - store error if the delete fails
    fn delete(&self, collection: Collection, id: &str) -> StoreFuture<'_, ()>;

    /// Deletes every document matching `filter`, returning how many.
    ///
    /// # Errors
    ///
    /// Returns a store error if the delete fails.
    fn delete_matching(&self, collection: Collection, filter: DocumentFilter) -> StoreFuture<'_, u64>;

    /// Round trip used by readiness checks.
    ///
    /// # Errors
    ///
    /// Returns a store error if the store is unreachable.
    fn ping(&self) -> StoreFuture<'_, ()>;
}

/// Live check-in set and time map per event.
pub trait CheckInStore: Send + Sync {
    /// Adds the person to the checked-in set and records `at`.
    ///
    /// Re-checking in keeps set membership and overwrites the time.
    ///
    /// # Errors
    ///
    /// Returns a store error if the write fails.
    fn check_in(&self, event_id: i64, person_id: i64, at: DateTime<Utc>) -> StoreFuture<'_, ()>;

    /// Removes the person from both structures.
    ///
    /// Returns whether the person was checked in.
    ///
    /// # Errors
    ///
    /// Returns a store error if the write fails.
    fn check_out(&self, event_id: i64, person_id: i64) -> StoreFuture<'_, bool>;

    /// Current checked-in set and time map; empty when no one checked in.
    ///
    /// # Errors
    ///
    /// Returns a store error if the read fails.
    fn list_checked_in(&self, event_id: i64) -> StoreFuture<'_, CheckInState>;

    /// Removes all check-in state for an event.
    ///
    /// # Errors
    ///
    /// Returns a store error if the delete fails.
    fn purge(&self, event_id: i64) -> StoreFuture<'_, ()>;

    /// Round trip used by readiness checks.
    ///
    /// # Errors
    ///
    /// Returns a store error if the store is unreachable.
    fn ping(&self) -> StoreFuture<'_, ()>;
}
