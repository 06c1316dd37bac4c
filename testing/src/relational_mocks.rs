//! In-memory relational store.
//!
//! [`InMemoryRelationalStore`] mirrors the rules the `PostgreSQL` gateway
//! enforces: `max(id) + 1` ids for the manually keyed tables, not-found on
//! missing parents, validation errors on duplicates and on deleting a person
//! who still holds a role, and the volunteer-column capability switch.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Lock poisoning only follows a panicking test

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use youthgroup_core::model::{
    AttendanceRecord, Event, EventUpdate, NewEvent, NewPerson, NewRegistration, NewRoleRecord,
    Person, PersonUpdate, Registration, RegistrationRole, RoleKind, RoleRecord,
    SchemaCapabilities, SmallGroup, SmallGroupLeader, SmallGroupMember, next_manual_id,
};
use youthgroup_core::stores::{
    EventCascade, EventRepository, PeopleRepository, RelationalStore, SmallGroupRepository,
    StoreFuture,
};
use youthgroup_core::{Result, YouthGroupError};

#[derive(Clone, Debug)]
struct RoleEntry {
    person_id: i64,
    guardian: Option<String>,
}

#[derive(Clone, Debug)]
struct RegistrationEntry {
    event_id: i64,
    role: RegistrationRole,
    emergency_contact: String,
}

#[derive(Clone, Copy, Debug)]
struct Assignment {
    group_id: i64,
    role_id: i64,
}

#[derive(Debug, Default)]
struct Tables {
    people: BTreeMap<i64, Person>,
    roles: HashMap<RoleKind, BTreeMap<i64, RoleEntry>>,
    events: BTreeMap<i64, Event>,
    registrations: BTreeMap<i64, RegistrationEntry>,
    attendance: BTreeMap<i64, AttendanceRecord>,
    groups: BTreeMap<i64, String>,
    members: BTreeMap<i64, Assignment>,
    group_leaders: BTreeMap<i64, Assignment>,
}

fn next_id<V>(table: &BTreeMap<i64, V>) -> i64 {
    next_manual_id(table.keys().next_back().copied())
}

impl Tables {
    fn role_table(&self, kind: RoleKind) -> Option<&BTreeMap<i64, RoleEntry>> {
        self.roles.get(&kind)
    }

    fn role_person(&self, kind: RoleKind, id: i64) -> Option<&Person> {
        let entry = self.role_table(kind)?.get(&id)?;
        self.people.get(&entry.person_id)
    }

    fn names(&self, kind: RoleKind, id: i64) -> (Option<String>, Option<String>) {
        self.role_person(kind, id).map_or((None, None), |p| {
            (Some(p.first_name.clone()), Some(p.last_name.clone()))
        })
    }

    fn role_record(&self, kind: RoleKind, id: i64, entry: &RoleEntry) -> RoleRecord {
        let (first_name, last_name) = self.names(kind, id);
        RoleRecord {
            kind,
            id,
            person_id: entry.person_id,
            guardian: entry.guardian.clone(),
            first_name,
            last_name,
        }
    }

    fn registration(&self, id: i64, entry: &RegistrationEntry) -> Registration {
        let (attendee_id, leader_id, volunteer_id) = entry.role.keys();
        let person = self.role_person(entry.role.kind(), entry.role.role_id());
        Registration {
            id,
            event_id: entry.event_id,
            attendee_id,
            leader_id,
            volunteer_id,
            emergency_contact: entry.emergency_contact.clone(),
            person_id: person.map(|p| p.id),
            first_name: person.map(|p| p.first_name.clone()),
            last_name: person.map(|p| p.last_name.clone()),
        }
    }

    fn require_group(&self, group_id: i64) -> Result<()> {
        if self.groups.contains_key(&group_id) {
            Ok(())
        } else {
            Err(YouthGroupError::not_found("Small group", group_id))
        }
    }
}

/// In-memory implementation of every relational gateway trait.
///
/// Clones share the same tables.
///
/// # Example
///
/// ```
/// use youthgroup_testing::InMemoryRelationalStore;
/// use youthgroup_core::stores::SmallGroupRepository;
///
/// # async fn example() -> youthgroup_core::Result<()> {
/// let store = InMemoryRelationalStore::new();
/// let group = store.create_group("Juniors".to_string()).await?;
/// assert_eq!(group.id, 1);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, Default)]
pub struct InMemoryRelationalStore {
    tables: Arc<RwLock<Tables>>,
    capabilities: SchemaCapabilities,
    failing: Arc<AtomicBool>,
    calls: Arc<AtomicUsize>,
}

impl InMemoryRelationalStore {
    /// Create an empty store with every optional column present.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store that reports the given schema capabilities.
    #[must_use]
    pub fn with_capabilities(capabilities: SchemaCapabilities) -> Self {
        Self {
            capabilities,
            ..Self::default()
        }
    }

    /// Make every subsequent call fail with a relational store error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of gateway calls made so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Number of attendance records across all events.
    #[must_use]
    pub fn attendance_count(&self) -> usize {
        self.tables.read().unwrap().attendance.len()
    }

    fn guard(&self) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(YouthGroupError::relational("simulated relational outage"));
        }
        Ok(())
    }

    fn read<T, F>(&self, f: F) -> StoreFuture<'_, T>
    where
        T: Send + 'static,
        F: FnOnce(&Tables) -> Result<T>,
    {
        let result = self.guard().and_then(|()| f(&*self.tables.read().unwrap()));
        Box::pin(std::future::ready(result))
    }

    fn write<T, F>(&self, f: F) -> StoreFuture<'_, T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Tables) -> Result<T>,
    {
        let result = self
            .guard()
            .and_then(|()| f(&mut *self.tables.write().unwrap()));
        Box::pin(std::future::ready(result))
    }
}

impl PeopleRepository for InMemoryRelationalStore {
    fn list_people(&self) -> StoreFuture<'_, Vec<Person>> {
        self.read(|t| {
            let mut people: Vec<Person> = t.people.values().cloned().collect();
            people.sort_by(|a, b| {
                (&a.last_name, &a.first_name, a.id).cmp(&(&b.last_name, &b.first_name, b.id))
            });
            Ok(people)
        })
    }

    fn get_person(&self, id: i64) -> StoreFuture<'_, Option<Person>> {
        self.read(move |t| Ok(t.people.get(&id).cloned()))
    }

    fn find_people(&self, ids: Vec<i64>) -> StoreFuture<'_, Vec<Person>> {
        self.read(move |t| Ok(ids.iter().filter_map(|id| t.people.get(id).cloned()).collect()))
    }

    fn create_person(&self, person: NewPerson) -> StoreFuture<'_, Person> {
        self.write(move |t| {
            let created = Person {
                id: next_id(&t.people),
                first_name: person.first_name,
                last_name: person.last_name,
                age: person.age,
            };
            t.people.insert(created.id, created.clone());
            Ok(created)
        })
    }

    fn update_person(&self, id: i64, update: PersonUpdate) -> StoreFuture<'_, Person> {
        self.write(move |t| {
            let person = t
                .people
                .get_mut(&id)
                .ok_or_else(|| YouthGroupError::not_found("Person", id))?;
            if let Some(first_name) = update.first_name {
                person.first_name = first_name;
            }
            if let Some(last_name) = update.last_name {
                person.last_name = last_name;
            }
            if update.age.is_some() {
                person.age = update.age;
            }
            Ok(person.clone())
        })
    }

    fn delete_person(&self, id: i64) -> StoreFuture<'_, ()> {
        self.write(move |t| {
            if !t.people.contains_key(&id) {
                return Err(YouthGroupError::not_found("Person", id));
            }
            let holds_role = t
                .roles
                .values()
                .any(|table| table.values().any(|entry| entry.person_id == id));
            if holds_role {
                return Err(YouthGroupError::validation(format!(
                    "person {id} still holds role records"
                )));
            }
            if t.attendance.values().any(|a| a.person_id == id) {
                return Err(YouthGroupError::validation(format!(
                    "person {id} has attendance history"
                )));
            }
            t.people.remove(&id);
            Ok(())
        })
    }

    fn list_roles(&self, kind: RoleKind) -> StoreFuture<'_, Vec<RoleRecord>> {
        self.read(move |t| {
            let mut records: Vec<RoleRecord> = t
                .role_table(kind)
                .into_iter()
                .flatten()
                .map(|(id, entry)| t.role_record(kind, *id, entry))
                .collect();
            records.sort_by(|a, b| {
                (&a.last_name, &a.first_name, a.id).cmp(&(&b.last_name, &b.first_name, b.id))
            });
            Ok(records)
        })
    }

    fn get_role(&self, kind: RoleKind, id: i64) -> StoreFuture<'_, Option<RoleRecord>> {
        self.read(move |t| {
            Ok(t.role_table(kind)
                .and_then(|table| table.get(&id))
                .map(|entry| t.role_record(kind, id, entry)))
        })
    }

    fn create_role(&self, kind: RoleKind, role: NewRoleRecord) -> StoreFuture<'_, RoleRecord> {
        self.write(move |t| {
            if !t.people.contains_key(&role.person_id) {
                return Err(YouthGroupError::not_found("Person", role.person_id));
            }
            let table = t.roles.entry(kind).or_default();
            if table.values().any(|entry| entry.person_id == role.person_id) {
                return Err(YouthGroupError::validation(format!(
                    "person {} already holds the {kind} role",
                    role.person_id
                )));
            }
            let id = next_id(table);
            let entry = RoleEntry {
                person_id: role.person_id,
                guardian: role.guardian,
            };
            table.insert(id, entry.clone());
            Ok(t.role_record(kind, id, &entry))
        })
    }

    fn delete_role(&self, kind: RoleKind, id: i64) -> StoreFuture<'_, ()> {
        self.write(move |t| {
            t.roles
                .get_mut(&kind)
                .and_then(|table| table.remove(&id))
                .map(|_| ())
                .ok_or_else(|| YouthGroupError::not_found(kind.resource(), id))
        })
    }
}

impl EventRepository for InMemoryRelationalStore {
    fn list_events(&self) -> StoreFuture<'_, Vec<Event>> {
        self.read(|t| {
            let mut events: Vec<Event> = t.events.values().cloned().collect();
            events.sort_by(|a, b| (b.date_time, b.id).cmp(&(a.date_time, a.id)));
            Ok(events)
        })
    }

    fn get_event(&self, id: i64) -> StoreFuture<'_, Option<Event>> {
        self.read(move |t| Ok(t.events.get(&id).cloned()))
    }

    fn create_event(&self, event: NewEvent) -> StoreFuture<'_, Event> {
        self.write(move |t| {
            let created = Event {
                id: next_id(&t.events),
                name: event.name,
                event_type: event.event_type,
                date_time: event.date_time,
                location: event.location,
                notes: event.notes,
            };
            t.events.insert(created.id, created.clone());
            Ok(created)
        })
    }

    fn update_event(&self, id: i64, update: EventUpdate) -> StoreFuture<'_, Event> {
        self.write(move |t| {
            let event = t
                .events
                .get_mut(&id)
                .ok_or_else(|| YouthGroupError::not_found("Event", id))?;
            if let Some(name) = update.name {
                event.name = name;
            }
            if let Some(event_type) = update.event_type {
                event.event_type = event_type;
            }
            if let Some(date_time) = update.date_time {
                event.date_time = date_time;
            }
            if let Some(location) = update.location {
                event.location = location;
            }
            if update.notes.is_some() {
                event.notes = update.notes;
            }
            Ok(event.clone())
        })
    }

    fn delete_event(&self, id: i64) -> StoreFuture<'_, EventCascade> {
        self.write(move |t| {
            if t.events.remove(&id).is_none() {
                return Err(YouthGroupError::not_found("Event", id));
            }
            let before = t.registrations.len();
            t.registrations.retain(|_, r| r.event_id != id);
            let registrations = (before - t.registrations.len()) as u64;

            let before = t.attendance.len();
            t.attendance.retain(|_, a| a.event_id != id);
            let attendance_records = (before - t.attendance.len()) as u64;

            Ok(EventCascade {
                registrations,
                attendance_records,
            })
        })
    }

    fn list_registrations(&self, event_id: i64) -> StoreFuture<'_, Vec<Registration>> {
        let volunteers = self.capabilities.registration_volunteer;
        self.read(move |t| {
            Ok(t.registrations
                .iter()
                .filter(|(_, entry)| entry.event_id == event_id)
                .map(|(id, entry)| {
                    let mut registration = t.registration(*id, entry);
                    if !volunteers {
                        registration.volunteer_id = None;
                    }
                    registration
                })
                .collect())
        })
    }

    fn create_registration(
        &self,
        event_id: i64,
        registration: NewRegistration,
    ) -> StoreFuture<'_, Registration> {
        let volunteers = self.capabilities.registration_volunteer;
        self.write(move |t| {
            let role = registration.role;
            if matches!(role, RegistrationRole::Volunteer(_)) && !volunteers {
                return Err(YouthGroupError::validation(
                    "volunteer registrations are not supported by this database schema",
                ));
            }
            if !t.events.contains_key(&event_id) {
                return Err(YouthGroupError::not_found("Event", event_id));
            }
            if t.role_person(role.kind(), role.role_id()).is_none() {
                return Err(YouthGroupError::not_found(role.kind().resource(), role.role_id()));
            }
            let id = next_id(&t.registrations);
            let entry = RegistrationEntry {
                event_id,
                role,
                emergency_contact: registration.emergency_contact,
            };
            let created = t.registration(id, &entry);
            t.registrations.insert(id, entry);
            Ok(created)
        })
    }

    fn delete_registration(&self, id: i64) -> StoreFuture<'_, ()> {
        self.write(move |t| {
            t.registrations
                .remove(&id)
                .map(|_| ())
                .ok_or_else(|| YouthGroupError::not_found("Registration", id))
        })
    }

    fn record_attendance(
        &self,
        event_id: i64,
        person_id: i64,
        at: DateTime<Utc>,
    ) -> StoreFuture<'_, AttendanceRecord> {
        self.write(move |t| {
            if !t.events.contains_key(&event_id) || !t.people.contains_key(&person_id) {
                return Err(YouthGroupError::validation(
                    "Failed to record attendance: violates a reference between records",
                ));
            }
            let record = AttendanceRecord {
                id: next_id(&t.attendance),
                event_id,
                person_id,
                checked_in_at: at,
            };
            t.attendance.insert(record.id, record.clone());
            Ok(record)
        })
    }

    fn list_attendance(&self, event_id: i64) -> StoreFuture<'_, Vec<AttendanceRecord>> {
        self.read(move |t| {
            let mut records: Vec<AttendanceRecord> = t
                .attendance
                .values()
                .filter(|a| a.event_id == event_id)
                .cloned()
                .collect();
            records.sort_by_key(|a| (a.checked_in_at, a.id));
            Ok(records)
        })
    }
}

fn assignments(
    t: &Tables,
    table: &BTreeMap<i64, Assignment>,
    kind: RoleKind,
    group_id: i64,
) -> Vec<(i64, Assignment, Option<String>, Option<String>)> {
    let mut rows: Vec<_> = table
        .iter()
        .filter(|(_, a)| a.group_id == group_id)
        .map(|(id, a)| {
            let (first_name, last_name) = t.names(kind, a.role_id);
            (*id, *a, first_name, last_name)
        })
        .collect();
    rows.sort_by(|a, b| (&a.3, &a.2, a.0).cmp(&(&b.3, &b.2, b.0)));
    rows
}

fn assign(
    t: &mut Tables,
    kind: RoleKind,
    group_id: i64,
    role_id: i64,
) -> Result<(i64, Option<String>, Option<String>)> {
    t.require_group(group_id)?;
    if t.role_table(kind).is_none_or(|table| !table.contains_key(&role_id)) {
        return Err(YouthGroupError::not_found(kind.resource(), role_id));
    }
    let (first_name, last_name) = t.names(kind, role_id);
    let table = if kind == RoleKind::Attendee {
        &mut t.members
    } else {
        &mut t.group_leaders
    };
    if table
        .values()
        .any(|a| a.group_id == group_id && a.role_id == role_id)
    {
        return Err(YouthGroupError::validation(format!(
            "{kind} {role_id} is already in small group {group_id}"
        )));
    }
    let id = next_id(table);
    table.insert(id, Assignment { group_id, role_id });
    Ok((id, first_name, last_name))
}

fn unassign(
    table: &mut BTreeMap<i64, Assignment>,
    resource: &'static str,
    kind: RoleKind,
    group_id: i64,
    role_id: i64,
) -> Result<()> {
    let found = table
        .iter()
        .find(|(_, a)| a.group_id == group_id && a.role_id == role_id)
        .map(|(id, _)| *id);
    match found {
        Some(id) => {
            table.remove(&id);
            Ok(())
        }
        None => Err(YouthGroupError::not_found(
            resource,
            format!("{kind} {role_id} in group {group_id}"),
        )),
    }
}

impl SmallGroupRepository for InMemoryRelationalStore {
    fn list_groups(&self) -> StoreFuture<'_, Vec<SmallGroup>> {
        self.read(|t| {
            let mut groups: Vec<SmallGroup> = t
                .groups
                .iter()
                .map(|(id, name)| SmallGroup {
                    id: *id,
                    name: name.clone(),
                })
                .collect();
            groups.sort_by(|a, b| (&a.name, a.id).cmp(&(&b.name, b.id)));
            Ok(groups)
        })
    }

    fn get_group(&self, id: i64) -> StoreFuture<'_, Option<SmallGroup>> {
        self.read(move |t| {
            Ok(t.groups.get(&id).map(|name| SmallGroup {
                id,
                name: name.clone(),
            }))
        })
    }

    fn create_group(&self, name: String) -> StoreFuture<'_, SmallGroup> {
        self.write(move |t| {
            let id = next_id(&t.groups);
            t.groups.insert(id, name.clone());
            Ok(SmallGroup { id, name })
        })
    }

    fn delete_group(&self, id: i64) -> StoreFuture<'_, ()> {
        self.write(move |t| {
            if t.groups.remove(&id).is_none() {
                return Err(YouthGroupError::not_found("Small group", id));
            }
            t.members.retain(|_, a| a.group_id != id);
            t.group_leaders.retain(|_, a| a.group_id != id);
            Ok(())
        })
    }

    fn list_members(&self, group_id: i64) -> StoreFuture<'_, Vec<SmallGroupMember>> {
        self.read(move |t| {
            Ok(assignments(t, &t.members, RoleKind::Attendee, group_id)
                .into_iter()
                .map(|(id, a, first_name, last_name)| SmallGroupMember {
                    id,
                    small_group_id: a.group_id,
                    attendee_id: a.role_id,
                    first_name,
                    last_name,
                })
                .collect())
        })
    }

    fn add_member(&self, group_id: i64, attendee_id: i64) -> StoreFuture<'_, SmallGroupMember> {
        self.write(move |t| {
            let (id, first_name, last_name) = assign(t, RoleKind::Attendee, group_id, attendee_id)?;
            Ok(SmallGroupMember {
                id,
                small_group_id: group_id,
                attendee_id,
                first_name,
                last_name,
            })
        })
    }

    fn remove_member(&self, group_id: i64, attendee_id: i64) -> StoreFuture<'_, ()> {
        self.write(move |t| {
            unassign(
                &mut t.members,
                "Small group member",
                RoleKind::Attendee,
                group_id,
                attendee_id,
            )
        })
    }

    fn list_group_leaders(&self, group_id: i64) -> StoreFuture<'_, Vec<SmallGroupLeader>> {
        self.read(move |t| {
            Ok(assignments(t, &t.group_leaders, RoleKind::Leader, group_id)
                .into_iter()
                .map(|(id, a, first_name, last_name)| SmallGroupLeader {
                    id,
                    small_group_id: a.group_id,
                    leader_id: a.role_id,
                    first_name,
                    last_name,
                })
                .collect())
        })
    }

    fn add_group_leader(&self, group_id: i64, leader_id: i64) -> StoreFuture<'_, SmallGroupLeader> {
        self.write(move |t| {
            let (id, first_name, last_name) = assign(t, RoleKind::Leader, group_id, leader_id)?;
            Ok(SmallGroupLeader {
                id,
                small_group_id: group_id,
                leader_id,
                first_name,
                last_name,
            })
        })
    }

    fn remove_group_leader(&self, group_id: i64, leader_id: i64) -> StoreFuture<'_, ()> {
        self.write(move |t| {
            unassign(
                &mut t.group_leaders,
                "Small group leader",
                RoleKind::Leader,
                group_id,
                leader_id,
            )
        })
    }
}

impl RelationalStore for InMemoryRelationalStore {
    fn capabilities(&self) -> SchemaCapabilities {
        self.capabilities
    }

    fn ping(&self) -> StoreFuture<'_, ()> {
        Box::pin(std::future::ready(self.guard()))
    }
}
