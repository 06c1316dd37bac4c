//! Aggregator behavior over the in-memory gateways.

#![allow(clippy::unwrap_used)] // Tests can unwrap
#![allow(clippy::expect_used)] // Tests can expect

use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use serde_json::json;
use youthgroup_core::YouthGroupError;
use youthgroup_core::environment::Clock;
use youthgroup_core::documents::{Collection, DocumentFilter, prepare_insert};
use youthgroup_core::model::{
    EventUpdate, NewEvent, NewPerson, NewRegistration, NewRoleRecord, PersonUpdate,
    RegistrationRole, RoleKind,
};
use youthgroup_core::stores::{CheckInStore, DocumentStore, EventRepository, PeopleRepository};
use youthgroup_testing::TestStores;
use youthgroup_testing::helpers::init_tracing;

struct Seeded {
    event_id: i64,
    people: Vec<i64>,
}

async fn person(stores: &TestStores, first: &str, last: &str) -> i64 {
    stores
        .relational
        .create_person(NewPerson {
            first_name: first.to_string(),
            last_name: last.to_string(),
            age: None,
        })
        .await
        .unwrap()
        .id
}

async fn event(stores: &TestStores) -> i64 {
    stores
        .relational
        .create_event(NewEvent {
            name: "Winter Retreat".to_string(),
            event_type: "retreat".to_string(),
            date_time: Utc.with_ymd_and_hms(2025, 1, 17, 18, 0, 0).unwrap(),
            location: "Camp Cedar".to_string(),
            notes: None,
        })
        .await
        .unwrap()
        .id
}

/// An event with `attendees`, `leaders` and `volunteers` registrations.
async fn seed(stores: &TestStores, attendees: usize, leaders: usize, volunteers: usize) -> Seeded {
    let event_id = event(stores).await;
    let mut people = Vec::new();

    let plan = [
        (RoleKind::Attendee, attendees),
        (RoleKind::Leader, leaders),
        (RoleKind::Volunteer, volunteers),
    ];
    for (kind, count) in plan {
        for n in 0..count {
            let person_id = person(stores, &format!("{kind}{n}"), &format!("Last{n:02}")).await;
            let guardian = (kind == RoleKind::Attendee).then(|| "Guardian".to_string());
            let role_id = stores
                .relational
                .create_role(kind, NewRoleRecord { person_id, guardian })
                .await
                .unwrap()
                .id;
            let role = match kind {
                RoleKind::Attendee => RegistrationRole::Attendee(role_id),
                RoleKind::Leader => RegistrationRole::Leader(role_id),
                RoleKind::Volunteer => RegistrationRole::Volunteer(role_id),
            };
            stores
                .relational
                .create_registration(
                    event_id,
                    NewRegistration {
                        role,
                        emergency_contact: "555-0100".to_string(),
                    },
                )
                .await
                .unwrap();
            people.push(person_id);
        }
    }

    Seeded { event_id, people }
}

async fn add_event_note(stores: &TestStores, event_id: i64, text: &str) {
    let fields = prepare_insert(
        Collection::EventNotes,
        Some(event_id),
        json!({ "text": text, "kind": "win" })
            .as_object()
            .cloned()
            .unwrap(),
    )
    .unwrap();
    stores
        .documents
        .insert(Collection::EventNotes, fields)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_summary_counts_registrations_check_ins_and_notes() {
    init_tracing();
    let stores = TestStores::new();
    let seeded = seed(&stores, 7, 2, 1).await;
    let aggregator = stores.aggregator();

    for person_id in &seeded.people[..4] {
        aggregator.check_in(seeded.event_id, *person_id).await.unwrap();
    }
    add_event_note(&stores, seeded.event_id, "Great worship night").await;
    add_event_note(&stores, seeded.event_id, "Two new students").await;

    let summary = aggregator.comprehensive_summary(seeded.event_id).await.unwrap();

    assert_eq!(summary.registrations.total, 10);
    assert_eq!(summary.registrations.attendees, 7);
    assert_eq!(summary.registrations.leaders, 2);
    assert_eq!(summary.registrations.volunteers, 1);
    assert_eq!(summary.live_check_ins.count, 4);
    assert_eq!(summary.live_check_ins.source, "Redis");
    assert_eq!(summary.notes.count, 2);
    assert_eq!(summary.notes.source, "MongoDB");
    assert!((summary.summary.attendance_rate - 40.0).abs() < f64::EPSILON);
    assert_eq!(summary.summary.total_registered, 10);
    assert_eq!(summary.summary.total_checked_in, 4);
    assert_eq!(summary.summary.notes_count, 2);
}

#[tokio::test]
async fn test_summary_with_no_registrations_has_zero_rate() {
    let stores = TestStores::new();
    let event_id = event(&stores).await;

    let summary = stores
        .aggregator()
        .comprehensive_summary(event_id)
        .await
        .unwrap();

    assert_eq!(summary.registrations.total, 0);
    assert!(summary.summary.attendance_rate.abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_summary_survives_document_store_failure() {
    let stores = TestStores::new();
    let seeded = seed(&stores, 3, 0, 0).await;
    add_event_note(&stores, seeded.event_id, "Lost in the outage").await;
    stores.documents.set_failing(true);

    let summary = stores
        .aggregator()
        .comprehensive_summary(seeded.event_id)
        .await
        .unwrap();

    assert_eq!(summary.notes.count, 0);
    assert_eq!(summary.summary.notes_count, 0);
    assert_eq!(summary.registrations.total, 3);
}

#[tokio::test]
async fn test_summary_survives_ephemeral_store_failure() {
    let stores = TestStores::new();
    let seeded = seed(&stores, 2, 0, 0).await;
    let aggregator = stores.aggregator();
    aggregator
        .check_in(seeded.event_id, seeded.people[0])
        .await
        .unwrap();
    stores.checkins.set_failing(true);

    let summary = aggregator.comprehensive_summary(seeded.event_id).await.unwrap();

    assert_eq!(summary.live_check_ins.count, 0);
    assert!(summary.summary.attendance_rate.abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_summary_for_missing_event_contacts_no_other_store() {
    let stores = TestStores::new();

    let result = stores.aggregator().comprehensive_summary(42).await;

    assert!(matches!(
        result,
        Err(YouthGroupError::NotFound { resource: "Event", .. })
    ));
    assert_eq!(stores.documents.calls(), 0);
    assert_eq!(stores.checkins.calls(), 0);
}

#[tokio::test]
async fn test_summary_fails_when_relational_store_fails() {
    let stores = TestStores::new();
    let seeded = seed(&stores, 1, 0, 0).await;
    stores.relational.set_failing(true);

    let result = stores.aggregator().comprehensive_summary(seeded.event_id).await;

    assert!(matches!(result, Err(YouthGroupError::Store { .. })));
}

#[tokio::test]
async fn test_check_in_writes_history_and_live_state() {
    let stores = TestStores::new();
    let seeded = seed(&stores, 1, 0, 0).await;
    let person_id = seeded.people[0];

    let receipt = stores
        .aggregator()
        .check_in(seeded.event_id, person_id)
        .await
        .unwrap();

    assert_eq!(receipt.check_in_time, "2025-01-01T18:30:00.000Z");
    assert_eq!(
        receipt.message,
        format!("Person {person_id} checked in to event {}.", seeded.event_id)
    );
    let history = stores.relational.list_attendance(seeded.event_id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].checked_in_at, stores.clock.now());
    let live = stores.checkins.list_checked_in(seeded.event_id).await.unwrap();
    assert!(live.person_ids.contains(&person_id));
}

#[tokio::test]
async fn test_check_out_keeps_attendance_history() {
    let stores = TestStores::new();
    let seeded = seed(&stores, 1, 0, 0).await;
    let person_id = seeded.people[0];
    let aggregator = stores.aggregator();

    aggregator.check_in(seeded.event_id, person_id).await.unwrap();
    aggregator.check_out(seeded.event_id, person_id).await.unwrap();

    let live = aggregator.live_check_ins(seeded.event_id).await.unwrap();
    assert_eq!(live.count, 0);
    assert_eq!(live.message, "No students are currently checked in.");
    assert_eq!(stores.relational.attendance_count(), 1);
}

#[tokio::test]
async fn test_check_out_without_check_in_is_not_found() {
    let stores = TestStores::new();
    let seeded = seed(&stores, 1, 0, 0).await;

    let result = stores
        .aggregator()
        .check_out(seeded.event_id, seeded.people[0])
        .await;

    assert!(result.is_err_and(|e| e.is_not_found()));
}

#[tokio::test]
async fn test_check_in_unknown_person_writes_nothing() {
    let stores = TestStores::new();
    let event_id = event(&stores).await;

    let result = stores.aggregator().check_in(event_id, 999).await;

    assert!(matches!(
        result,
        Err(YouthGroupError::NotFound { resource: "Person", .. })
    ));
    assert_eq!(stores.relational.attendance_count(), 0);
    assert_eq!(stores.checkins.calls(), 0);
}

#[tokio::test]
async fn test_check_in_fails_when_ephemeral_store_fails() {
    let stores = TestStores::new();
    let seeded = seed(&stores, 1, 0, 0).await;
    stores.checkins.set_failing(true);

    let result = stores
        .aggregator()
        .check_in(seeded.event_id, seeded.people[0])
        .await;

    assert!(matches!(result, Err(YouthGroupError::Store { .. })));
    // The durable record is written before the live state.
    assert_eq!(stores.relational.attendance_count(), 1);
}

#[tokio::test]
async fn test_live_check_ins_are_sorted_by_name_with_times() {
    let stores = TestStores::new();
    let event_id = event(&stores).await;
    let zed = person(&stores, "Zed", "Young").await;
    let amy = person(&stores, "Amy", "Adams").await;
    let bob = person(&stores, "Bob", "Adams").await;
    let aggregator = stores.aggregator();
    for id in [zed, amy, bob] {
        aggregator.check_in(event_id, id).await.unwrap();
    }

    let live = aggregator.live_check_ins(event_id).await.unwrap();

    let order: Vec<i64> = live.students.iter().map(|s| s.student_id).collect();
    assert_eq!(order, vec![amy, bob, zed]);
    assert_eq!(live.count, 3);
    assert_eq!(live.message, "3 students are currently checked in.");
    assert!(live.students.iter().all(|s| s.check_in_time.is_some()));
}

#[tokio::test]
async fn test_live_check_ins_degrade_to_empty() {
    let stores = TestStores::new();
    let seeded = seed(&stores, 1, 0, 0).await;
    let aggregator = stores.aggregator();
    aggregator
        .check_in(seeded.event_id, seeded.people[0])
        .await
        .unwrap();
    stores.checkins.set_failing(true);

    let live = aggregator.live_check_ins(seeded.event_id).await.unwrap();

    assert_eq!(live.count, 0);
    assert!(live.students.is_empty());
}

#[tokio::test]
async fn test_delete_event_cleans_up_every_store() {
    let stores = TestStores::new();
    let seeded = seed(&stores, 2, 1, 0).await;
    let aggregator = stores.aggregator();
    aggregator
        .check_in(seeded.event_id, seeded.people[0])
        .await
        .unwrap();
    add_event_note(&stores, seeded.event_id, "Bring sleeping bags").await;
    let other_event = event(&stores).await;
    add_event_note(&stores, other_event, "Unrelated").await;

    let deletion = aggregator.delete_event(seeded.event_id).await.unwrap();

    assert_eq!(deletion.registrations_removed, 3);
    assert_eq!(deletion.attendance_records_removed, 1);
    assert_eq!(deletion.notes_removed, Some(1));
    assert!(deletion.check_ins_purged);
    assert!(stores.relational.get_event(seeded.event_id).await.unwrap().is_none());
    let remaining = stores
        .documents
        .find(Collection::EventNotes, DocumentFilter::All)
        .await
        .unwrap();
    assert_eq!(remaining.len(), 1);
    let live = stores.checkins.list_checked_in(seeded.event_id).await.unwrap();
    assert!(live.is_empty());
}

#[tokio::test]
async fn test_delete_event_reports_degraded_cleanup() {
    let stores = TestStores::new();
    let seeded = seed(&stores, 1, 0, 0).await;
    stores.documents.set_failing(true);

    let deletion = stores
        .aggregator()
        .delete_event(seeded.event_id)
        .await
        .unwrap();

    assert_eq!(deletion.notes_removed, None);
    assert!(deletion.check_ins_purged);
}

#[tokio::test]
async fn test_delete_missing_event_touches_only_relational_store() {
    let stores = TestStores::new();

    let result = stores.aggregator().delete_event(7).await;

    assert!(result.is_err_and(|e| e.is_not_found()));
    assert_eq!(stores.documents.calls(), 0);
    assert_eq!(stores.checkins.calls(), 0);
}

#[tokio::test]
async fn test_person_with_role_cannot_be_deleted() {
    let stores = TestStores::new();
    let seeded = seed(&stores, 1, 0, 0).await;

    let result = stores.relational.delete_person(seeded.people[0]).await;

    assert!(matches!(result, Err(YouthGroupError::Validation(_))));
}

#[tokio::test]
async fn test_person_with_attendance_history_cannot_be_deleted() {
    let stores = TestStores::new();
    let event_id = event(&stores).await;
    let person_id = person(&stores, "Sam", "Okafor").await;
    let aggregator = stores.aggregator();

    aggregator.check_in(event_id, person_id).await.unwrap();
    let result = stores.relational.delete_person(person_id).await;

    assert!(
        matches!(&result, Err(YouthGroupError::Validation(message)) if message.contains("attendance history"))
    );
    assert!(stores.relational.get_person(person_id).await.unwrap().is_some());
    assert_eq!(stores.relational.attendance_count(), 1);
    let live = aggregator.live_check_ins(event_id).await.unwrap();
    assert_eq!(live.count, 1);
}

#[tokio::test]
async fn test_person_without_roles_or_history_is_deleted() {
    let stores = TestStores::new();
    let person_id = person(&stores, "Ada", "Lindqvist").await;

    stores.relational.delete_person(person_id).await.unwrap();

    assert!(stores.relational.get_person(person_id).await.unwrap().is_none());
}

proptest! {
    #[test]
    fn breakdown_total_is_sum_of_roles(attendees in 0usize..6, leaders in 0usize..4, volunteers in 0usize..3) {
        let summary = tokio_test::block_on(async {
            let stores = TestStores::new();
            let seeded = seed(&stores, attendees, leaders, volunteers).await;
            stores.aggregator().comprehensive_summary(seeded.event_id).await
        })
        .unwrap();

        let b = summary.registrations;
        prop_assert_eq!(b.total, attendees + leaders + volunteers);
        prop_assert_eq!(b.total, b.attendees + b.leaders + b.volunteers);
        prop_assert!(summary.summary.attendance_rate.abs() < f64::EPSILON);
    }
}

#[tokio::test]
async fn test_summary_counts_live_ids_the_listing_cannot_name() {
    let stores = TestStores::new();
    let event_id = event(&stores).await;
    let person_id = person(&stores, "Lena", "Marsh").await;
    let aggregator = stores.aggregator();
    aggregator.check_in(event_id, person_id).await.unwrap();
    stores
        .checkins
        .check_in(event_id, 9_999, stores.clock.now())
        .await
        .unwrap();

    let summary = aggregator.comprehensive_summary(event_id).await.unwrap();
    let live = aggregator.live_check_ins(event_id).await.unwrap();

    assert_eq!(summary.live_check_ins.count, 2);
    assert_eq!(live.count, 1);
    assert_eq!(live.students.len(), 1);
}

#[tokio::test]
async fn test_null_update_fields_keep_stored_values() {
    let stores = TestStores::new();
    let person_id = stores
        .relational
        .create_person(NewPerson {
            first_name: "Noor".to_string(),
            last_name: "Haddad".to_string(),
            age: Some(15),
        })
        .await
        .unwrap()
        .id;
    let event_id = stores
        .relational
        .create_event(NewEvent {
            name: "Game Night".to_string(),
            event_type: "social".to_string(),
            date_time: Utc.with_ymd_and_hms(2025, 2, 7, 19, 0, 0).unwrap(),
            location: "Youth Room".to_string(),
            notes: Some("Bring snacks".to_string()),
        })
        .await
        .unwrap()
        .id;

    let person_update: PersonUpdate = serde_json::from_value(json!({ "age": null })).unwrap();
    let event_update: EventUpdate = serde_json::from_value(json!({ "notes": null })).unwrap();
    let person = stores
        .relational
        .update_person(person_id, person_update)
        .await
        .unwrap();
    let event = stores
        .relational
        .update_event(event_id, event_update)
        .await
        .unwrap();

    assert_eq!(person.age, Some(15));
    assert_eq!(event.notes.as_deref(), Some("Bring snacks"));
}
