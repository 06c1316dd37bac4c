//! HTTP API tests: the full router over the in-memory gateways.

#![allow(clippy::unwrap_used)] // Tests can unwrap
#![allow(clippy::expect_used)] // Tests can expect

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;
use youthgroup_core::documents::Collection;
use youthgroup_server::{AppState, build_router};
use youthgroup_testing::TestStores;
use youthgroup_testing::helpers::init_tracing;

fn app(stores: &TestStores) -> Router {
    init_tracing();
    let state = AppState::new(
        Arc::new(stores.relational.clone()),
        Arc::new(stores.documents.clone()),
        Arc::new(stores.checkins.clone()),
        Arc::new(stores.clock.clone()),
    );
    build_router(state, &[])
}

async fn send(router: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    (status, value)
}

async fn get(router: &Router, uri: &str) -> (StatusCode, Value) {
    send(router, Method::GET, uri, None).await
}

async fn delete(router: &Router, uri: &str) -> (StatusCode, Value) {
    send(router, Method::DELETE, uri, None).await
}

/// POSTs `body` and expects `201 Created`.
async fn create(router: &Router, uri: &str, body: Value) -> Value {
    let (status, value) = send(router, Method::POST, uri, Some(body)).await;
    assert_eq!(status, StatusCode::CREATED, "POST {uri} failed: {value}");
    value
}

async fn create_person(router: &Router, first: &str, last: &str) -> i64 {
    create(router, "/people", json!({ "firstName": first, "lastName": last }))
        .await["id"]
        .as_i64()
        .unwrap()
}

async fn create_event(router: &Router) -> i64 {
    create(
        router,
        "/events",
        json!({
            "name": "Friday Youth Night",
            "type": "Youth_Night",
            "dateTime": "2025-01-03T19:00:00Z",
            "location": "Fellowship Hall"
        }),
    )
    .await["id"]
    .as_i64()
    .unwrap()
}

/// Creates a person holding `kind` and registers them for `event_id`.
async fn register(router: &Router, event_id: i64, kind: &str, n: usize) -> i64 {
    let person_id = create_person(router, &format!("{kind}{n}"), &format!("Last{n:02}")).await;
    let role = create(
        router,
        &format!("/{kind}s"),
        json!({ "personId": person_id, "guardian": "Pat Guardian" }),
    )
    .await;
    let key = format!("{kind}Id");
    create(
        router,
        &format!("/events/{event_id}/registrations"),
        json!({ key: role["id"], "emergencyContact": "555-0100" }),
    )
    .await;
    person_id
}

#[tokio::test]
async fn test_health_and_welcome() {
    let stores = TestStores::new();
    let router = app(&stores);

    let (status, body) = get(&router, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = get(&router, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["message"].as_str().unwrap().contains("Youth Group"));
}

#[tokio::test]
async fn test_ready_reports_each_store() {
    let stores = TestStores::new();
    let router = app(&stores);

    let (status, body) = get(&router, "/ready").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
    assert_eq!(body["components"].as_array().unwrap().len(), 3);

    stores.documents.set_failing(true);
    let (status, body) = get(&router, "/ready").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "not_ready");
    let mongo = &body["components"][1];
    assert_eq!(mongo["name"], "mongodb");
    assert_eq!(mongo["healthy"], false);
}

#[tokio::test]
async fn test_metrics_disabled_without_recorder() {
    let stores = TestStores::new();
    let router = app(&stores);

    let (status, _) = get(&router, "/metrics").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_correlation_id_echoed() {
    let stores = TestStores::new();
    let router = app(&stores);

    let request = Request::builder()
        .uri("/health")
        .header("X-Correlation-ID", "desk-3")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.headers()["X-Correlation-ID"], "desk-3");
}

#[tokio::test]
async fn test_person_lifecycle() {
    let stores = TestStores::new();
    let router = app(&stores);

    let id = create_person(&router, "Ada", "Lovelace").await;

    let (status, body) = get(&router, &format!("/people/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["firstName"], "Ada");

    let (status, body) = send(
        &router,
        Method::PUT,
        &format!("/people/{id}"),
        Some(json!({ "age": 16 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["age"], 16);
    assert_eq!(body["lastName"], "Lovelace");

    let (status, _) = delete(&router, &format!("/people/{id}")).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = get(&router, &format!("/people/{id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
    assert_eq!(body["message"], format!("Person with id {id} not found"));
}

#[tokio::test]
async fn test_missing_field_is_validation_error() {
    let stores = TestStores::new();
    let router = app(&stores);

    let (status, body) = send(
        &router,
        Method::POST,
        "/people",
        Some(json!({ "firstName": "Ada" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert_eq!(body["message"], "lastName is required");
    assert_eq!(stores.relational.calls(), 0);
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let stores = TestStores::new();
    let router = app(&stores);

    let request = Request::builder()
        .method(Method::POST)
        .uri("/people")
        .header("content-type", "application/json")
        .body(Body::from("{\"firstName\": "))
        .unwrap();
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_attendee_requires_guardian() {
    let stores = TestStores::new();
    let router = app(&stores);
    let person_id = create_person(&router, "Sam", "Student").await;

    let (status, body) = send(
        &router,
        Method::POST,
        "/attendees",
        Some(json!({ "personId": person_id })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "guardian is required");

    let attendee = create(
        &router,
        "/attendees",
        json!({ "personId": person_id, "guardian": "Pat Student" }),
    )
    .await;
    assert_eq!(attendee["kind"], "attendee");
    assert_eq!(attendee["firstName"], "Sam");

    let (status, body) = get(&router, "/attendees").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_role_for_unknown_person_is_not_found() {
    let stores = TestStores::new();
    let router = app(&stores);

    let (status, _) = send(&router, Method::POST, "/leaders", Some(json!({ "personId": 99 }))).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_person_with_role_cannot_be_deleted() {
    let stores = TestStores::new();
    let router = app(&stores);
    let person_id = create_person(&router, "Lee", "Leader").await;
    let leader = create(&router, "/leaders", json!({ "personId": person_id })).await;

    let (status, body) = delete(&router, &format!("/people/{person_id}")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, _) = delete(&router, &format!("/leaders/{}", leader["id"])).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = delete(&router, &format!("/people/{person_id}")).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_registration_requires_exactly_one_role() {
    let stores = TestStores::new();
    let router = app(&stores);
    let event_id = create_event(&router).await;
    let uri = format!("/events/{event_id}/registrations");

    let (status, body) = send(
        &router,
        Method::POST,
        &uri,
        Some(json!({ "attendeeId": 1, "leaderId": 1, "emergencyContact": "555-0100" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, _) = send(&router, Method::POST, &uri, Some(json!({ "attendeeId": 1 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = get(&router, &uri).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_comprehensive_summary_scenario() {
    let stores = TestStores::new();
    let router = app(&stores);
    let event_id = create_event(&router).await;

    let mut people = Vec::new();
    for (kind, count) in [("attendee", 7), ("leader", 2), ("volunteer", 1)] {
        for n in 0..count {
            people.push(register(&router, event_id, kind, n).await);
        }
    }
    for person_id in &people[..4] {
        create(&router, &format!("/event/{event_id}/checkin/{person_id}"), json!({})).await;
    }
    create(
        &router,
        &format!("/events/{event_id}/notes"),
        json!({ "text": "Great night", "kind": "win" }),
    )
    .await;

    let (status, body) = get(&router, &format!("/events/{event_id}/comprehensive")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["event"]["id"], event_id);
    assert_eq!(
        body["registrations"],
        json!({ "total": 10, "attendees": 7, "leaders": 2, "volunteers": 1 })
    );
    assert_eq!(body["liveCheckIns"], json!({ "count": 4, "source": "Redis" }));
    assert_eq!(body["notes"], json!({ "count": 1, "source": "MongoDB" }));
    assert_eq!(body["summary"]["attendanceRate"], 40.0);
    assert_eq!(body["summary"]["totalRegistered"], 10);
    assert_eq!(body["dataSources"]["eventInfo"], "PostgreSQL");
    assert_eq!(body["dataSources"]["liveCheckIns"], "Redis");
}

#[tokio::test]
async fn test_comprehensive_summary_survives_document_failure() {
    let stores = TestStores::new();
    let router = app(&stores);
    let event_id = create_event(&router).await;
    register(&router, event_id, "attendee", 0).await;

    stores.documents.set_failing(true);
    stores.checkins.set_failing(true);
    let (status, body) = get(&router, &format!("/events/{event_id}/comprehensive")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["notes"]["count"], 0);
    assert_eq!(body["liveCheckIns"]["count"], 0);
    assert_eq!(body["summary"]["attendanceRate"], 0.0);
    assert_eq!(body["registrations"]["total"], 1);
}

#[tokio::test]
async fn test_comprehensive_summary_for_missing_event() {
    let stores = TestStores::new();
    let router = app(&stores);

    let (status, body) = get(&router, "/events/404/comprehensive").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Event with id 404 not found");
    assert_eq!(stores.documents.calls(), 0);
    assert_eq!(stores.checkins.calls(), 0);
}

#[tokio::test]
async fn test_relational_failure_is_server_error() {
    let stores = TestStores::new();
    let router = app(&stores);
    stores.relational.set_failing(true);

    let (status, body) = get(&router, "/events").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], "STORE_ERROR");
    assert_eq!(body["message"], "PostgreSQL is unavailable");
}

#[tokio::test]
async fn test_check_in_and_out() {
    let stores = TestStores::new();
    let router = app(&stores);
    let event_id = create_event(&router).await;
    let person_id = create_person(&router, "Jo", "Student").await;
    let checkin = format!("/event/{event_id}/checkin/{person_id}");

    let receipt = create(&router, &checkin, json!({})).await;
    assert_eq!(receipt["checkInTime"], "2025-01-01T18:30:00.000Z");
    assert_eq!(
        receipt["message"],
        format!("Person {person_id} checked in to event {event_id}.")
    );

    let (status, live) = get(&router, &format!("/event/{event_id}/checkins")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(live["count"], 1);
    assert_eq!(live["students"][0]["studentId"], person_id);
    assert_eq!(live["message"], "1 students are currently checked in.");

    let (status, _) = delete(&router, &checkin).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = delete(&router, &checkin).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, live) = get(&router, &format!("/event/{event_id}/checkins")).await;
    assert_eq!(live["count"], 0);
    let (status, history) = get(&router, &format!("/events/{event_id}/attendance")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_check_in_unknown_person_is_not_found() {
    let stores = TestStores::new();
    let router = app(&stores);
    let event_id = create_event(&router).await;

    let (status, body) = send(
        &router,
        Method::POST,
        &format!("/event/{event_id}/checkin/77"),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Person with id 77 not found");
    assert_eq!(stores.checkins.calls(), 0);
}

#[tokio::test]
async fn test_event_delete_reports_cleanup() {
    let stores = TestStores::new();
    let router = app(&stores);
    let event_id = create_event(&router).await;
    let person_id = register(&router, event_id, "attendee", 0).await;
    create(&router, &format!("/event/{event_id}/checkin/{person_id}"), json!({})).await;
    create(
        &router,
        &format!("/events/{event_id}/notes"),
        json!({ "text": "Bring snacks" }),
    )
    .await;

    let (status, report) = delete(&router, &format!("/events/{event_id}")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        report,
        json!({
            "eventId": event_id,
            "registrationsRemoved": 1,
            "attendanceRecordsRemoved": 1,
            "notesRemoved": 1,
            "checkInsPurged": true
        })
    );
    assert_eq!(stores.documents.len(Collection::EventNotes), 0);
    let (status, _) = get(&router, &format!("/events/{event_id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_small_group_ids_and_membership() {
    let stores = TestStores::new();
    let router = app(&stores);

    for (expected, name) in [(1, "Bible Study"), (2, "Worship Team"), (3, "Outreach")] {
        let group = create(&router, "/smallgroups", json!({ "name": name })).await;
        assert_eq!(group["id"], expected);
    }

    let person_id = create_person(&router, "Kim", "Member").await;
    let attendee = create(
        &router,
        "/attendees",
        json!({ "personId": person_id, "guardian": "Pat Member" }),
    )
    .await;
    let attendee_id = attendee["id"].as_i64().unwrap();

    let member = create(
        &router,
        "/smallgroups/2/members",
        json!({ "attendeeId": attendee_id }),
    )
    .await;
    assert_eq!(member["smallGroupId"], 2);
    assert_eq!(member["lastName"], "Member");

    let (status, body) = send(
        &router,
        Method::POST,
        "/smallgroups/2/members",
        Some(json!({ "attendeeId": attendee_id })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (_, members) = get(&router, "/smallgroups/2/members").await;
    assert_eq!(members.as_array().unwrap().len(), 1);

    let (status, _) = delete(&router, &format!("/smallgroups/2/members/{attendee_id}")).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = delete(&router, &format!("/smallgroups/2/members/{attendee_id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = delete(&router, "/smallgroups/2").await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, groups) = get(&router, "/smallgroups").await;
    let names: Vec<&str> = groups
        .as_array()
        .unwrap()
        .iter()
        .map(|g| g["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Bible Study", "Outreach"]);
}

#[tokio::test]
async fn test_group_leader_for_unknown_group() {
    let stores = TestStores::new();
    let router = app(&stores);

    let (status, body) = send(
        &router,
        Method::POST,
        "/smallgroups/9/leaders",
        Some(json!({ "leaderId": 1 })),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Small group with id 9 not found");
}

#[tokio::test]
async fn test_person_notes_lifecycle() {
    let stores = TestStores::new();
    let router = app(&stores);

    let (status, body) = send(
        &router,
        Method::POST,
        "/persons/5/notes",
        Some(json!({ "createdBy": "Pastor Dan" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "text is required");

    let created = create(
        &router,
        "/persons/5/notes",
        json!({ "text": "Asked about baptism", "personId": 99, "_id": "spoofed" }),
    )
    .await;
    let note_id = created["id"].as_str().unwrap().to_string();
    assert_ne!(note_id, "spoofed");

    let (status, notes) = get(&router, "/persons/5/notes").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(notes.as_array().unwrap().len(), 1);
    assert_eq!(notes[0]["personId"], 5);
    assert_eq!(notes[0]["created"], "2025-01-01T18:30:00Z");

    let (status, updated) = send(
        &router,
        Method::PUT,
        &format!("/notes/{note_id}"),
        Some(json!({ "followUp": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["text"], "Asked about baptism");
    assert_eq!(updated["followUp"], true);
    assert!(!updated["updated"].is_null());

    let (status, _) = delete(&router, &format!("/notes/{note_id}")).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = delete(&router, &format!("/notes/{note_id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_parent_contacts_require_summary() {
    let stores = TestStores::new();
    let router = app(&stores);

    let (status, _) = send(
        &router,
        Method::POST,
        "/persons/2/contacts",
        Some(json!({ "method": "phone" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    create(
        &router,
        "/persons/2/contacts",
        json!({ "summary": "Called about the retreat", "method": "phone" }),
    )
    .await;
    let (_, contacts) = get(&router, "/persons/2/contacts").await;
    assert_eq!(contacts[0]["summary"], "Called about the retreat");

    let (_, other) = get(&router, "/persons/3/contacts").await;
    assert!(other.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_document_store_failure_on_primary_path() {
    let stores = TestStores::new();
    let router = app(&stores);
    stores.documents.set_failing(true);

    let (status, body) = get(&router, "/persons/1/notes").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "MongoDB is unavailable");
}

#[tokio::test]
async fn test_event_types_unique_by_name() {
    let stores = TestStores::new();
    let router = app(&stores);

    create(
        &router,
        "/event-types",
        json!({ "event_type": "Retreat", "overnight": true }),
    )
    .await;

    let (status, body) = send(
        &router,
        Method::POST,
        "/event-types",
        Some(json!({ "event_type": "Retreat" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "event type 'Retreat' already exists");

    let (status, retreat) = get(&router, "/event-types/Retreat").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(retreat["overnight"], true);

    let (status, updated) = send(
        &router,
        Method::PUT,
        "/event-types/Retreat",
        Some(json!({ "permissionSlip": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["permissionSlip"], true);
    assert_eq!(updated["overnight"], true);

    let (status, _) = delete(&router, "/event-types/Retreat").await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, body) = get(&router, "/event-types/Retreat").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Event type with id Retreat not found");
}
