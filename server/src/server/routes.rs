//! Router configuration for the youth group API.

use super::health::{metrics, readiness_check, welcome};
use super::state::AppState;
use crate::api::{checkins, event_types, events, groups, notes, people, registrations, roles};
use crate::metrics::track_http_requests;
use axum::{
    Router,
    http::HeaderValue,
    middleware,
    routing::{delete, get, post},
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use youthgroup_core::model::RoleKind;
use youthgroup_web::correlation_id_layer;
use youthgroup_web::handlers::health_check;

/// CORS for the given origins; an empty list allows any origin.
fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let allow_origin = if origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Build the complete Axum router.
///
/// Layers, outermost first: correlation id, HTTP trace, CORS, and the
/// per-route request counter.
pub fn build_router(state: AppState, allowed_origins: &[String]) -> Router {
    let api_routes = Router::new()
        // People and roles
        .route("/people", get(people::list_people).post(people::create_person))
        .route(
            "/people/:id",
            get(people::get_person)
                .put(people::update_person)
                .delete(people::delete_person),
        )
        .nest("/attendees", roles::role_routes(RoleKind::Attendee))
        .nest("/leaders", roles::role_routes(RoleKind::Leader))
        .nest("/volunteers", roles::role_routes(RoleKind::Volunteer))
        // Events
        .route("/events", get(events::list_events).post(events::create_event))
        .route(
            "/events/:id",
            get(events::get_event)
                .put(events::update_event)
                .delete(events::delete_event),
        )
        .route(
            "/events/:id/registrations",
            get(registrations::list_registrations).post(registrations::create_registration),
        )
        .route("/registrations/:id", delete(registrations::delete_registration))
        .route("/events/:id/attendance", get(events::list_attendance))
        .route("/events/:id/comprehensive", get(events::comprehensive_summary))
        // Event types
        .route(
            "/event-types",
            get(event_types::list_event_types).post(event_types::create_event_type),
        )
        .route(
            "/event-types/:name",
            get(event_types::get_event_type)
                .put(event_types::update_event_type)
                .delete(event_types::delete_event_type),
        )
        // Small groups
        .route("/smallgroups", get(groups::list_groups).post(groups::create_group))
        .route(
            "/smallgroups/:id",
            get(groups::get_group).delete(groups::delete_group),
        )
        .route(
            "/smallgroups/:id/members",
            get(groups::list_members).post(groups::add_member),
        )
        .route(
            "/smallgroups/:id/members/:attendee_id",
            delete(groups::remove_member),
        )
        .route(
            "/smallgroups/:id/leaders",
            get(groups::list_leaders).post(groups::add_leader),
        )
        .route(
            "/smallgroups/:id/leaders/:leader_id",
            delete(groups::remove_leader),
        )
        // Live check-ins
        .route(
            "/event/:id/checkin/:person_id",
            post(checkins::check_in).delete(checkins::check_out),
        )
        .route("/event/:id/checkins", get(checkins::live_check_ins))
        // Notes, contacts, event notes
        .merge(notes::document_routes());

    Router::new()
        .route("/", get(welcome))
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/metrics", get(metrics))
        .merge(api_routes)
        .route_layer(middleware::from_fn(track_http_requests))
        .layer(cors_layer(allowed_origins))
        .layer(TraceLayer::new_for_http())
        .layer(correlation_id_layer())
        .with_state(state)
}
