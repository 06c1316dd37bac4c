//! HTTP API handlers, one module per resource.

pub mod checkins;
pub mod event_types;
pub mod events;
pub mod groups;
pub mod notes;
pub mod people;
pub mod registrations;
pub mod roles;
