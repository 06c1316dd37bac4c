//! # Youth Group Server
//!
//! REST API for the youth group membership backend.
//!
//! - [`config`]: environment configuration
//! - [`server`]: state, router, health endpoints
//! - [`api`]: handlers per resource
//! - [`metrics`]: Prometheus recorder and HTTP request counter
//! - [`app`]: connect the stores, serve, shut down
//!
//! The router is independent of the concrete stores, so tests build it over
//! the in-memory gateways:
//!
//! ```ignore
//! let state = AppState::new(relational, documents, checkins, clock);
//! let router = build_router(state, &[]);
//! ```

pub mod api;
pub mod app;
pub mod config;
pub mod metrics;
pub mod server;

pub use app::{StartupError, YouthGroupApp};
pub use config::Config;
pub use server::{AppState, build_router};
