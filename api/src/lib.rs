//! # QueryDesk API
//!
//! Actix-web surface of the QueryDesk backend: the authentication, role and
//! rate limit middleware, error mapping to the JSON envelope, and the thin
//! set of routes that exercise them.

pub mod app;
pub mod dto;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod telemetry;

pub use app::{create_app, run_server, AppState, HealthProbes};
