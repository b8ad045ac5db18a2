//! Database module - Postgres pool using SQLx
//!
//! The pool is created lazily: no connection is opened until the first
//! query, so the service starts without a reachable database.

pub mod connection;

pub use connection::{create_pool, DatabasePool};
