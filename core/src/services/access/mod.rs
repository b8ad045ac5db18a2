//! Role-based access checks

mod role_gate;

pub use role_gate::{RoleGate, ADMIN_ROLE};
