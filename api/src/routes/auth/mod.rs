//! Authentication route handlers
//!
//! - Token refresh (rotating refresh tokens)
//! - Logout (revocation of the presenting tokens)
//!
//! Issuing the first pair belongs to the login flow, which lives outside
//! this service.

pub mod logout;
pub mod refresh;
