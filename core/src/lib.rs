//! # QueryDesk Core
//!
//! Core domain layer for the QueryDesk backend.
//! This crate contains the token entities, the RS256 token service and its
//! key management, the revocation store interface, role-based access checks
//! and the per-identity rate limiter. Nothing here depends on a web framework.

pub mod domain;
pub mod errors;
pub mod repositories;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::entities::{Claims, TokenPair, TokenType};
pub use errors::{AuthError, DomainError, DomainResult, TokenError};
pub use repositories::{InMemoryRevocationStore, RevocationStore};
pub use services::{
    spawn_sweeper, KeyManager, KeySource, RateLimitDecision, RateLimiter, RoleGate,
    TokenService, TokenServiceConfig, ADMIN_ROLE,
};
