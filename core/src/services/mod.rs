//! Business services containing domain logic.

pub mod access;
pub mod rate_limit;
pub mod token;

// Re-export commonly used types
pub use access::{RoleGate, ADMIN_ROLE};
pub use rate_limit::{spawn_sweeper, RateLimitDecision, RateLimiter};
pub use token::{KeyManager, KeySource, TokenService, TokenServiceConfig};
