//! Shared configuration and common types for QueryDesk server
//!
//! This crate provides common functionality used across all server modules:
//! - Configuration types loaded from the environment
//! - The JSON error envelope and error codes

pub mod config;
pub mod errors;

// Re-export commonly used items at crate root
pub use config::{
    AppConfig, AuthConfig, CacheConfig, DatabaseConfig, Environment, JwtConfig, LogFormat,
    LoggingConfig, RateLimitConfig, RevocationConfig, ServerConfig,
};
pub use errors::{error_codes, ErrorResponse};
