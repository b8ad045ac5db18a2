//! # Infrastructure Layer
//!
//! Concrete implementations of the collaborators the core depends on:
//!
//! - **Cache**: Redis client and the Redis-backed `RevocationStore`
//! - **Database**: lazily connected Postgres pool using SQLx

use qd_core::errors::DomainError;

/// Cache module - Redis client and revocation store
pub mod cache;

/// Database module - Postgres pool construction
pub mod database;

pub use cache::{RedisClient, RedisRevocationStore};
pub use database::{create_pool, DatabasePool};

/// Infrastructure-specific error types
#[derive(Debug, thiserror::Error)]
pub enum InfrastructureError {
    /// Database connection error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Redis cache error
    #[error("Cache error: {0}")]
    Cache(#[from] redis::RedisError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<InfrastructureError> for DomainError {
    fn from(err: InfrastructureError) -> Self {
        match err {
            InfrastructureError::Config(message) => DomainError::Configuration { message },
            other => DomainError::Internal {
                message: other.to_string(),
            },
        }
    }
}
