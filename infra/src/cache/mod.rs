//! Cache module for Redis-backed token revocation
//!
//! This module provides the Redis client with connection retry logic and
//! the `RevocationStore` implementation built on it.

pub mod redis_client;
pub mod revocation_store;

#[cfg(test)]
mod tests;

pub use redis_client::RedisClient;
pub use revocation_store::RedisRevocationStore;

// Re-export commonly used types
pub use qd_shared::config::CacheConfig;
