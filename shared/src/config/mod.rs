//! Configuration module with business-specific sub-modules
//!
//! This module organizes configuration into logical areas:
//! - `auth` - JWT signing keys, token lifetimes and revocation policy
//! - `cache` - Redis connection used by the revocation store
//! - `database` - Postgres connection pool configuration
//! - `environment` - Environment detection and logging configuration
//! - `rate_limit` - Per-identity token bucket settings
//! - `server` - HTTP server bind address

pub mod auth;
pub mod cache;
pub mod database;
pub mod environment;
pub mod rate_limit;
pub mod server;

use serde::{Deserialize, Serialize};
use std::str::FromStr;

// Re-export commonly used types
pub use auth::{AuthConfig, JwtConfig, RevocationConfig, MAX_TOKEN_TTL_SECS};
pub use cache::CacheConfig;
pub use database::DatabaseConfig;
pub use environment::{Environment, LogFormat, LoggingConfig};
pub use rate_limit::RateLimitConfig;
pub use server::ServerConfig;

/// Complete application configuration combining all sub-configurations
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Environment configuration
    pub environment: Environment,

    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration (pool is only built when a URL is present)
    #[serde(default)]
    pub database: Option<DatabaseConfig>,

    /// Authentication configuration
    pub auth: AuthConfig,

    /// Redis configuration for the revocation store (in-memory when absent)
    #[serde(default)]
    pub cache: Option<CacheConfig>,

    /// Rate limiting configuration
    pub rate_limit: RateLimitConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        let env = Environment::default();
        Self {
            environment: env,
            server: ServerConfig::default(),
            database: None,
            auth: AuthConfig::default(),
            cache: None,
            rate_limit: RateLimitConfig::default(),
            logging: LoggingConfig::for_environment(env),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let environment = Environment::from_env();
        Self {
            environment,
            server: ServerConfig::from_env(),
            database: DatabaseConfig::from_env(),
            auth: AuthConfig::from_env(environment),
            cache: CacheConfig::from_env(),
            rate_limit: RateLimitConfig::from_env(),
            logging: LoggingConfig::from_env(environment),
        }
    }

    /// Check the configuration for values that would make the service unsafe
    /// or unusable. Returns the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        self.auth.validate(self.environment)?;
        self.rate_limit.validate()?;
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.environment.is_production()
    }
}

/// Read an environment variable and parse it, falling back to `default`
/// when the variable is unset or does not parse.
pub(crate) fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(default)
}

/// Read an optional, non-empty environment variable
pub(crate) fn env_opt(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
