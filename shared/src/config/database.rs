//! Database configuration module

use serde::{Deserialize, Serialize};

use super::{env_opt, env_or};

/// Database configuration for PostgreSQL connections
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Database connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Connection acquire timeout in seconds
    pub connect_timeout: u64,

    /// Idle connection timeout in seconds
    pub idle_timeout: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::from("postgres://localhost:5432/querydesk"),
            max_connections: 10,
            connect_timeout: 5,
            idle_timeout: 600,
        }
    }
}

impl DatabaseConfig {
    /// Create from environment variables. Returns `None` when `DATABASE_URL`
    /// is not set.
    pub fn from_env() -> Option<Self> {
        let url = env_opt("DATABASE_URL")?;
        let defaults = Self::default();
        Some(Self {
            url,
            max_connections: env_or("DATABASE_MAX_CONNECTIONS", defaults.max_connections),
            connect_timeout: env_or("DATABASE_CONNECT_TIMEOUT", defaults.connect_timeout),
            ..defaults
        })
    }

    /// Create a new database configuration with URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Set the maximum number of connections
    pub fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }
}
