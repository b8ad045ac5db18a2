//! Cache configuration module

use serde::{Deserialize, Serialize};

use super::{env_opt, env_or};

/// Redis configuration for the revocation store
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    /// Redis connection URL
    pub url: String,

    /// Namespace prepended to every revocation key
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    /// Connection attempts before giving up at startup
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Initial delay between connection attempts, in milliseconds
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            url: String::from("redis://localhost:6379"),
            key_prefix: default_key_prefix(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

impl CacheConfig {
    /// Create from environment variables. Returns `None` when `REDIS_URL`
    /// is not set, in which case an in-memory store is used.
    pub fn from_env() -> Option<Self> {
        let url = env_opt("REDIS_URL")?;
        let defaults = Self::default();
        Some(Self {
            url,
            key_prefix: env_opt("REDIS_KEY_PREFIX").unwrap_or(defaults.key_prefix),
            max_retries: env_or("REDIS_MAX_RETRIES", defaults.max_retries),
            retry_delay_ms: env_or("REDIS_RETRY_DELAY_MS", defaults.retry_delay_ms),
        })
    }

    /// Create a new cache configuration with URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Set the key prefix for all cache keys
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// Generate a cache key with prefix
    pub fn make_key(&self, key: &str) -> String {
        if self.key_prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}:{}", self.key_prefix, key)
        }
    }
}

fn default_key_prefix() -> String {
    String::from("querydesk:revoked")
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    100
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_make_key() {
        let config = CacheConfig::default();
        assert_eq!(config.make_key("abc"), "querydesk:revoked:abc");

        let bare = CacheConfig::new("redis://127.0.0.1").with_prefix("");
        assert_eq!(bare.make_key("abc"), "abc");
    }
}
