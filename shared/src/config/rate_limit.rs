//! Rate limiting configuration module

use serde::{Deserialize, Serialize};

use super::env_or;

/// Per-identity token bucket configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    /// Enable rate limiting
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Bucket capacity (maximum burst of back-to-back requests)
    pub burst: u32,

    /// Refill rate in requests per second
    pub requests_per_second: f64,

    /// How often idle buckets are swept, in seconds
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval: u64,

    /// Buckets untouched for longer than this many seconds are evicted
    #[serde(default = "default_idle_ttl")]
    pub idle_ttl: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            burst: 20,
            requests_per_second: 10.0,
            sweep_interval: default_sweep_interval(),
            idle_ttl: default_idle_ttl(),
        }
    }
}

impl RateLimitConfig {
    /// Create from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            enabled: env_or("RATE_LIMIT_ENABLED", defaults.enabled),
            burst: env_or("RATE_LIMIT_BURST", defaults.burst),
            requests_per_second: env_or("RATE_LIMIT_RPS", defaults.requests_per_second),
            sweep_interval: env_or("RATE_LIMIT_SWEEP_INTERVAL", defaults.sweep_interval),
            idle_ttl: env_or("RATE_LIMIT_IDLE_TTL", defaults.idle_ttl),
        }
    }

    /// Create a configuration with the given burst and rate
    pub fn new(burst: u32, requests_per_second: f64) -> Self {
        Self {
            burst,
            requests_per_second,
            ..Default::default()
        }
    }

    /// Set the idle eviction threshold in seconds
    pub fn with_idle_ttl(mut self, seconds: u64) -> Self {
        self.idle_ttl = seconds;
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.burst == 0 {
            return Err("rate limit burst must be at least 1".to_string());
        }
        if !self.requests_per_second.is_finite() || self.requests_per_second <= 0.0 {
            return Err(format!(
                "rate limit requests_per_second must be a positive number, got {}",
                self.requests_per_second
            ));
        }
        // Below one token per ~31 years the nanosecond interval overflows u64.
        if self.requests_per_second < 1e-9 {
            return Err("rate limit requests_per_second is too small".to_string());
        }
        if self.sweep_interval == 0 {
            return Err("rate limit sweep_interval must be positive".to_string());
        }
        Ok(())
    }
}

fn default_enabled() -> bool {
    true
}

fn default_sweep_interval() -> u64 {
    60
}

fn default_idle_ttl() -> u64 {
    600  // 10 minutes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RateLimitConfig::default();
        assert!(config.enabled);
        assert_eq!(config.burst, 20);
        assert_eq!(config.requests_per_second, 10.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_rate() {
        assert!(RateLimitConfig::new(5, 0.0).validate().is_err());
        assert!(RateLimitConfig::new(5, -1.0).validate().is_err());
        assert!(RateLimitConfig::new(5, f64::NAN).validate().is_err());
        assert!(RateLimitConfig::new(0, 1.0).validate().is_err());
        assert!(RateLimitConfig::new(1, 0.5).validate().is_ok());
    }
}
