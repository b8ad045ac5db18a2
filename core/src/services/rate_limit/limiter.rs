//! Sharded map of token buckets keyed by identity

use dashmap::DashMap;
use std::time::{Duration, Instant};

use qd_shared::config::RateLimitConfig;

use crate::errors::{DomainError, DomainResult};

use super::bucket::{RateLimitDecision, TokenBucket};

/// Per-identity rate limiter
///
/// Buckets are created on first use. Each check runs under the lock of the
/// shard that owns the key, so concurrent requests for one identity are
/// serialized and a token is never handed out twice.
#[derive(Debug)]
pub struct RateLimiter {
    buckets: DashMap<String, TokenBucket>,
    burst: u32,
    interval_ns: u64,
    idle_ttl: Duration,
}

impl RateLimiter {
    /// Creates a limiter
    ///
    /// # Arguments
    ///
    /// * `burst` - Bucket capacity, at least 1
    /// * `requests_per_second` - Refill rate, positive and finite
    /// * `idle_ttl` - Buckets unused for longer, and refilled to capacity,
    ///   are dropped by [`evict_idle`]
    ///
    /// [`evict_idle`]: RateLimiter::evict_idle
    pub fn new(burst: u32, requests_per_second: f64, idle_ttl: Duration) -> DomainResult<Self> {
        if burst == 0 {
            return Err(config_error("burst must be at least 1"));
        }
        if !requests_per_second.is_finite() || requests_per_second <= 0.0 {
            return Err(config_error("requests_per_second must be positive"));
        }

        let interval = (1e9 / requests_per_second).round();
        if interval < 1.0 || interval >= u64::MAX as f64 {
            return Err(config_error("requests_per_second is out of range"));
        }

        Ok(Self {
            buckets: DashMap::new(),
            burst,
            interval_ns: interval as u64,
            idle_ttl,
        })
    }

    pub fn from_config(config: &RateLimitConfig) -> DomainResult<Self> {
        Self::new(
            config.burst,
            config.requests_per_second,
            Duration::from_secs(config.idle_ttl),
        )
    }

    /// Whether a request for `key` is admitted now
    pub fn allow(&self, key: &str) -> bool {
        self.check(key).is_allowed()
    }

    /// Consumes a token for `key` if one is available
    pub fn check(&self, key: &str) -> RateLimitDecision {
        self.check_at(key, Instant::now())
    }

    /// [`check`](RateLimiter::check) against an explicit instant
    pub fn check_at(&self, key: &str, now: Instant) -> RateLimitDecision {
        if let Some(mut bucket) = self.buckets.get_mut(key) {
            return bucket.try_acquire(now);
        }

        // Two callers can race to create the bucket; entry() lets exactly
        // one insert it and the other consume from it.
        let mut bucket = self
            .buckets
            .entry(key.to_string())
            .or_insert_with(|| TokenBucket::new(self.burst, self.interval_ns, now));
        bucket.try_acquire(now)
    }

    /// Drops buckets idle for longer than the configured TTL
    ///
    /// A bucket still short of capacity is kept regardless of idle time;
    /// recreating it would hand out credit it has not earned back yet.
    ///
    /// # Returns
    ///
    /// Number of buckets removed
    pub fn evict_idle(&self, now: Instant) -> usize {
        let mut evicted = 0;
        self.buckets.retain(|_, bucket| {
            let keep = bucket.idle_for(now) <= self.idle_ttl || !bucket.is_full(now);
            if !keep {
                evicted += 1;
            }
            keep
        });
        evicted
    }

    /// Number of tracked identities
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn burst(&self) -> u32 {
        self.burst
    }
}

fn config_error(message: &str) -> DomainError {
    DomainError::Configuration {
        message: format!("rate limiter: {}", message),
    }
}
