//! Token bucket with integer nanosecond credit

use std::time::{Duration, Instant};

/// Result of a rate limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    /// Request is allowed
    Allowed {
        /// Whole tokens left after this request
        remaining: u32,
    },
    /// Request is rate limited
    Limited {
        /// Seconds until a token is available, at least 1
        retry_after: u64,
    },
}

impl RateLimitDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitDecision::Allowed { .. })
    }
}

/// A single identity's bucket
///
/// Credit is time: one token costs `interval_ns` nanoseconds of credit and
/// credit accrues one nanosecond per elapsed nanosecond, capped at
/// `burst * interval_ns`. Integer arithmetic keeps refill exact.
#[derive(Debug, Clone)]
pub struct TokenBucket {
    interval_ns: u64,
    capacity_ns: u64,
    credit_ns: u64,
    last_refill: Instant,
    last_access: Instant,
}

impl TokenBucket {
    /// Creates a full bucket
    pub fn new(burst: u32, interval_ns: u64, now: Instant) -> Self {
        let capacity_ns = interval_ns.saturating_mul(u64::from(burst));
        Self {
            interval_ns,
            capacity_ns,
            credit_ns: capacity_ns,
            last_refill: now,
            last_access: now,
        }
    }

    /// Refills, then takes one token if available
    pub fn try_acquire(&mut self, now: Instant) -> RateLimitDecision {
        self.refill(now);
        if now > self.last_access {
            self.last_access = now;
        }

        if self.credit_ns >= self.interval_ns {
            self.credit_ns -= self.interval_ns;
            let remaining = self.credit_ns / self.interval_ns;
            RateLimitDecision::Allowed {
                remaining: u32::try_from(remaining).unwrap_or(u32::MAX),
            }
        } else {
            let wait_ns = self.interval_ns - self.credit_ns;
            RateLimitDecision::Limited {
                retry_after: ceil_secs(wait_ns),
            }
        }
    }

    /// Time since the bucket was last used
    pub fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_access)
    }

    /// Refills to `now` and reports whether the bucket is back at capacity
    ///
    /// A full bucket is indistinguishable from a freshly created one, so only
    /// full buckets may be dropped without minting credit.
    pub fn is_full(&mut self, now: Instant) -> bool {
        self.refill(now);
        self.credit_ns >= self.capacity_ns
    }

    fn refill(&mut self, now: Instant) {
        // Instants from other threads may arrive slightly out of order.
        if now <= self.last_refill {
            return;
        }
        let elapsed = now.duration_since(self.last_refill).as_nanos();
        let elapsed = u64::try_from(elapsed).unwrap_or(u64::MAX);
        self.credit_ns = self.credit_ns.saturating_add(elapsed).min(self.capacity_ns);
        self.last_refill = now;
    }
}

fn ceil_secs(nanos: u64) -> u64 {
    (nanos.saturating_add(999_999_999) / 1_000_000_000).max(1)
}
