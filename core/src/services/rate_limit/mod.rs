//! Per-identity token bucket rate limiting
//!
//! - `bucket` - a single token bucket with integer nanosecond credit
//! - `limiter` - the sharded map of buckets keyed by identity
//! - `sweeper` - background eviction of idle buckets

mod bucket;
mod limiter;
mod sweeper;

#[cfg(test)]
mod tests;

pub use bucket::{RateLimitDecision, TokenBucket};
pub use limiter::RateLimiter;
pub use sweeper::spawn_sweeper;
