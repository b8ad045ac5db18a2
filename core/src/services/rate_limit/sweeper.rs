//! Background eviction of idle rate limit buckets

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use super::limiter::RateLimiter;

/// Start a task that calls [`RateLimiter::evict_idle`] every `every`
///
/// The task runs until the returned handle is aborted or the runtime shuts
/// down. Must be called from within a tokio runtime.
pub fn spawn_sweeper(limiter: Arc<RateLimiter>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(interval_secs = every.as_secs(), "Rate limit sweeper started");

        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let evicted = limiter.evict_idle(Instant::now());
            if evicted > 0 {
                debug!(evicted, remaining = limiter.len(), "Evicted idle rate limit buckets");
            }
        }
    })
}
