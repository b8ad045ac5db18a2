use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use qd_shared::config::RateLimitConfig;

use super::{spawn_sweeper, RateLimitDecision, RateLimiter};
use crate::errors::DomainError;

fn limiter(burst: u32, rps: f64) -> RateLimiter {
    RateLimiter::new(burst, rps, Duration::from_secs(600)).unwrap()
}

#[test]
fn test_rejects_invalid_settings() {
    for (burst, rps) in [(0, 1.0), (1, 0.0), (1, -2.0), (1, f64::NAN), (1, f64::INFINITY)] {
        assert!(matches!(
            RateLimiter::new(burst, rps, Duration::from_secs(1)),
            Err(DomainError::Configuration { .. })
        ));
    }
}

#[test]
fn test_from_config() {
    let limiter = RateLimiter::from_config(&RateLimitConfig::new(3, 1.0)).unwrap();
    assert_eq!(limiter.burst(), 3);
    assert!(limiter.is_empty());
}

#[test]
fn test_burst_then_limited() {
    let limiter = limiter(5, 1.0);
    let now = Instant::now();

    for _ in 0..5 {
        assert!(limiter.check_at("user:1", now).is_allowed());
    }
    assert_eq!(
        limiter.check_at("user:1", now),
        RateLimitDecision::Limited { retry_after: 1 }
    );
}

#[test]
fn test_keys_are_independent() {
    let limiter = limiter(1, 1.0);
    let now = Instant::now();

    assert!(limiter.check_at("user:1", now).is_allowed());
    assert!(!limiter.check_at("user:1", now).is_allowed());
    assert!(limiter.check_at("user:2", now).is_allowed());
    assert!(limiter.check_at("ip:10.0.0.1", now).is_allowed());
    assert_eq!(limiter.len(), 3);
}

#[test]
fn test_admissions_bounded_by_burst_plus_refill() {
    // burst 4 at 10 rps over 2.5 seconds admits at most 4 + 25
    let limiter = limiter(4, 10.0);
    let start = Instant::now();
    let mut admitted = 0;

    for step in 0..=250u64 {
        let now = start + Duration::from_millis(step * 10);
        for _ in 0..3 {
            if limiter.check_at("k", now).is_allowed() {
                admitted += 1;
            }
        }
    }

    assert_eq!(admitted, 4 + 25);
}

#[test]
fn test_fractional_rate() {
    let limiter = limiter(1, 0.5);
    let start = Instant::now();

    assert!(limiter.check_at("k", start).is_allowed());
    assert_eq!(
        limiter.check_at("k", start),
        RateLimitDecision::Limited { retry_after: 2 }
    );
    assert!(!limiter.check_at("k", start + Duration::from_millis(1999)).is_allowed());
    assert!(limiter.check_at("k", start + Duration::from_secs(2)).is_allowed());
}

#[test]
fn test_no_double_spend_under_concurrency() {
    let limiter = Arc::new(limiter(50, 0.001));
    let admitted = Arc::new(AtomicU32::new(0));
    let now = Instant::now();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let limiter = Arc::clone(&limiter);
            let admitted = Arc::clone(&admitted);
            thread::spawn(move || {
                for _ in 0..100 {
                    if limiter.check_at("shared", now).is_allowed() {
                        admitted.fetch_add(1, Ordering::SeqCst);
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(admitted.load(Ordering::SeqCst), 50);
    assert_eq!(limiter.len(), 1);
}

#[test]
fn test_evict_idle() {
    let limiter = RateLimiter::new(2, 1.0, Duration::from_secs(60)).unwrap();
    let start = Instant::now();

    limiter.check_at("old", start);
    limiter.check_at("fresh", start + Duration::from_secs(50));

    assert_eq!(limiter.evict_idle(start + Duration::from_secs(61)), 1);
    assert_eq!(limiter.len(), 1);
    assert!(limiter.check_at("fresh", start + Duration::from_secs(61)).is_allowed());
}

#[test]
fn test_eviction_keeps_buckets_short_of_capacity() {
    let limiter = RateLimiter::new(1, 0.01, Duration::from_secs(10)).unwrap();
    let start = Instant::now();

    assert!(limiter.check_at("k", start).is_allowed());
    assert!(!limiter.check_at("k", start + Duration::from_secs(5)).is_allowed());

    // Idle past the TTL but 80 seconds short of a full refill
    assert_eq!(limiter.evict_idle(start + Duration::from_secs(20)), 0);
    assert!(!limiter.check_at("k", start + Duration::from_secs(20)).is_allowed());

    // Refilled and idle: dropping it changes nothing observable
    assert_eq!(limiter.evict_idle(start + Duration::from_secs(200)), 1);
    assert!(limiter.is_empty());
    assert!(limiter.check_at("k", start + Duration::from_secs(200)).is_allowed());
}

#[test]
fn test_eviction_preserves_admission_bound() {
    // A TTL far below burst / rate
    let limiter = RateLimiter::new(3, 0.01, Duration::from_secs(1)).unwrap();
    let start = Instant::now();
    let later = start + Duration::from_secs(2);
    let mut admitted = 0;

    for _ in 0..3 {
        if limiter.check_at("k", start).is_allowed() {
            admitted += 1;
        }
    }
    limiter.evict_idle(later);
    for _ in 0..3 {
        if limiter.check_at("k", later).is_allowed() {
            admitted += 1;
        }
    }

    // burst + ceil(2s * 0.01)
    assert!(admitted <= 3 + 1, "admitted {admitted}");
    assert_eq!(admitted, 3);
}

#[tokio::test]
async fn test_sweeper_evicts_and_stops_on_abort() {
    let limiter = Arc::new(RateLimiter::new(1, 1000.0, Duration::ZERO).unwrap());
    limiter.check("user:1");
    limiter.check("user:2");
    assert_eq!(limiter.len(), 2);

    let handle = spawn_sweeper(Arc::clone(&limiter), Duration::from_millis(20));
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(limiter.is_empty());

    handle.abort();
    let result = handle.await;
    assert!(result.unwrap_err().is_cancelled());
}
