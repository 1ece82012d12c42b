//! Sliding-window, in-process rate limiter keyed by `subject:tier` (spec §4.4).

use protocol::{ApiError, ApiErrorType};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

const WINDOW: Duration = Duration::from_secs(60);

#[derive(Clone, Copy, Debug)]
struct Window {
    count: u32,
    window_start: Instant,
}

/// Per-tier limit configuration; `requests_per_minute <= 0` disables
/// limiting for that tier.
#[derive(Clone, Debug, Default)]
pub struct RateLimiterConfig {
    pub tiers: HashMap<String, i64>,
    pub default_rpm: i64,
}

impl RateLimiterConfig {
    fn rpm_for(&self, tier: &str) -> i64 {
        self.tiers.get(tier).copied().unwrap_or(self.default_rpm)
    }
}

/// Sliding-window counter, reset every 60s per key. Internal errors (lock
/// poisoning aside, there are none in this implementation) fail open per
/// spec §4.4 — callers should treat any `Err` from `allow` as "let it through".
pub struct RateLimiter {
    config: RateLimiterConfig,
    windows: Mutex<HashMap<String, Window>>,
}

impl RateLimiter {
    pub fn new(config: RateLimiterConfig) -> Self {
        Self {
            config,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Returns `Ok(())` if the request is allowed, `Err(ApiError)` (type
    /// `too_many_requests`) otherwise.
    pub async fn allow(&self, subject: &str, tier: &str) -> Result<(), ApiError> {
        let rpm = self.config.rpm_for(tier);
        if rpm <= 0 {
            return Ok(());
        }

        let key = format!("{subject}:{tier}");
        let mut windows = self.windows.lock().await;
        let now = Instant::now();
        let entry = windows.entry(key).or_insert(Window {
            count: 0,
            window_start: now,
        });

        if now.duration_since(entry.window_start) >= WINDOW {
            entry.count = 0;
            entry.window_start = now;
        }

        entry.count += 1;
        if entry.count > rpm as u32 {
            return Err(ApiError::new(
                ApiErrorType::TooManyRequests,
                "rate limit exceeded",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(rpm: i64) -> RateLimiterConfig {
        RateLimiterConfig {
            tiers: HashMap::new(),
            default_rpm: rpm,
        }
    }

    #[tokio::test]
    async fn allows_requests_under_the_limit() {
        let limiter = RateLimiter::new(config(3));
        for _ in 0..3 {
            assert!(limiter.allow("alice", "default").await.is_ok());
        }
    }

    #[tokio::test]
    async fn rejects_requests_over_the_limit() {
        let limiter = RateLimiter::new(config(2));
        assert!(limiter.allow("alice", "default").await.is_ok());
        assert!(limiter.allow("alice", "default").await.is_ok());
        let err = limiter.allow("alice", "default").await.unwrap_err();
        assert_eq!(err.error_type, protocol::ApiErrorType::TooManyRequests);
    }

    #[tokio::test]
    async fn zero_or_negative_rpm_disables_limiting() {
        let limiter = RateLimiter::new(config(0));
        for _ in 0..100 {
            assert!(limiter.allow("alice", "default").await.is_ok());
        }
    }

    #[tokio::test]
    async fn per_tier_limits_are_independent() {
        let mut tiers = HashMap::new();
        tiers.insert("gold".to_string(), 5);
        tiers.insert("free".to_string(), 1);
        let limiter = RateLimiter::new(RateLimiterConfig { tiers, default_rpm: 1 });

        assert!(limiter.allow("alice", "gold").await.is_ok());
        assert!(limiter.allow("alice", "free").await.is_ok());
        assert!(limiter.allow("alice", "free").await.is_err());
        assert!(limiter.allow("alice", "gold").await.is_ok());
    }

    #[tokio::test]
    async fn distinct_subjects_have_independent_windows() {
        let limiter = RateLimiter::new(config(1));
        assert!(limiter.allow("alice", "default").await.is_ok());
        assert!(limiter.allow("bob", "default").await.is_ok());
    }
}
