use chrono::Utc;
use dashmap::DashMap;

struct Window {
    count: u32,
    reset_at_ms: i64,
}

/// Process-local fixed-window counter keyed by an arbitrary string
/// (IP, email, or a composite). A coarse abuse deterrent, not a security
/// boundary: counters reset on restart and under-count across a horizontally
/// scaled deployment. Swap for a shared-store implementation before running
/// multiple instances.
#[derive(Default)]
pub struct RateLimiter {
    windows: DashMap<String, Window>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Increments the counter for `key` and reports whether the request is
    /// still within `max_requests` per `window_ms`.
    pub fn allow(&self, key: &str, max_requests: u32, window_ms: i64) -> bool {
        self.allow_at(key, max_requests, window_ms, Utc::now().timestamp_millis())
    }

    fn allow_at(&self, key: &str, max_requests: u32, window_ms: i64, now_ms: i64) -> bool {
        let mut entry = self.windows.entry(key.to_string()).or_insert(Window {
            count: 0,
            reset_at_ms: now_ms + window_ms,
        });

        if now_ms > entry.reset_at_ms {
            entry.count = 0;
            entry.reset_at_ms = now_ms + window_ms;
        }

        entry.count += 1;
        entry.count <= max_requests
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_up_to_the_limit_then_rejects() {
        let limiter = RateLimiter::new();
        assert!(limiter.allow_at("k", 3, 60_000, 0));
        assert!(limiter.allow_at("k", 3, 60_000, 1));
        assert!(limiter.allow_at("k", 3, 60_000, 2));
        assert!(!limiter.allow_at("k", 3, 60_000, 3));
        assert!(!limiter.allow_at("k", 3, 60_000, 4));
    }

    #[test]
    fn window_resets_after_expiry() {
        let limiter = RateLimiter::new();
        assert!(limiter.allow_at("k", 1, 1_000, 0));
        assert!(!limiter.allow_at("k", 1, 1_000, 500));
        // Past the window end: counter starts over.
        assert!(limiter.allow_at("k", 1, 1_000, 1_001));
        assert!(!limiter.allow_at("k", 1, 1_000, 1_002));
    }

    #[test]
    fn keys_are_independent() {
        let limiter = RateLimiter::new();
        assert!(limiter.allow_at("a", 1, 60_000, 0));
        assert!(!limiter.allow_at("a", 1, 60_000, 1));
        assert!(limiter.allow_at("b", 1, 60_000, 2));
    }
}
