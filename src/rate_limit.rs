// In-memory sliding-window rate limiter for login attempts.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Error returned when a rate limit is exceeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitError {
    pub max: usize,
    pub window: Duration,
}

impl std::fmt::Display for RateLimitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Rate limit exceeded: max {} attempts per {} seconds",
            self.max,
            self.window.as_secs()
        )
    }
}

impl std::error::Error for RateLimitError {}

type Attempts = HashMap<String, Vec<Instant>>;

/// Thread-safe in-memory rate limiter keyed by an arbitrary string (a username).
///
/// Keys come from unauthenticated clients, so idle keys are swept out once per
/// window instead of living for the whole process.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    inner: Arc<Mutex<(Attempts, Instant)>>,
    max: usize,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max: usize, window: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new((HashMap::new(), Instant::now()))),
            max,
            window,
        }
    }

    /// Allow `max_per_minute` events per key in any rolling minute.
    pub fn per_minute(max_per_minute: usize) -> Self {
        Self::new(max_per_minute, Duration::from_secs(60))
    }

    // A poisoned map only means another request panicked mid-update; the
    // timestamps are still usable.
    fn lock(&self) -> MutexGuard<'_, (Attempts, Instant)> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Record an event for `key` if it is within the limit.
    pub fn check_limit(&self, key: &str) -> Result<(), RateLimitError> {
        let mut guard = self.lock();
        let (attempts, last_sweep) = &mut *guard;
        let now = Instant::now();

        if now.duration_since(*last_sweep) >= self.window {
            attempts.retain(|_, times| {
                times.retain(|t| now.duration_since(*t) < self.window);
                !times.is_empty()
            });
            *last_sweep = now;
        }

        let entries = attempts.entry(key.to_string()).or_default();
        entries.retain(|t| now.duration_since(*t) < self.window);

        if entries.len() >= self.max {
            if entries.is_empty() {
                attempts.remove(key);
            }
            return Err(RateLimitError {
                max: self.max,
                window: self.window,
            });
        }

        entries.push(now);
        Ok(())
    }

    /// Forget all events for `key` (after a successful login).
    pub fn clear(&self, key: &str) {
        self.lock().0.remove(key);
    }

    /// Get the current count for a key (for testing/diagnostics).
    pub fn current_count(&self, key: &str) -> usize {
        let mut guard = self.lock();
        let now = Instant::now();

        if let Some(entries) = guard.0.get_mut(key) {
            entries.retain(|t| now.duration_since(*t) < self.window);
            entries.len()
        } else {
            0
        }
    }

    /// Number of keys currently holding attempt history.
    pub fn tracked_keys(&self) -> usize {
        self.lock().0.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limiter_allows_within_limit() {
        let limiter = RateLimiter::per_minute(10);
        for _ in 0..10 {
            assert!(limiter.check_limit("alice").is_ok());
        }
    }

    #[test]
    fn test_rate_limiter_denies_over_limit() {
        let limiter = RateLimiter::per_minute(3);
        for _ in 0..3 {
            assert!(limiter.check_limit("alice").is_ok());
        }
        let err = limiter.check_limit("alice").unwrap_err();
        assert_eq!(err.max, 3);
        assert_eq!(err.window, Duration::from_secs(60));
    }

    #[test]
    fn test_rate_limiter_separate_keys() {
        let limiter = RateLimiter::per_minute(1);
        assert!(limiter.check_limit("alice").is_ok());
        assert!(limiter.check_limit("alice").is_err());
        assert!(limiter.check_limit("bob").is_ok());
    }

    #[test]
    fn test_rate_limiter_clear() {
        let limiter = RateLimiter::per_minute(2);
        limiter.check_limit("alice").unwrap();
        limiter.check_limit("alice").unwrap();
        assert!(limiter.check_limit("alice").is_err());

        limiter.clear("alice");
        assert_eq!(limiter.current_count("alice"), 0);
        assert!(limiter.check_limit("alice").is_ok());
    }

    #[test]
    fn test_window_expiry() {
        let limiter = RateLimiter::new(1, Duration::from_millis(20));
        limiter.check_limit("alice").unwrap();
        assert!(limiter.check_limit("alice").is_err());
        std::thread::sleep(Duration::from_millis(30));
        assert!(limiter.check_limit("alice").is_ok());
    }

    #[test]
    fn test_idle_keys_are_swept() {
        let limiter = RateLimiter::new(3, Duration::from_millis(200));
        for i in 0..500 {
            limiter.check_limit(&format!("nobody-{i}")).unwrap();
        }
        assert_eq!(limiter.tracked_keys(), 500);

        std::thread::sleep(Duration::from_millis(250));
        limiter.check_limit("alice").unwrap();
        assert_eq!(limiter.tracked_keys(), 1);
        assert_eq!(limiter.current_count("alice"), 1);
    }

    #[test]
    fn test_rejected_key_without_history_is_not_kept() {
        let limiter = RateLimiter::per_minute(0);
        assert!(limiter.check_limit("alice").is_err());
        assert_eq!(limiter.tracked_keys(), 0);
    }

    #[test]
    fn test_rate_limit_error_display() {
        let err = RateLimitError {
            max: 10,
            window: Duration::from_secs(60),
        };
        assert_eq!(
            err.to_string(),
            "Rate limit exceeded: max 10 attempts per 60 seconds"
        );
    }
}
