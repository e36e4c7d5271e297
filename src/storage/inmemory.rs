//! In-memory refresh-attempt store.
//!
//! Suitable for single-instance deployments; counters reset on restart.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::errors::StorageError;
use crate::storage::traits::{RefreshAttemptWindow, RefreshRateLimiter, Result};

/// Sliding-window counters behind a single mutex. The lock is held only for
/// the sweep and increment, never across an upstream call.
pub struct MemoryRefreshRateLimiter {
    max_attempts: u32,
    window: chrono::Duration,
    windows: Mutex<HashMap<String, RefreshAttemptWindow>>,
}

impl MemoryRefreshRateLimiter {
    pub fn new(max_attempts: u32, window: chrono::Duration) -> Self {
        Self {
            max_attempts,
            window,
            windows: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl RefreshRateLimiter for MemoryRefreshRateLimiter {
    async fn allow(&self, user_key: &str) -> Result<bool> {
        let now = Utc::now();
        let mut windows = self
            .windows
            .lock()
            .map_err(|e| StorageError::LockPoisoned(e.to_string()))?;

        // Lapsed windows are evicted rather than reset in place, so the map
        // never holds an entry older than the window duration.
        windows.retain(|_, window| now - window.window_start < self.window);

        let entry = windows
            .entry(user_key.to_string())
            .or_insert(RefreshAttemptWindow {
                count: 0,
                window_start: now,
            });

        if entry.count >= self.max_attempts {
            return Ok(false);
        }

        entry.count += 1;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_sixth_attempt_within_window_is_denied() {
        let limiter = MemoryRefreshRateLimiter::new(5, chrono::Duration::seconds(60));

        for attempt in 1..=5 {
            assert!(
                limiter.allow("mruiz").await.unwrap(),
                "attempt {} should be allowed",
                attempt
            );
        }

        assert!(!limiter.allow("mruiz").await.unwrap());
        assert!(!limiter.allow("mruiz").await.unwrap());
    }

    #[tokio::test]
    async fn test_window_elapse_resets_the_counter() {
        let limiter = MemoryRefreshRateLimiter::new(2, chrono::Duration::milliseconds(50));

        assert!(limiter.allow("mruiz").await.unwrap());
        assert!(limiter.allow("mruiz").await.unwrap());
        assert!(!limiter.allow("mruiz").await.unwrap());

        tokio::time::sleep(std::time::Duration::from_millis(60)).await;

        assert!(limiter.allow("mruiz").await.unwrap());
    }

    #[tokio::test]
    async fn test_lapsed_windows_are_evicted() {
        let limiter = MemoryRefreshRateLimiter::new(2, chrono::Duration::milliseconds(50));

        assert!(limiter.allow("mruiz").await.unwrap());
        assert!(limiter.allow("jdoe").await.unwrap());
        assert_eq!(limiter.windows.lock().unwrap().len(), 2);

        tokio::time::sleep(std::time::Duration::from_millis(60)).await;

        // Any caller's attempt sweeps every lapsed window, not just its own
        assert!(limiter.allow("nkumar").await.unwrap());
        let windows = limiter.windows.lock().unwrap();
        assert_eq!(windows.len(), 1);
        assert!(windows.contains_key("nkumar"));
    }

    #[tokio::test]
    async fn test_user_keys_are_independent() {
        let limiter = MemoryRefreshRateLimiter::new(1, chrono::Duration::seconds(60));

        assert!(limiter.allow("mruiz").await.unwrap());
        assert!(!limiter.allow("mruiz").await.unwrap());
        assert!(limiter.allow("jdoe").await.unwrap());
    }

    #[tokio::test]
    async fn test_concurrent_attempts_never_exceed_the_maximum() {
        let limiter = Arc::new(MemoryRefreshRateLimiter::new(5, chrono::Duration::seconds(60)));

        let tasks = (0..10).map(|_| {
            let limiter = limiter.clone();
            tokio::spawn(async move { limiter.allow("mruiz").await.unwrap() })
        });

        let results = futures::future::join_all(tasks).await;
        let allowed = results.into_iter().filter(|r| *r.as_ref().unwrap()).count();
        assert_eq!(allowed, 5);
    }
}
