//! Redis-backed refresh-attempt store for multi-instance deployments.
//!
//! One INCR'd key per user, expired by Redis itself when the window
//! elapses, so every instance sees the same counters.

use async_trait::async_trait;
use deadpool_redis::{Config as RedisPoolConfig, Pool, Runtime};
use redis::AsyncCommands;

use crate::errors::StorageError;
use crate::storage::traits::{RefreshRateLimiter, Result};

const ATTEMPT_KEY_PREFIX: &str = "portal-gate:refresh-attempts";

pub struct RedisRefreshRateLimiter {
    pool: Pool,
    max_attempts: u32,
    window_seconds: i64,
}

impl RedisRefreshRateLimiter {
    /// Connections are created lazily; an unreachable Redis surfaces as a
    /// `StorageError` on the first `allow` call, not here.
    pub fn new(redis_url: &str, max_attempts: u32, window: chrono::Duration) -> Result<Self> {
        let pool = RedisPoolConfig::from_url(redis_url)
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| StorageError::ConnectionFailed(e.to_string()))?;
        Ok(Self {
            pool,
            max_attempts,
            window_seconds: window.num_seconds().max(1),
        })
    }
}

#[async_trait]
impl RefreshRateLimiter for RedisRefreshRateLimiter {
    async fn allow(&self, user_key: &str) -> Result<bool> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| StorageError::ConnectionFailed(e.to_string()))?;

        let key = format!("{}:{}", ATTEMPT_KEY_PREFIX, user_key);
        let count: i64 = conn
            .incr(&key, 1)
            .await
            .map_err(|e| StorageError::OperationFailed(e.to_string()))?;

        // First attempt opens the window.
        if count == 1 {
            let _: () = conn
                .expire(&key, self.window_seconds)
                .await
                .map_err(|e| StorageError::OperationFailed(e.to_string()))?;
        }

        Ok(count <= i64::from(self.max_attempts))
    }
}
