//! Storage trait definitions for refresh-attempt rate limiting.
//!
//! Defines the async interface the token refresher consults before every
//! upstream refresh, implementable by in-process or shared backends.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::errors::StorageError;

pub type Result<T> = std::result::Result<T, StorageError>;

/// One user's attempt counter within the currently open window
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshAttemptWindow {
    /// Attempts recorded since `window_start`
    pub count: u32,
    /// When the open window began
    pub window_start: DateTime<Utc>,
}

/// Sliding-window counter bounding refresh attempts per user identity.
///
/// Implementations must be safe under concurrent calls for the same or
/// different keys. A deny is terminal for the requesting caller, never
/// retryable; the counter never exceeds the configured maximum within an
/// open window.
#[async_trait]
pub trait RefreshRateLimiter: Send + Sync {
    /// Record an attempt for `user_key` and report whether it is allowed
    /// within the configured window
    async fn allow(&self, user_key: &str) -> Result<bool>;
}
