//! Trait-based refresh-attempt stores with in-memory and Redis backends.

pub mod inmemory;
pub mod traits;

// Feature-gated storage implementations
#[cfg(feature = "redis")]
pub mod redis;

// Re-export commonly used types and traits
pub use inmemory::MemoryRefreshRateLimiter;
pub use traits::*;

#[cfg(feature = "redis")]
pub use self::redis::RedisRefreshRateLimiter;

use crate::errors::StorageError;
use std::sync::Arc;

/// Attempt-store backend configuration and factory
#[derive(Clone)]
pub enum AttemptStoreBackend {
    Memory,
    #[cfg(feature = "redis")]
    Redis(String), // Connection URL
}

/// Parse the attempt-store backend from configuration
pub fn parse_attempt_store_backend(
    backend_name: &str,
    redis_url: Option<&str>,
) -> std::result::Result<AttemptStoreBackend, StorageError> {
    match backend_name {
        "memory" => Ok(AttemptStoreBackend::Memory),
        #[cfg(feature = "redis")]
        "redis" => {
            let url = redis_url.ok_or_else(|| {
                StorageError::ConnectionFailed("REDIS_URL required for redis backend".to_string())
            })?;
            Ok(AttemptStoreBackend::Redis(url.to_string()))
        }
        _ => Err(StorageError::UnknownBackend(backend_name.to_string())),
    }
}

/// Create a rate limiter for the configured backend
pub fn create_rate_limiter(
    backend: AttemptStoreBackend,
    max_attempts: u32,
    window: chrono::Duration,
) -> std::result::Result<Arc<dyn RefreshRateLimiter>, StorageError> {
    match backend {
        AttemptStoreBackend::Memory => {
            Ok(Arc::new(MemoryRefreshRateLimiter::new(max_attempts, window)))
        }
        #[cfg(feature = "redis")]
        AttemptStoreBackend::Redis(url) => Ok(Arc::new(RedisRefreshRateLimiter::new(
            &url,
            max_attempts,
            window,
        )?)),
    }
}
