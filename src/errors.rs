//! Standardized error types following the `error-portal-<domain>-<number>` format.

use thiserror::Error;

/// Configuration errors that occur during application startup
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Error when a required environment variable is not set
    #[error("error-portal-config-1 {0} must be set")]
    EnvVarRequired(String),

    /// Error when PORT cannot be parsed
    #[error("error-portal-config-2 Parsing PORT into u16 failed: {0:?}")]
    PortParsingFailed(std::num::ParseIntError),

    /// Error when version information is not available
    #[error("error-portal-config-3 One of GIT_HASH or CARGO_PKG_VERSION must be set")]
    VersionNotSet,

    /// Error when a duration string cannot be parsed
    #[error("error-portal-config-4 Failed to parse duration '{0}': {1}")]
    DurationParsingFailed(String, String),

    /// Error when a boolean string cannot be parsed
    #[error(
        "error-portal-config-5 Failed to parse boolean '{0}': expected true/false/1/0/yes/no/on/off"
    )]
    BoolParsingFailed(String),

    /// Error when a URL cannot be parsed or cannot serve as a base
    #[error("error-portal-config-6 Failed to parse URL '{0}': {1}")]
    UrlParsingFailed(String, String),

    /// Error when a numeric limit cannot be parsed
    #[error("error-portal-config-7 Failed to parse count '{0}': {1:?}")]
    CountParsingFailed(String, std::num::ParseIntError),

    /// Error when a secret is present but empty
    #[error("error-portal-config-8 {0} must not be empty")]
    EnvVarEmpty(String),
}

/// Session and upstream token errors
#[derive(Debug, Error)]
pub enum AuthError {
    /// Token signature is wrong or the payload is structurally invalid;
    /// terminal, the holder must re-authenticate
    #[error("error-portal-auth-1 Invalid token: {0}")]
    TokenInvalid(String),

    /// Token is authentic but past its expiry; triggers the refresh path
    #[error("error-portal-auth-2 Token expired")]
    TokenExpired,

    /// Refresh attempts exhausted the per-user window; terminal for this
    /// request, transient for the user
    #[error("error-portal-auth-3 Refresh rate limit exceeded for user '{0}'")]
    RateLimited(String),

    /// Transport-level failure reaching the upstream (connect, timeout)
    #[error("error-portal-auth-4 Upstream network failure: {0}")]
    Network(String),

    /// Upstream answered with a server-side failure status
    #[error("error-portal-auth-5 Upstream API failure: status {0}")]
    Api(u16),

    /// Token signing failed
    #[error("error-portal-auth-6 Token signing failed: {0}")]
    SigningFailed(String),

    /// Attempt-store failure while rate limiting a refresh
    #[error("error-portal-auth-7 Attempt store failure: {0}")]
    Store(#[from] StorageError),
}

impl AuthError {
    /// Whether the refresher may retry the upstream call after this failure.
    /// Only transport failures and upstream 5xx qualify; everything else is
    /// terminal for the attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Api(_))
    }
}

/// Refresh-attempt store errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// Error when the store connection fails
    #[error("error-portal-storage-1 Store connection failed: {0}")]
    ConnectionFailed(String),

    /// Error when a store operation fails
    #[error("error-portal-storage-2 Store operation failed: {0}")]
    OperationFailed(String),

    /// Error when the in-process lock is poisoned
    #[error("error-portal-storage-3 Failed to acquire attempt store lock: {0}")]
    LockPoisoned(String),

    /// Error when configuration names an unknown backend
    #[error("error-portal-storage-4 Unknown attempt store backend: {0}")]
    UnknownBackend(String),
}
