//! Environment-based configuration types for the portal gate runtime settings.

use anyhow::Result;
use std::time::Duration;

use crate::errors::ConfigError;

/// Path of the OAuth callback route, joined onto the public base URL to form
/// the redirect URI registered with the upstream identity provider.
pub const AUTH_CALLBACK_PATH: &str = "/auth/callback";

/// HTTP server port configuration
#[derive(Clone)]
pub struct HttpPort(u16);

/// HTTP client timeout configuration
#[derive(Clone)]
pub struct HttpClientTimeout(Duration);

/// Public base URL this service is reachable at
#[derive(Clone)]
pub struct PublicBaseUrl(url::Url);

/// Base URL of the upstream identity provider
#[derive(Clone)]
pub struct UpstreamBase(url::Url);

/// Secret used to sign and verify session tokens
#[derive(Clone)]
pub struct SigningSecret(String);

/// Lifetime of the signed user-profile token
#[derive(Clone)]
pub struct UserTokenTtl(chrono::Duration);

/// Lead time before session expiry at which a proactive refresh is attempted
#[derive(Clone)]
pub struct NearExpiryThreshold(chrono::Duration);

/// Maximum refresh attempts per user within one window
#[derive(Clone)]
pub struct RefreshMaxAttempts(u32);

/// Length of the sliding refresh-attempt window
#[derive(Clone)]
pub struct RefreshWindow(chrono::Duration);

/// Maximum retries after a retryable refresh failure
#[derive(Clone)]
pub struct RefreshMaxRetries(u32);

/// Base delay for exponential refresh backoff
#[derive(Clone)]
pub struct RefreshBackoffBase(Duration);

/// Whether cookies carry the `Secure` attribute
#[derive(Clone)]
pub struct CookieSecure(bool);

/// Main application configuration
#[derive(Clone)]
pub struct Config {
    pub version: String,
    pub http_port: HttpPort,
    pub http_static_path: String,
    pub public_base_url: PublicBaseUrl,
    pub upstream_base: UpstreamBase,
    pub oauth_client_id: String,
    pub oauth_client_secret: String,
    pub oauth_scope: String,
    pub session_signing_secret: SigningSecret,
    pub user_agent: String,
    pub http_client_timeout: HttpClientTimeout,
    pub user_token_ttl: UserTokenTtl,
    pub near_expiry_threshold: NearExpiryThreshold,
    pub refresh_max_attempts: RefreshMaxAttempts,
    pub refresh_window: RefreshWindow,
    pub refresh_max_retries: RefreshMaxRetries,
    pub refresh_backoff_base: RefreshBackoffBase,
    pub cookie_secure: CookieSecure,
    pub attempt_store_backend: String,
    pub redis_url: Option<String>,
    pub error_webhook_url: Option<String>,
}

impl Config {
    /// Create a new configuration from environment variables
    pub fn new() -> Result<Self> {
        let default_user_agent = format!("portal-gate/{}", version()?);
        let http_port: HttpPort = default_env("HTTP_PORT", "8080").try_into()?;
        let http_static_path = optional_env("HTTP_STATIC_PATH")
            .unwrap_or_else(|| format!("{}/static", env!("CARGO_MANIFEST_DIR")));
        let public_base_url: PublicBaseUrl = require_env("PUBLIC_BASE_URL")?.try_into()?;
        let upstream_base: UpstreamBase =
            default_env("UPSTREAM_BASE", "https://api.intra.42.fr").try_into()?;
        let oauth_client_id = require_env("OAUTH_CLIENT_ID")?;
        let oauth_client_secret = require_env("OAUTH_CLIENT_SECRET")?;
        let oauth_scope = default_env("OAUTH_SCOPE", "public");
        let session_signing_secret: SigningSecret =
            require_env("SESSION_SIGNING_SECRET")?.try_into()?;
        let user_agent = default_env("USER_AGENT", &default_user_agent);
        let http_client_timeout: HttpClientTimeout =
            default_env("HTTP_CLIENT_TIMEOUT", "10s").try_into()?;
        let user_token_ttl: UserTokenTtl = default_env("USER_TOKEN_TTL", "24h").try_into()?;
        let near_expiry_threshold: NearExpiryThreshold =
            default_env("NEAR_EXPIRY_THRESHOLD", "5m").try_into()?;
        let refresh_max_attempts: RefreshMaxAttempts =
            default_env("REFRESH_MAX_ATTEMPTS", "5").try_into()?;
        let refresh_window: RefreshWindow = default_env("REFRESH_WINDOW", "60s").try_into()?;
        let refresh_max_retries: RefreshMaxRetries =
            default_env("REFRESH_MAX_RETRIES", "2").try_into()?;
        let refresh_backoff_base: RefreshBackoffBase =
            default_env("REFRESH_BACKOFF_BASE", "500ms").try_into()?;
        let cookie_secure: CookieSecure = default_env("COOKIE_SECURE", "true").try_into()?;
        let attempt_store_backend = default_env("ATTEMPT_STORE_BACKEND", "memory");
        let redis_url = optional_env("REDIS_URL");
        let error_webhook_url = optional_env("ERROR_WEBHOOK_URL");

        Ok(Self {
            version: version()?,
            http_port,
            http_static_path,
            public_base_url,
            upstream_base,
            oauth_client_id,
            oauth_client_secret,
            oauth_scope,
            session_signing_secret,
            user_agent,
            http_client_timeout,
            user_token_ttl,
            near_expiry_threshold,
            refresh_max_attempts,
            refresh_window,
            refresh_max_retries,
            refresh_backoff_base,
            cookie_secure,
            attempt_store_backend,
            redis_url,
            error_webhook_url,
        })
    }
}

/// Get application version from build environment
pub fn version() -> Result<String> {
    option_env!("GIT_HASH")
        .or(option_env!("CARGO_PKG_VERSION"))
        .map(|val| val.to_string())
        .ok_or(ConfigError::VersionNotSet.into())
}

fn require_env(name: &str) -> Result<String> {
    std::env::var(name).map_err(|_| ConfigError::EnvVarRequired(name.to_string()).into())
}

pub(crate) fn optional_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn default_env(name: &str, default_value: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default_value.to_string())
}

impl TryFrom<String> for HttpPort {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value.is_empty() {
            Ok(Self(8080))
        } else {
            value
                .parse::<u16>()
                .map(Self)
                .map_err(|err| ConfigError::PortParsingFailed(err).into())
        }
    }
}

impl AsRef<u16> for HttpPort {
    fn as_ref(&self) -> &u16 {
        &self.0
    }
}

impl TryFrom<String> for HttpClientTimeout {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value.is_empty() {
            return Ok(Self(Duration::from_secs(10)));
        }

        let duration = duration_str::parse(&value)
            .map_err(|e| ConfigError::DurationParsingFailed(value, e.to_string()))?;
        Ok(Self(duration))
    }
}

impl AsRef<Duration> for HttpClientTimeout {
    fn as_ref(&self) -> &Duration {
        &self.0
    }
}

fn parse_base_url(value: String) -> Result<url::Url, ConfigError> {
    let parsed = url::Url::parse(&value)
        .map_err(|e| ConfigError::UrlParsingFailed(value.clone(), e.to_string()))?;
    if parsed.cannot_be_a_base() {
        return Err(ConfigError::UrlParsingFailed(
            value,
            "URL cannot serve as a base".to_string(),
        ));
    }
    Ok(parsed)
}

impl TryFrom<String> for PublicBaseUrl {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Ok(Self(parse_base_url(value)?))
    }
}

impl AsRef<url::Url> for PublicBaseUrl {
    fn as_ref(&self) -> &url::Url {
        &self.0
    }
}

impl PublicBaseUrl {
    /// Absolute redirect URI for the upstream authorization request
    pub fn callback_endpoint(&self) -> url::Url {
        let mut url = self.0.clone();
        url.set_path(AUTH_CALLBACK_PATH);
        url
    }
}

impl TryFrom<String> for UpstreamBase {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Ok(Self(parse_base_url(value)?))
    }
}

impl AsRef<url::Url> for UpstreamBase {
    fn as_ref(&self) -> &url::Url {
        &self.0
    }
}

impl UpstreamBase {
    /// Upstream consent page for the authorization code grant
    pub fn authorize_endpoint(&self) -> url::Url {
        let mut url = self.0.clone();
        url.set_path("/oauth/authorize");
        url
    }

    /// Upstream token endpoint for both grant types
    pub fn token_endpoint(&self) -> url::Url {
        let mut url = self.0.clone();
        url.set_path("/oauth/token");
        url
    }

    /// Upstream profile endpoint for the authenticated identity
    pub fn profile_endpoint(&self) -> url::Url {
        let mut url = self.0.clone();
        url.set_path("/v2/me");
        url
    }
}

impl TryFrom<String> for SigningSecret {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value.is_empty() {
            return Err(ConfigError::EnvVarEmpty(
                "SESSION_SIGNING_SECRET".to_string(),
            ));
        }
        Ok(Self(value))
    }
}

impl AsRef<String> for SigningSecret {
    fn as_ref(&self) -> &String {
        &self.0
    }
}

impl TryFrom<String> for UserTokenTtl {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let duration = duration_str::parse(&value)
            .map_err(|e| ConfigError::DurationParsingFailed(value, e.to_string()))?;
        Ok(Self(chrono::Duration::from_std(duration)?))
    }
}

impl AsRef<chrono::Duration> for UserTokenTtl {
    fn as_ref(&self) -> &chrono::Duration {
        &self.0
    }
}

impl TryFrom<String> for NearExpiryThreshold {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let duration = duration_str::parse(&value)
            .map_err(|e| ConfigError::DurationParsingFailed(value, e.to_string()))?;
        Ok(Self(chrono::Duration::from_std(duration)?))
    }
}

impl AsRef<chrono::Duration> for NearExpiryThreshold {
    fn as_ref(&self) -> &chrono::Duration {
        &self.0
    }
}

impl TryFrom<String> for RefreshMaxAttempts {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value
            .parse::<u32>()
            .map(Self)
            .map_err(|err| ConfigError::CountParsingFailed(value, err))
    }
}

impl AsRef<u32> for RefreshMaxAttempts {
    fn as_ref(&self) -> &u32 {
        &self.0
    }
}

impl TryFrom<String> for RefreshWindow {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let duration = duration_str::parse(&value)
            .map_err(|e| ConfigError::DurationParsingFailed(value, e.to_string()))?;
        Ok(Self(chrono::Duration::from_std(duration)?))
    }
}

impl AsRef<chrono::Duration> for RefreshWindow {
    fn as_ref(&self) -> &chrono::Duration {
        &self.0
    }
}

impl TryFrom<String> for RefreshMaxRetries {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value
            .parse::<u32>()
            .map(Self)
            .map_err(|err| ConfigError::CountParsingFailed(value, err))
    }
}

impl AsRef<u32> for RefreshMaxRetries {
    fn as_ref(&self) -> &u32 {
        &self.0
    }
}

impl TryFrom<String> for RefreshBackoffBase {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let duration = duration_str::parse(&value)
            .map_err(|e| ConfigError::DurationParsingFailed(value, e.to_string()))?;
        Ok(Self(duration))
    }
}

impl AsRef<Duration> for RefreshBackoffBase {
    fn as_ref(&self) -> &Duration {
        &self.0
    }
}

impl TryFrom<String> for CookieSecure {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(Self(true)),
            "false" | "0" | "no" | "off" => Ok(Self(false)),
            _ => Err(ConfigError::BoolParsingFailed(value).into()),
        }
    }
}

impl AsRef<bool> for CookieSecure {
    fn as_ref(&self) -> &bool {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_base_url_rejects_relative() {
        let relative = PublicBaseUrl::try_from("/portal".to_string());
        assert!(relative.is_err(), "relative URL should not be accepted");

        let absolute = PublicBaseUrl::try_from("https://portal.example.com".to_string())
            .expect("absolute URL should parse");
        assert_eq!(
            absolute.callback_endpoint().as_str(),
            "https://portal.example.com/auth/callback"
        );
    }

    #[test]
    fn test_upstream_endpoints() {
        let upstream = UpstreamBase::try_from("https://api.intra.42.fr".to_string()).unwrap();
        assert_eq!(
            upstream.token_endpoint().as_str(),
            "https://api.intra.42.fr/oauth/token"
        );
        assert_eq!(
            upstream.authorize_endpoint().as_str(),
            "https://api.intra.42.fr/oauth/authorize"
        );
        assert_eq!(
            upstream.profile_endpoint().as_str(),
            "https://api.intra.42.fr/v2/me"
        );
    }

    #[test]
    fn test_duration_newtypes_accept_suffixed_values() {
        let threshold = NearExpiryThreshold::try_from("5m".to_string()).unwrap();
        assert_eq!(*threshold.as_ref(), chrono::Duration::minutes(5));

        let window = RefreshWindow::try_from("60s".to_string()).unwrap();
        assert_eq!(*window.as_ref(), chrono::Duration::seconds(60));

        let backoff = RefreshBackoffBase::try_from("500ms".to_string()).unwrap();
        assert_eq!(*backoff.as_ref(), Duration::from_millis(500));

        assert!(RefreshWindow::try_from("sixty".to_string()).is_err());
    }

    #[test]
    fn test_signing_secret_must_not_be_empty() {
        assert!(SigningSecret::try_from(String::new()).is_err());
        assert!(SigningSecret::try_from("s3cr3t".to_string()).is_ok());
    }

    #[test]
    fn test_cookie_secure_parsing() {
        assert!(*CookieSecure::try_from("true".to_string()).unwrap().as_ref());
        assert!(!*CookieSecure::try_from("off".to_string()).unwrap().as_ref());
        assert!(CookieSecure::try_from("maybe".to_string()).is_err());
    }
}
