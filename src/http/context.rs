//! Application state and request context management.

use std::sync::Arc;

use crate::config::Config;
use crate::http::cookies::SessionStore;
use crate::notify::WebhookNotifier;
use crate::oauth::{TokenExchangeClient, TokenRefresher};
use crate::session::SessionTokenCodec;
use crate::storage::RefreshRateLimiter;

#[derive(Clone)]
pub struct AppState {
    pub http_client: reqwest::Client,
    pub config: Arc<Config>,
    /// Signs and verifies the session and user cookie payloads
    pub codec: Arc<SessionTokenCodec>,
    /// Upstream token and profile endpoints
    pub upstream: Arc<TokenExchangeClient>,
    /// Rate-limited, retrying session renewal
    pub refresher: Arc<TokenRefresher>,
    /// Cookie attribute mapping for the session and user tokens
    pub session_store: SessionStore,
    /// Operator alerts for token verification failures
    pub notifier: Arc<WebhookNotifier>,
}

impl AppState {
    pub fn new(
        config: Arc<Config>,
        http_client: reqwest::Client,
        rate_limiter: Arc<dyn RefreshRateLimiter>,
    ) -> Self {
        let codec = Arc::new(SessionTokenCodec::new(&config.session_signing_secret));
        let upstream = Arc::new(TokenExchangeClient::new(http_client.clone(), &config));
        let refresher = Arc::new(TokenRefresher::new(
            upstream.clone(),
            rate_limiter,
            codec.clone(),
            &config,
        ));
        let session_store = SessionStore::new(*config.cookie_secure.as_ref());
        let notifier = Arc::new(WebhookNotifier::new(
            http_client.clone(),
            config.error_webhook_url.clone(),
        ));

        Self {
            http_client,
            config,
            codec,
            upstream,
            refresher,
            session_store,
            notifier,
        }
    }
}
