//! Session renewal against the upstream token endpoint.
//!
//! The refresher is the only component that spends refresh attempts: it
//! consults the rate limiter before touching the network, retries transient
//! upstream failures with exponential backoff, and re-signs the session so
//! its expiry tracks the new access token.

use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::errors::AuthError;
use crate::oauth::client::TokenExchange;
use crate::oauth::types::{SessionClaims, TokenPair};
use crate::session::{SessionTokenCodec, SignedToken};
use crate::storage::RefreshRateLimiter;

/// Outcome of a successful refresh: a freshly signed session cookie value
/// plus the upstream pair it encodes
#[derive(Debug)]
pub struct RefreshedSession {
    pub session_token: SignedToken,
    pub pair: TokenPair,
}

pub struct TokenRefresher {
    exchange: Arc<dyn TokenExchange>,
    rate_limiter: Arc<dyn RefreshRateLimiter>,
    codec: Arc<SessionTokenCodec>,
    max_retries: u32,
    backoff_base: Duration,
}

impl TokenRefresher {
    pub fn new(
        exchange: Arc<dyn TokenExchange>,
        rate_limiter: Arc<dyn RefreshRateLimiter>,
        codec: Arc<SessionTokenCodec>,
        config: &Config,
    ) -> Self {
        Self {
            exchange,
            rate_limiter,
            codec,
            max_retries: *config.refresh_max_retries.as_ref(),
            backoff_base: *config.refresh_backoff_base.as_ref(),
        }
    }

    /// Renew the session keyed by `user_key`.
    ///
    /// Rate limit denials and invalid grants are terminal; network and 5xx
    /// failures are retried up to `max_retries` times with delays of
    /// `backoff_base * 2^attempt`.
    pub async fn refresh(
        &self,
        user_key: &str,
        refresh_token: &str,
    ) -> Result<RefreshedSession, AuthError> {
        if !self.rate_limiter.allow(user_key).await? {
            tracing::warn!(user = user_key, "refresh denied by rate limiter");
            return Err(AuthError::RateLimited(user_key.to_string()));
        }

        let mut attempt: u32 = 0;
        let pair = loop {
            match self.exchange.exchange_refresh_token(refresh_token).await {
                Ok(pair) => break pair,
                Err(err) if err.is_retryable() && attempt < self.max_retries => {
                    // Saturates rather than overflowing at extreme retry limits
                    let delay = self
                        .backoff_base
                        .saturating_mul(2u32.checked_pow(attempt).unwrap_or(u32::MAX));
                    tracing::debug!(
                        user = user_key,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "retrying token refresh after transient upstream failure"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    tracing::warn!(user = user_key, error = %err, "token refresh failed");
                    return Err(err);
                }
            }
        };

        let session_token = self.codec.sign(
            &SessionClaims::new(&pair),
            chrono::Duration::seconds(pair.expires_in),
        )?;
        tracing::debug!(
            user = user_key,
            expires_at = %session_token.expires_at,
            "session renewed"
        );
        Ok(RefreshedSession {
            session_token,
            pair,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RefreshBackoffBase, RefreshMaxRetries, SigningSecret};
    use crate::storage;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct ScriptedExchange {
        responses: Mutex<VecDeque<Result<TokenPair, AuthError>>>,
        calls: AtomicU32,
    }

    impl ScriptedExchange {
        fn new(responses: Vec<Result<TokenPair, AuthError>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                calls: AtomicU32::new(0),
            })
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TokenExchange for ScriptedExchange {
        async fn exchange_code(&self, _code: &str) -> Result<TokenPair, AuthError> {
            unreachable!("refresher only exchanges refresh tokens")
        }

        async fn exchange_refresh_token(
            &self,
            _refresh_token: &str,
        ) -> Result<TokenPair, AuthError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .expect("script exhausted")
        }
    }

    struct StaticLimiter(bool);

    #[async_trait]
    impl RefreshRateLimiter for StaticLimiter {
        async fn allow(&self, _user_key: &str) -> storage::Result<bool> {
            Ok(self.0)
        }
    }

    fn fresh_pair() -> TokenPair {
        TokenPair {
            access_token: "at-new".to_string(),
            refresh_token: "rt-new".to_string(),
            expires_in: 7200,
        }
    }

    fn test_refresher(
        exchange: Arc<ScriptedExchange>,
        allow: bool,
        max_retries: &str,
        backoff_base: &str,
    ) -> TokenRefresher {
        let codec = Arc::new(SessionTokenCodec::new(
            &SigningSecret::try_from("refresher-test-secret".to_string()).unwrap(),
        ));
        TokenRefresher {
            exchange,
            rate_limiter: Arc::new(StaticLimiter(allow)),
            codec,
            max_retries: *RefreshMaxRetries::try_from(max_retries.to_string())
                .unwrap()
                .as_ref(),
            backoff_base: *RefreshBackoffBase::try_from(backoff_base.to_string())
                .unwrap()
                .as_ref(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_transient_failures_with_exponential_backoff() {
        let exchange = ScriptedExchange::new(vec![
            Err(AuthError::Network("connection reset".to_string())),
            Err(AuthError::Api(503)),
            Ok(fresh_pair()),
        ]);
        let refresher = test_refresher(exchange.clone(), true, "2", "500ms");

        let started = tokio::time::Instant::now();
        let renewed = refresher.refresh("mruiz", "rt-old").await.unwrap();

        assert_eq!(exchange.calls(), 3);
        // 500ms after the first failure, 1000ms after the second
        assert_eq!(started.elapsed(), Duration::from_millis(1500));
        assert_eq!(renewed.pair, fresh_pair());
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_saturates_at_extreme_retry_limits() {
        // Enough failures to push the exponent past what u32 can hold; the
        // delay must cap out instead of panicking or wrapping to near zero.
        let mut responses: Vec<Result<TokenPair, AuthError>> =
            (0..35).map(|_| Err(AuthError::Api(503))).collect();
        responses.push(Ok(fresh_pair()));
        let exchange = ScriptedExchange::new(responses);
        let refresher = test_refresher(exchange.clone(), true, "35", "1ms");

        let renewed = refresher.refresh("mruiz", "rt-old").await.unwrap();

        assert_eq!(exchange.calls(), 36);
        assert_eq!(renewed.pair, fresh_pair());
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_retries() {
        let exchange = ScriptedExchange::new(vec![
            Err(AuthError::Network("reset".to_string())),
            Err(AuthError::Network("reset".to_string())),
            Err(AuthError::Network("reset".to_string())),
        ]);
        let refresher = test_refresher(exchange.clone(), true, "2", "500ms");

        let err = refresher.refresh("mruiz", "rt-old").await.unwrap_err();
        assert!(matches!(err, AuthError::Network(_)));
        assert_eq!(exchange.calls(), 3);
    }

    #[tokio::test]
    async fn test_invalid_grant_is_not_retried() {
        let exchange = ScriptedExchange::new(vec![Err(AuthError::TokenInvalid(
            "invalid_grant".to_string(),
        ))]);
        let refresher = test_refresher(exchange.clone(), true, "2", "500ms");

        let err = refresher.refresh("mruiz", "rt-revoked").await.unwrap_err();
        assert!(matches!(err, AuthError::TokenInvalid(_)));
        assert_eq!(exchange.calls(), 1);
    }

    #[tokio::test]
    async fn test_rate_limit_denial_skips_upstream() {
        let exchange = ScriptedExchange::new(vec![Ok(fresh_pair())]);
        let refresher = test_refresher(exchange.clone(), false, "2", "500ms");

        let err = refresher.refresh("mruiz", "rt-old").await.unwrap_err();
        assert!(matches!(err, AuthError::RateLimited(_)));
        assert_eq!(exchange.calls(), 0);
    }

    #[tokio::test]
    async fn test_renewed_session_carries_upstream_pair_and_expiry() {
        let exchange = ScriptedExchange::new(vec![Ok(fresh_pair())]);
        let refresher = test_refresher(exchange.clone(), true, "2", "500ms");

        let renewed = refresher.refresh("mruiz", "rt-old").await.unwrap();

        let codec = SessionTokenCodec::new(
            &SigningSecret::try_from("refresher-test-secret".to_string()).unwrap(),
        );
        let claims: SessionClaims = codec.verify(&renewed.session_token.token).unwrap();
        assert_eq!(claims.access_token, "at-new");
        assert_eq!(claims.refresh_token, "rt-new");

        let lifetime = renewed.session_token.expires_at - renewed.session_token.issued_at;
        assert_eq!(lifetime, chrono::Duration::seconds(7200));
    }
}
