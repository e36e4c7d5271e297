//! Upstream token exchange and profile retrieval.
//!
//! One outbound HTTP call per operation; no retry logic lives here. Failures
//! are classified for the caller: client errors mean the grant is dead,
//! server errors and transport failures are retryable.

use async_trait::async_trait;
use http::StatusCode;
use serde::Serialize;

use crate::config::Config;
use crate::errors::AuthError;
use crate::oauth::types::{
    GrantType, TokenPair, UpstreamProfile, UpstreamTokenResponse, UserProfile,
};

/// Exchange operations the refresher depends on, behind a trait so retry
/// behavior can be driven by scripted implementations in tests
#[async_trait]
pub trait TokenExchange: Send + Sync {
    /// Exchange a one-time authorization code for a token pair
    async fn exchange_code(&self, code: &str) -> Result<TokenPair, AuthError>;

    /// Exchange a refresh token for a new token pair
    async fn exchange_refresh_token(&self, refresh_token: &str) -> Result<TokenPair, AuthError>;
}

#[derive(Serialize)]
struct TokenRequest<'a> {
    grant_type: GrantType,
    client_id: &'a str,
    client_secret: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    redirect_uri: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    refresh_token: Option<&'a str>,
}

/// Client for the upstream identity provider's OAuth and profile endpoints
pub struct TokenExchangeClient {
    http_client: reqwest::Client,
    token_endpoint: url::Url,
    profile_endpoint: url::Url,
    redirect_uri: url::Url,
    client_id: String,
    client_secret: String,
}

impl TokenExchangeClient {
    pub fn new(http_client: reqwest::Client, config: &Config) -> Self {
        Self {
            http_client,
            token_endpoint: config.upstream_base.token_endpoint(),
            profile_endpoint: config.upstream_base.profile_endpoint(),
            redirect_uri: config.public_base_url.callback_endpoint(),
            client_id: config.oauth_client_id.clone(),
            client_secret: config.oauth_client_secret.clone(),
        }
    }

    async fn request_token(
        &self,
        request: &TokenRequest<'_>,
        fallback_refresh_token: Option<&str>,
    ) -> Result<TokenPair, AuthError> {
        let response = self
            .http_client
            .post(self.token_endpoint.clone())
            .json(request)
            .send()
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;

        let status = response.status();
        if status.is_client_error() {
            tracing::debug!(status = %status, "token endpoint rejected the grant");
            return Err(AuthError::TokenInvalid(format!(
                "token endpoint returned {}",
                status
            )));
        }
        if !status.is_success() {
            return Err(AuthError::Api(status.as_u16()));
        }

        let body: UpstreamTokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::TokenInvalid(format!("token response body: {}", e)))?;
        normalize_token_response(body, fallback_refresh_token)
    }

    /// Fetch the authenticated identity from the profile endpoint.
    pub async fn fetch_profile(&self, access_token: &str) -> Result<UserProfile, AuthError> {
        let response = self
            .http_client
            .get(self.profile_endpoint.clone())
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(AuthError::TokenInvalid(format!(
                "profile endpoint returned {}",
                status
            )));
        }
        if !status.is_success() {
            return Err(AuthError::Api(status.as_u16()));
        }

        let profile: UpstreamProfile = response
            .json()
            .await
            .map_err(|e| AuthError::TokenInvalid(format!("profile response body: {}", e)))?;
        Ok(profile.into())
    }
}

#[async_trait]
impl TokenExchange for TokenExchangeClient {
    async fn exchange_code(&self, code: &str) -> Result<TokenPair, AuthError> {
        let request = TokenRequest {
            grant_type: GrantType::AuthorizationCode,
            client_id: &self.client_id,
            client_secret: &self.client_secret,
            code: Some(code),
            redirect_uri: Some(self.redirect_uri.as_str()),
            refresh_token: None,
        };
        self.request_token(&request, None).await
    }

    async fn exchange_refresh_token(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        let request = TokenRequest {
            grant_type: GrantType::RefreshToken,
            client_id: &self.client_id,
            client_secret: &self.client_secret,
            code: None,
            redirect_uri: None,
            refresh_token: Some(refresh_token),
        };
        self.request_token(&request, Some(refresh_token)).await
    }
}

/// Providers that do not rotate refresh tokens omit the field; the caller's
/// token is carried forward so the session can keep renewing.
fn normalize_token_response(
    body: UpstreamTokenResponse,
    fallback_refresh_token: Option<&str>,
) -> Result<TokenPair, AuthError> {
    let access_token = body
        .access_token
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AuthError::TokenInvalid("token response missing access_token".to_string()))?;
    let refresh_token = body
        .refresh_token
        .filter(|token| !token.is_empty())
        .or_else(|| fallback_refresh_token.map(|token| token.to_string()))
        .ok_or_else(|| {
            AuthError::TokenInvalid("token response missing refresh_token".to_string())
        })?;
    let expires_in = body
        .expires_in
        .ok_or_else(|| AuthError::TokenInvalid("token response missing expires_in".to_string()))?;

    Ok(TokenPair {
        access_token,
        refresh_token,
        expires_in,
    })
}
