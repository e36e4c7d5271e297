//! Token and identity types exchanged with the upstream provider and
//! embedded in signed cookies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Grant types accepted by the upstream token endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantType {
    AuthorizationCode,
    RefreshToken,
}

/// Normalized access/refresh pair from the upstream token endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct TokenPair {
    /// Bearer credential for the upstream API
    pub access_token: String,
    /// Credential used to renew the access token without re-consent
    pub refresh_token: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
}

/// Raw token endpoint response; the exchange client validates it into a
/// `TokenPair` before anything downstream sees it
#[derive(Debug, Deserialize)]
pub(crate) struct UpstreamTokenResponse {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub expires_in: Option<i64>,
}

/// Claims carried by the `session` cookie. Expiry lives in the token's own
/// `exp` claim; wire names stay camelCase because browser-side consumers
/// read the same payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionClaims {
    pub access_token: String,
    pub refresh_token: String,
}

impl SessionClaims {
    pub fn new(pair: &TokenPair) -> Self {
        Self {
            access_token: pair.access_token.clone(),
            refresh_token: pair.refresh_token.clone(),
        }
    }
}

/// Identity snapshot captured at authentication time, signed into the
/// `user` cookie separately from the session so UI layers can read it
/// without seeing the access token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: i64,
    pub login: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Raw profile endpoint response shape
#[derive(Debug, Deserialize)]
pub(crate) struct UpstreamProfile {
    pub id: i64,
    pub login: String,
    pub displayname: String,
    pub image: Option<UpstreamProfileImage>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UpstreamProfileImage {
    pub link: Option<String>,
}

impl From<UpstreamProfile> for UserProfile {
    fn from(raw: UpstreamProfile) -> Self {
        Self {
            id: raw.id,
            login: raw.login,
            display_name: raw.displayname,
            avatar_url: raw.image.and_then(|image| image.link),
            created_at: raw.created_at,
        }
    }
}
