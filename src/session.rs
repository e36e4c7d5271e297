//! Signing and verification of the compact tokens carried by the session
//! and user cookies.
//!
//! Tokens are HS256 JWTs. Verification always enforces the signature; expiry
//! enforcement is exact (zero leeway). The unverified expiry peek exists so
//! the request gate can decide whether to refresh without paying for a full
//! verification first; it is never an input to an authorization decision.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::SigningSecret;
use crate::errors::AuthError;

/// A signed compact token plus the timestamps embedded in it, kept alongside
/// so cookie expiry can be aligned without re-decoding.
#[derive(Debug, Clone)]
pub struct SignedToken {
    /// Compact JWS string
    pub token: String,
    /// `iat` claim
    pub issued_at: DateTime<Utc>,
    /// `exp` claim
    pub expires_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct SignClaims<'a, T> {
    exp: i64,
    iat: i64,
    #[serde(flatten)]
    payload: &'a T,
}

#[derive(Deserialize)]
struct ExpiryClaim {
    exp: i64,
}

/// HS256 codec for the session and user cookies
pub struct SessionTokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    header: Header,
    validation: Validation,
    validation_ignore_expiry: Validation,
}

impl SessionTokenCodec {
    pub fn new(secret: &SigningSecret) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let mut validation_ignore_expiry = Validation::new(Algorithm::HS256);
        validation_ignore_expiry.leeway = 0;
        validation_ignore_expiry.validate_exp = false;

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_ref().as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_ref().as_bytes()),
            header: Header::new(Algorithm::HS256),
            validation,
            validation_ignore_expiry,
        }
    }

    /// Sign `payload` into a compact token expiring `ttl` from now.
    pub fn sign<T: Serialize>(
        &self,
        payload: &T,
        ttl: chrono::Duration,
    ) -> Result<SignedToken, AuthError> {
        let issued_at = Utc::now();
        let expires_at = issued_at + ttl;
        let claims = SignClaims {
            exp: expires_at.timestamp(),
            iat: issued_at.timestamp(),
            payload,
        };
        let token = jsonwebtoken::encode(&self.header, &claims, &self.encoding_key)
            .map_err(|e| AuthError::SigningFailed(e.to_string()))?;
        Ok(SignedToken {
            token,
            issued_at,
            expires_at,
        })
    }

    /// Validate signature and expiry, returning the embedded payload.
    pub fn verify<T: DeserializeOwned>(&self, token: &str) -> Result<T, AuthError> {
        let data = jsonwebtoken::decode::<T>(token, &self.decoding_key, &self.validation)
            .map_err(map_decode_error)?;
        Ok(data.claims)
    }

    /// Validate the signature but ignore expiry. Refresh-path only: the
    /// refresh token must come from an authentic session even when that
    /// session is already stale.
    pub fn verify_expired<T: DeserializeOwned>(&self, token: &str) -> Result<T, AuthError> {
        let data =
            jsonwebtoken::decode::<T>(token, &self.decoding_key, &self.validation_ignore_expiry)
                .map_err(map_decode_error)?;
        Ok(data.claims)
    }

    /// Read the `exp` claim without verifying the signature. Only an input
    /// to the should-we-refresh decision; access is still gated on `verify`.
    pub fn peek_expiry(token: &str) -> Result<DateTime<Utc>, AuthError> {
        let payload = token
            .split('.')
            .nth(1)
            .ok_or_else(|| AuthError::TokenInvalid("not a compact JWS".to_string()))?;
        let decoded = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|e| AuthError::TokenInvalid(format!("payload segment: {}", e)))?;
        let claims: ExpiryClaim = serde_json::from_slice(&decoded)
            .map_err(|e| AuthError::TokenInvalid(format!("payload claims: {}", e)))?;
        DateTime::<Utc>::from_timestamp(claims.exp, 0)
            .ok_or_else(|| AuthError::TokenInvalid("expiry out of range".to_string()))
    }
}

fn map_decode_error(err: jsonwebtoken::errors::Error) -> AuthError {
    match err.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        _ => AuthError::TokenInvalid(err.to_string()),
    }
}
