//! Handles POST /auth/refresh - Forces a session renewal

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum_extra::extract::cookie::CookieJar;
use serde_json::{Value, json};

use super::context::AppState;
use crate::errors::AuthError;
use crate::http::cookies::SESSION_COOKIE;
use crate::oauth::types::{SessionClaims, UserProfile};

/// Renew the session immediately, regardless of how close to expiry it is.
/// Programmatic callers use this to obtain a fresh access token; the rotated
/// session cookie rides along on the response.
pub async fn handle_auth_refresh(
    State(state): State<AppState>,
    jar: CookieJar,
) -> std::result::Result<(CookieJar, Json<Value>), (StatusCode, Json<Value>)> {
    let cookies = state.session_store.read(&jar);
    let (Some(session_token), Some(user_token)) = (cookies.session, cookies.user) else {
        return Err(unauthorized());
    };

    let profile: UserProfile = state
        .codec
        .verify(&user_token)
        .map_err(|err| {
            tracing::debug!(error = %err, "refresh rejected: user token failed verification");
            unauthorized()
        })?;

    let claims = match state.codec.verify::<SessionClaims>(&session_token) {
        Ok(claims) => claims,
        Err(AuthError::TokenExpired) => state
            .codec
            .verify_expired::<SessionClaims>(&session_token)
            .map_err(|err| {
                tracing::debug!(error = %err, "refresh rejected: session token failed verification");
                unauthorized()
            })?,
        Err(err) => {
            tracing::debug!(error = %err, "refresh rejected: session token failed verification");
            return Err(unauthorized());
        }
    };

    match state
        .refresher
        .refresh(&profile.login, &claims.refresh_token)
        .await
    {
        Ok(renewed) => {
            let body = json!({
                "accessToken": renewed.pair.access_token,
                "expiresAt": renewed.session_token.expires_at,
            });
            let jar = jar.add(
                state
                    .session_store
                    .write_token(SESSION_COOKIE, &renewed.session_token),
            );
            Ok((jar, Json(body)))
        }
        Err(err @ (AuthError::Store(_) | AuthError::SigningFailed(_))) => {
            tracing::error!(user = %profile.login, error = %err, "forced refresh hit an internal failure");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Internal Server Error" })),
            ))
        }
        Err(err) => {
            tracing::warn!(user = %profile.login, error = %err, "forced refresh failed");
            Err(unauthorized())
        }
    }
}

fn unauthorized() -> (StatusCode, Json<Value>) {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "error": "Unauthorized" })),
    )
}
