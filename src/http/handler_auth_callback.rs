//! Handles GET /auth/callback - Completes the authorization code exchange

use axum::extract::{Query, State};
use axum::response::Redirect;
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;

use super::context::AppState;
use crate::http::cookies::{SESSION_COOKIE, USER_COOKIE};
use crate::oauth::TokenExchange;
use crate::oauth::types::SessionClaims;

/// Query parameters delivered by the upstream consent redirect
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub error: Option<String>,
}

/// Exchange the one-time code, fetch the identity, sign both cookies, and
/// land the user on the index page. Every failure restarts the flow at
/// /auth/login without setting cookies; upstream error bodies are never
/// echoed to the client.
pub async fn handle_auth_callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
    jar: CookieJar,
) -> (CookieJar, Redirect) {
    if let Some(error) = query.error {
        tracing::debug!(error = %error, "authorization denied upstream");
        return (jar, Redirect::to("/auth/login"));
    }
    let Some(code) = query.code else {
        tracing::debug!("callback missing authorization code");
        return (jar, Redirect::to("/auth/login"));
    };

    let pair = match state.upstream.exchange_code(&code).await {
        Ok(pair) => pair,
        Err(err) => {
            tracing::warn!(error = %err, "authorization code exchange failed");
            return (jar, Redirect::to("/auth/login"));
        }
    };

    let profile = match state.upstream.fetch_profile(&pair.access_token).await {
        Ok(profile) => profile,
        Err(err) => {
            tracing::warn!(error = %err, "profile fetch failed after code exchange");
            return (jar, Redirect::to("/auth/login"));
        }
    };

    let session = match state.codec.sign(
        &SessionClaims::new(&pair),
        chrono::Duration::seconds(pair.expires_in),
    ) {
        Ok(token) => token,
        Err(err) => {
            tracing::error!(error = %err, "failed to sign session token");
            return (jar, Redirect::to("/auth/login"));
        }
    };
    let user = match state
        .codec
        .sign(&profile, *state.config.user_token_ttl.as_ref())
    {
        Ok(token) => token,
        Err(err) => {
            tracing::error!(error = %err, "failed to sign user token");
            return (jar, Redirect::to("/auth/login"));
        }
    };

    tracing::info!(user = %profile.login, "authenticated");
    let jar = jar
        .add(state.session_store.write_token(SESSION_COOKIE, &session))
        .add(state.session_store.write_token(USER_COOKIE, &user));
    (jar, Redirect::to("/"))
}
