//! Session gate middleware.
//!
//! Every request passes through here exactly once. Public paths are forwarded
//! untouched; everything else must present verifiable session and user
//! cookies. Sessions at or past the near-expiry threshold are renewed in-line
//! and the rotated cookies ride out on the response. No other component may
//! grant access.

use axum::extract::{FromRequestParts, Request, State};
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use chrono::Utc;
use serde_json::json;

use crate::errors::AuthError;
use crate::http::context::AppState;
use crate::http::cookies::{SESSION_COOKIE, USER_COOKIE};
use crate::oauth::types::{SessionClaims, UserProfile};
use crate::session::SessionTokenCodec;

/// Verified identity attached to forwarded requests.
///
/// Downstream handlers take this as an extractor; it is only present on
/// requests the gate let through.
#[derive(Clone)]
pub struct CurrentUser {
    pub profile: UserProfile,
    pub access_token: String,
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or_else(|| unauthorized_json().into_response())
    }
}

/// Paths served without a session: the auth flow itself, static assets, and
/// the usual browser furniture. Prefixes match on segment boundaries only;
/// /authority is not /auth.
fn is_public_path(path: &str) -> bool {
    path == "/auth"
        || path.starts_with("/auth/")
        || path == "/static"
        || path.starts_with("/static/")
        || path == "/favicon.ico"
        || path == "/manifest.json"
        || path.ends_with(".png")
        || path.ends_with(".ico")
}

pub async fn session_gate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    if is_public_path(&path) {
        return next.run(request).await;
    }

    let jar = CookieJar::from_headers(request.headers());
    let cookies = state.session_store.read(&jar);
    let (Some(session_token), Some(user_token)) = (cookies.session, cookies.user) else {
        tracing::debug!(path = %path, "no session cookies presented");
        return unauthenticated(&state, &path);
    };

    // The user token authenticates the identity that keys the rate limiter
    // and travels to downstream handlers.
    let profile = match state.codec.verify::<UserProfile>(&user_token) {
        Ok(profile) => profile,
        Err(err) => return reject_token(&state, &path, "user", err),
    };
    let Ok(user_expires_at) = SessionTokenCodec::peek_expiry(&user_token) else {
        return unauthenticated(&state, &path);
    };

    // Unverified peek: only decides whether to renew. Authorization still
    // requires a signature check on whichever branch follows.
    let session_expires_at = match SessionTokenCodec::peek_expiry(&session_token) {
        Ok(expires_at) => expires_at,
        Err(err) => return reject_token(&state, &path, "session", err),
    };

    let remaining = session_expires_at - Utc::now();
    if remaining > *state.config.near_expiry_threshold.as_ref() {
        let claims = match state.codec.verify::<SessionClaims>(&session_token) {
            Ok(claims) => claims,
            Err(err) => return reject_token(&state, &path, "session", err),
        };

        request.extensions_mut().insert(CurrentUser {
            profile,
            access_token: claims.access_token,
        });
        let mut response = next.run(request).await;
        append_cookie(
            &mut response,
            state
                .session_store
                .write(SESSION_COOKIE, &session_token, session_expires_at),
        );
        append_cookie(
            &mut response,
            state
                .session_store
                .write(USER_COOKIE, &user_token, user_expires_at),
        );
        return response;
    }

    // Renewal path: the refresh token comes out of the authentic session,
    // even when it is already past its expiry.
    let claims = match state.codec.verify::<SessionClaims>(&session_token) {
        Ok(claims) => claims,
        Err(AuthError::TokenExpired) => {
            match state.codec.verify_expired::<SessionClaims>(&session_token) {
                Ok(claims) => claims,
                Err(err) => return reject_token(&state, &path, "session", err),
            }
        }
        Err(err) => return reject_token(&state, &path, "session", err),
    };

    match state
        .refresher
        .refresh(&profile.login, &claims.refresh_token)
        .await
    {
        Ok(renewed) => {
            tracing::debug!(user = %profile.login, path = %path, "session renewed in-flight");
            request.extensions_mut().insert(CurrentUser {
                profile,
                access_token: renewed.pair.access_token.clone(),
            });
            let mut response = next.run(request).await;
            append_cookie(
                &mut response,
                state
                    .session_store
                    .write_token(SESSION_COOKIE, &renewed.session_token),
            );
            append_cookie(
                &mut response,
                state
                    .session_store
                    .write(USER_COOKIE, &user_token, user_expires_at),
            );
            response
        }
        Err(err @ (AuthError::Store(_) | AuthError::SigningFailed(_))) => {
            tracing::error!(user = %profile.login, error = %err, "session renewal hit an internal failure");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                axum::Json(json!({ "error": "Internal Server Error" })),
            )
                .into_response()
        }
        Err(err) => {
            tracing::warn!(user = %profile.login, error = %err, "session renewal failed, forcing re-authentication");
            unauthenticated(&state, &path)
        }
    }
}

/// Log a verification failure and reject. Tampered or structurally invalid
/// tokens additionally raise an operator alert; plain expiry does not.
fn reject_token(state: &AppState, path: &str, which: &str, err: AuthError) -> Response {
    match err {
        AuthError::TokenExpired => {
            tracing::debug!(path = %path, token = which, "token expired");
        }
        err => {
            tracing::warn!(path = %path, token = which, error = %err, "token verification failed");
            state
                .notifier
                .notify_token_failure(&format!("{} token verification failed: {}", which, err));
        }
    }
    unauthenticated(state, path)
}

/// Page routes are redirected to the login flow, API routes get a JSON 401.
/// Both clear whatever cookies were presented.
fn unauthenticated(state: &AppState, path: &str) -> Response {
    let mut response = if path.starts_with("/api/") {
        unauthorized_json().into_response()
    } else {
        Redirect::to("/auth/login").into_response()
    };
    append_cookie(&mut response, state.session_store.clear(SESSION_COOKIE));
    append_cookie(&mut response, state.session_store.clear(USER_COOKIE));
    response
}

fn unauthorized_json() -> (StatusCode, axum::Json<serde_json::Value>) {
    (
        StatusCode::UNAUTHORIZED,
        axum::Json(json!({ "error": "Unauthorized" })),
    )
}

fn append_cookie(response: &mut Response, cookie: Cookie<'static>) {
    match cookie.to_string().parse() {
        Ok(value) => {
            response
                .headers_mut()
                .append(axum::http::header::SET_COOKIE, value);
        }
        Err(err) => {
            tracing::error!(error = %err, name = cookie.name(), "failed to encode cookie header");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    #[test]
    fn test_public_path_predicate() {
        assert!(is_public_path("/auth/login"));
        assert!(is_public_path("/auth/callback"));
        assert!(is_public_path("/static/style.css"));
        assert!(is_public_path("/favicon.ico"));
        assert!(is_public_path("/manifest.json"));
        assert!(is_public_path("/logo.png"));

        assert!(!is_public_path("/"));
        assert!(!is_public_path("/dashboard"));
        assert!(!is_public_path("/api/evaluations"));

        // Sharing the prefix without the segment boundary is not enough
        assert!(!is_public_path("/authority"));
        assert!(!is_public_path("/staticky"));
    }

    #[test]
    fn test_expiry_comparison_uses_signed_arithmetic() {
        // A session 2 minutes from expiry sits inside a 5 minute threshold,
        // and one already past expiry must also be treated as near.
        let threshold = chrono::Duration::minutes(5);
        let now = Utc::now();

        let in_two_minutes: DateTime<Utc> = now + chrono::Duration::minutes(2);
        assert!(in_two_minutes - now <= threshold);

        let already_past: DateTime<Utc> = now - chrono::Duration::minutes(1);
        assert!(already_past - now <= threshold);

        let in_an_hour: DateTime<Utc> = now + chrono::Duration::hours(1);
        assert!(in_an_hour - now > threshold);
    }
}
