//! Handles GET /auth/session - Returns the current decoded session

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum_extra::extract::cookie::CookieJar;
use serde_json::{Value, json};

use super::context::AppState;
use crate::oauth::types::SessionClaims;
use crate::session::SessionTokenCodec;

/// Expose the verified access token and its expiry to same-origin callers.
/// The refresh token never leaves the signed cookie.
pub async fn handle_auth_session(
    State(state): State<AppState>,
    jar: CookieJar,
) -> std::result::Result<Json<Value>, (StatusCode, Json<Value>)> {
    let cookies = state.session_store.read(&jar);
    let Some(session_token) = cookies.session else {
        return Err(unauthorized());
    };

    let claims: SessionClaims = state.codec.verify(&session_token).map_err(|err| {
        tracing::debug!(error = %err, "session lookup rejected");
        unauthorized()
    })?;
    let expires_at = SessionTokenCodec::peek_expiry(&session_token).map_err(|_| unauthorized())?;

    Ok(Json(json!({
        "accessToken": claims.access_token,
        "expiresAt": expires_at,
    })))
}

fn unauthorized() -> (StatusCode, Json<Value>) {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "error": "Unauthorized" })),
    )
}
