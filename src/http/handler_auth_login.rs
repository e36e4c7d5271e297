//! Handles GET /auth/login - Returns the upstream authorization URL

use axum::{Json, extract::State};
use serde_json::{Value, json};

use super::context::AppState;
use crate::oauth::build_authorize_url;

/// Hand the client the consent URL to visit. The upstream redirects back to
/// /auth/callback once the user approves.
pub async fn handle_auth_login(State(state): State<AppState>) -> Json<Value> {
    let url = build_authorize_url(&state.config);
    Json(json!({ "url": url.as_str() }))
}
