//! Handles GET /auth/logout - Clears the session and user cookies

use axum::extract::State;
use axum::response::Redirect;
use axum_extra::extract::cookie::CookieJar;

use super::context::AppState;
use crate::http::cookies::{SESSION_COOKIE, USER_COOKIE};

pub async fn handle_auth_logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> (CookieJar, Redirect) {
    let jar = jar
        .add(state.session_store.clear(SESSION_COOKIE))
        .add(state.session_store.clear(USER_COOKIE));
    (jar, Redirect::to("/auth/login"))
}
