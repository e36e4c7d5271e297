//! Main router configuration assembling the auth endpoints behind the gate.

use axum::{
    Router, middleware,
    routing::{get, post},
};
use tower_http::{services::ServeDir, trace::TraceLayer};

use super::{
    context::AppState, handler_auth_callback::handle_auth_callback,
    handler_auth_login::handle_auth_login, handler_auth_logout::handle_auth_logout,
    handler_auth_refresh::handle_auth_refresh, handler_auth_session::handle_auth_session,
    handler_index::handle_index,
};
use crate::http::middleware_auth::session_gate;

/// Build the standalone application router
pub fn build_router(state: AppState) -> Router {
    build_portal_router(state, Router::new())
}

/// Build the router with consumer routes merged in. Everything except the
/// public paths sits behind the session gate, so downstream page and API
/// handlers are covered by the same checkpoint.
pub fn build_portal_router(state: AppState, consumer_routes: Router<AppState>) -> Router {
    let auth_routes = Router::new()
        .route("/login", get(handle_auth_login))
        .route("/callback", get(handle_auth_callback))
        .route("/logout", get(handle_auth_logout))
        .route("/refresh", post(handle_auth_refresh))
        .route("/session", get(handle_auth_session));

    Router::new()
        .route("/", get(handle_index))
        .merge(consumer_routes)
        .nest("/auth", auth_routes)
        .nest_service("/static", ServeDir::new(&state.config.http_static_path))
        .layer(middleware::from_fn_with_state(state.clone(), session_gate))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
