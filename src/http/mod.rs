//! Axum HTTP server, auth handlers, and the session gate middleware.

pub mod context;
pub mod cookies;
mod handler_auth_callback;
mod handler_auth_login;
mod handler_auth_logout;
mod handler_auth_refresh;
mod handler_auth_session;
mod handler_index;
pub mod middleware_auth;
pub mod server;

pub use context::AppState;
pub use cookies::{SESSION_COOKIE, SessionStore, USER_COOKIE};
pub use middleware_auth::CurrentUser;
pub use server::{build_portal_router, build_router};
