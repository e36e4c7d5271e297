//! Cookie transport for the signed session and user tokens.
//!
//! Pure mapping between signed tokens and Set-Cookie fields; no verification
//! or business logic happens here.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{DateTime, Utc};
use time::OffsetDateTime;

use crate::session::SignedToken;

pub const SESSION_COOKIE: &str = "session";
pub const USER_COOKIE: &str = "user";

/// Raw cookie values read from an incoming request
#[derive(Debug, Default)]
pub struct SessionCookies {
    pub session: Option<String>,
    pub user: Option<String>,
}

/// Builds the session and user cookies with the fixed security attributes:
/// httpOnly, SameSite=Lax, path=/, secure per deployment configuration, and
/// an expiry never later than the token's own.
#[derive(Clone)]
pub struct SessionStore {
    secure: bool,
}

impl SessionStore {
    pub fn new(secure: bool) -> Self {
        Self { secure }
    }

    pub fn read(&self, jar: &CookieJar) -> SessionCookies {
        SessionCookies {
            session: jar.get(SESSION_COOKIE).map(|c| c.value().to_string()),
            user: jar.get(USER_COOKIE).map(|c| c.value().to_string()),
        }
    }

    pub fn write(
        &self,
        name: &'static str,
        value: &str,
        expires_at: DateTime<Utc>,
    ) -> Cookie<'static> {
        let mut cookie = Cookie::build((name, value.to_string()))
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Lax)
            .path("/")
            .build();
        if let Ok(expires) = OffsetDateTime::from_unix_timestamp(expires_at.timestamp()) {
            cookie.set_expires(expires);
        }
        cookie
    }

    pub fn write_token(&self, name: &'static str, token: &SignedToken) -> Cookie<'static> {
        self.write(name, &token.token, token.expires_at)
    }

    /// Removal cookie: empty value, immediately expired, carrying the same
    /// attribute set as `write`.
    pub fn clear(&self, name: &'static str) -> Cookie<'static> {
        Cookie::build((name, ""))
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Lax)
            .path("/")
            .max_age(time::Duration::ZERO)
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_written_cookie_carries_security_attributes() {
        let store = SessionStore::new(true);
        let expires_at = Utc::now() + chrono::Duration::hours(2);
        let cookie = store.write(SESSION_COOKIE, "token-value", expires_at);

        assert_eq!(cookie.name(), "session");
        assert_eq!(cookie.value(), "token-value");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.path(), Some("/"));
        let expires = cookie.expires_datetime().unwrap();
        assert_eq!(expires.unix_timestamp(), expires_at.timestamp());
    }

    #[test]
    fn test_secure_flag_follows_configuration() {
        let store = SessionStore::new(false);
        let cookie = store.write(USER_COOKIE, "v", Utc::now());
        assert_ne!(cookie.secure(), Some(true));
    }

    #[test]
    fn test_clear_cookie_expires_immediately() {
        let store = SessionStore::new(true);
        let cookie = store.clear(SESSION_COOKIE);
        assert_eq!(cookie.value(), "");
        assert_eq!(cookie.max_age(), Some(time::Duration::ZERO));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.path(), Some("/"));
    }

    #[test]
    fn test_read_picks_both_cookies_from_jar() {
        let store = SessionStore::new(true);
        let jar = CookieJar::new()
            .add(Cookie::new(SESSION_COOKIE, "s-token"))
            .add(Cookie::new(USER_COOKIE, "u-token"));

        let cookies = store.read(&jar);
        assert_eq!(cookies.session.as_deref(), Some("s-token"));
        assert_eq!(cookies.user.as_deref(), Some("u-token"));

        let empty = store.read(&CookieJar::new());
        assert!(empty.session.is_none());
        assert!(empty.user.is_none());
    }
}
