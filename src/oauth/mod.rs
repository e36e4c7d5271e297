//! OAuth 2.0 authorization code flow against the upstream identity provider.

pub mod authorize;
pub mod client;
pub mod refresher;
pub mod types;

// Re-export frequently used items from each module
pub use authorize::build_authorize_url;
pub use client::{TokenExchange, TokenExchangeClient};
pub use refresher::{RefreshedSession, TokenRefresher};
pub use types::{GrantType, SessionClaims, TokenPair, UserProfile};
