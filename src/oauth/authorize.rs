//! Construction of the upstream consent URL.

use crate::config::Config;

/// Build the authorization URL the user is sent to for upstream consent.
///
/// The redirect URI is the public callback endpoint and must match the URI
/// registered with the provider for the configured client id.
pub fn build_authorize_url(config: &Config) -> url::Url {
    let mut url = config.upstream_base.authorize_endpoint();
    url.query_pairs_mut()
        .append_pair("client_id", &config.oauth_client_id)
        .append_pair(
            "redirect_uri",
            config.public_base_url.callback_endpoint().as_str(),
        )
        .append_pair("response_type", "code")
        .append_pair("scope", &config.oauth_scope);
    url
}
