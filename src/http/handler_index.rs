//! Handles GET / - Minimal authenticated landing page

use axum::response::Html;

use super::middleware_auth::CurrentUser;

/// Handle requests to the index page. The gate has already verified the
/// session; the extractor hands over the identity.
pub async fn handle_index(user: CurrentUser) -> Html<String> {
    Html(format!(
        "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>portal-gate</title></head>\n<body>\n<h1>Signed in as {}</h1>\n<p>{}</p>\n<p><a href=\"/auth/logout\">Sign out</a></p>\n</body>\n</html>\n",
        escape(&user.profile.display_name),
        escape(&user.profile.login),
    ))
}

fn escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
