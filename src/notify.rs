//! Operator alerting for token verification failures.

use chrono::Utc;
use serde_json::json;

/// Posts Discord-compatible error embeds to a configured webhook.
///
/// Delivery is fire and forget: failures are logged and never surfaced to
/// the request path that triggered the alert.
pub struct WebhookNotifier {
    http_client: reqwest::Client,
    webhook_url: Option<String>,
}

impl WebhookNotifier {
    pub fn new(http_client: reqwest::Client, webhook_url: Option<String>) -> Self {
        Self {
            http_client,
            webhook_url,
        }
    }

    /// Report a failed session token verification.
    pub fn notify_token_failure(&self, detail: &str) {
        let Some(url) = self.webhook_url.clone() else {
            tracing::debug!("error webhook not configured, skipping alert");
            return;
        };

        let payload = json!({
            "embeds": [{
                "title": "portal-gate token error",
                "color": 0xFF0000,
                "description": "Session token verification failed.",
                "fields": [{
                    "name": "Error Details",
                    "value": detail,
                    "inline": false
                }],
                "timestamp": Utc::now().to_rfc3339()
            }]
        });

        let http_client = self.http_client.clone();
        tokio::spawn(async move {
            match http_client.post(&url).json(&payload).send().await {
                Ok(response) if !response.status().is_success() => {
                    tracing::error!(status = %response.status(), "error webhook rejected the alert");
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::error!(error = %e, "failed to deliver error webhook");
                }
            }
        });
    }
}
