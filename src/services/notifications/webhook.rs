use anyhow::Context;
use async_trait::async_trait;

use super::{Notification, NotificationSender};

/// POSTs `{"user_id": .., "notification": {..}}` as JSON to a fixed URL.
pub struct WebhookNotifier {
    url: String,
    client: reqwest::Client,
}

impl WebhookNotifier {
    pub fn new(url: String) -> Self {
        Self {
            url,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl NotificationSender for WebhookNotifier {
    async fn send(&self, user_id: &str, notification: &Notification) -> anyhow::Result<()> {
        let body = serde_json::json!({
            "user_id": user_id,
            "notification": notification,
        });

        self.client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .context("failed to deliver notification webhook")?
            .error_for_status()
            .context("notification webhook returned error")?;

        Ok(())
    }
}
