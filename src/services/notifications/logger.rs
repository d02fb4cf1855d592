use async_trait::async_trait;

use super::{Notification, NotificationSender};

/// Writes notifications to the log instead of delivering them.
pub struct LogNotifier;

#[async_trait]
impl NotificationSender for LogNotifier {
    async fn send(&self, user_id: &str, notification: &Notification) -> anyhow::Result<()> {
        let payload = serde_json::to_string(notification)?;
        tracing::info!(user_id, %payload, "notification");
        Ok(())
    }
}
