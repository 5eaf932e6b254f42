use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

use super::{Notification, NotificationService};
use crate::error::{CadenceError, Result};
use crate::id::generate_notification_id;

/// Delivers notifications as log events.
#[derive(Debug, Default)]
pub struct LogNotifier {
    scheduled: Mutex<HashMap<String, (DateTime<Utc>, Notification)>>,
}

impl LogNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of notifications registered and not yet cancelled.
    pub fn pending(&self) -> usize {
        self.scheduled.lock().map(|s| s.len()).unwrap_or(0)
    }
}

#[async_trait]
impl NotificationService for LogNotifier {
    async fn send_notification(&self, notification: &Notification) -> Result<()> {
        tracing::info!(
            schedule_id = %notification.schedule_id,
            brand_id = %notification.brand_id,
            kind = notification.kind.as_str(),
            platform = ?notification.platform,
            recipients = notification.recipients.len(),
            subject = %notification.subject,
            "Notification: {}",
            notification.body
        );
        Ok(())
    }

    async fn schedule_notification(&self, notification: &Notification, send_at: DateTime<Utc>) -> Result<String> {
        let id = generate_notification_id(&notification.schedule_id);
        self.scheduled
            .lock()
            .map_err(|e| CadenceError::Notification(e.to_string()))?
            .insert(id.clone(), (send_at, notification.clone()));
        tracing::debug!(
            notification_id = %id,
            schedule_id = %notification.schedule_id,
            send_at = %send_at.to_rfc3339(),
            "Notification scheduled"
        );
        Ok(id)
    }

    async fn cancel_notification(&self, notification_id: &str) -> Result<()> {
        let removed = self
            .scheduled
            .lock()
            .map_err(|e| CadenceError::Notification(e.to_string()))?
            .remove(notification_id);
        if removed.is_some() {
            tracing::debug!(notification_id, "Scheduled notification cancelled");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::NotificationKind;
    use crate::domain::schedule::fixtures::sample_schedule;

    #[tokio::test]
    async fn test_schedule_and_cancel() {
        let notifier = LogNotifier::new();
        let schedule = sample_schedule();
        let notification = Notification::for_schedule(
            &schedule,
            NotificationKind::PrePublishReminder,
            "Reminder".to_string(),
            "Publishing soon".to_string(),
        );

        let id = notifier.schedule_notification(&notification, Utc::now()).await.unwrap();
        assert!(id.starts_with("ntf-"));
        assert_eq!(notifier.pending(), 1);

        notifier.cancel_notification(&id).await.unwrap();
        notifier.cancel_notification(&id).await.unwrap();
        assert_eq!(notifier.pending(), 0);
    }
}
