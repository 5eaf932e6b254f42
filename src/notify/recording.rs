use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use super::{Notification, NotificationService};
use crate::domain::NotificationKind;
use crate::error::{CadenceError, Result};
use crate::id::generate_notification_id;

/// Captures sent, scheduled and cancelled notifications.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
    scheduled: Mutex<HashMap<String, (DateTime<Utc>, Notification)>>,
    cancelled: Mutex<Vec<String>>,
    failing: AtomicBool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail with a notification error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn sent_of_kind(&self, kind: NotificationKind) -> Vec<Notification> {
        self.sent().into_iter().filter(|n| n.kind == kind).collect()
    }

    /// Scheduled notifications not yet cancelled.
    pub fn scheduled(&self) -> Vec<(String, DateTime<Utc>)> {
        let mut entries: Vec<_> = self
            .scheduled
            .lock()
            .map(|s| s.iter().map(|(id, (at, _))| (id.clone(), *at)).collect())
            .unwrap_or_default();
        entries.sort();
        entries
    }

    pub fn cancelled(&self) -> Vec<String> {
        self.cancelled.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn check(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(CadenceError::Notification("notifier unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl NotificationService for RecordingNotifier {
    async fn send_notification(&self, notification: &Notification) -> Result<()> {
        self.check()?;
        self.sent
            .lock()
            .map_err(|e| CadenceError::Notification(e.to_string()))?
            .push(notification.clone());
        Ok(())
    }

    async fn schedule_notification(&self, notification: &Notification, send_at: DateTime<Utc>) -> Result<String> {
        self.check()?;
        let id = generate_notification_id(&notification.schedule_id);
        self.scheduled
            .lock()
            .map_err(|e| CadenceError::Notification(e.to_string()))?
            .insert(id.clone(), (send_at, notification.clone()));
        Ok(id)
    }

    async fn cancel_notification(&self, notification_id: &str) -> Result<()> {
        self.check()?;
        if let Ok(mut scheduled) = self.scheduled.lock() {
            scheduled.remove(notification_id);
        }
        self.cancelled
            .lock()
            .map_err(|e| CadenceError::Notification(e.to_string()))?
            .push(notification_id.to_string());
        Ok(())
    }
}
