//! Operator notifications.
//!
//! `NotificationService` delivers alerts now or registers them for later
//! delivery. Implementations:
//! - `LogNotifier`: delivers by structured log event, keeps scheduled
//!   notifications in memory
//! - `RecordingNotifier`: captures everything for assertions in tests

mod log_notifier;
mod recording;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{NotificationKind, Platform, ScheduledContent};
use crate::error::Result;

pub use log_notifier::LogNotifier;
pub use recording::RecordingNotifier;

/// A single alert addressed to a schedule's recipients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub schedule_id: String,
    pub brand_id: String,
    pub kind: NotificationKind,
    pub platform: Option<Platform>,
    pub recipients: Vec<String>,
    pub subject: String,
    pub body: String,
}

impl Notification {
    pub fn for_schedule(schedule: &ScheduledContent, kind: NotificationKind, subject: String, body: String) -> Self {
        Self {
            schedule_id: schedule.id.clone(),
            brand_id: schedule.brand_id.clone(),
            kind,
            platform: None,
            recipients: schedule.recipients(),
            subject,
            body,
        }
    }

    pub fn on_platform(mut self, platform: Platform) -> Self {
        self.platform = Some(platform);
        self
    }
}

#[async_trait]
pub trait NotificationService: Send + Sync {
    /// Deliver immediately.
    async fn send_notification(&self, notification: &Notification) -> Result<()>;

    /// Register for delivery at `send_at`, returning a handle for cancellation.
    async fn schedule_notification(&self, notification: &Notification, send_at: DateTime<Utc>) -> Result<String>;

    /// Drop a scheduled notification. Unknown ids are not an error.
    async fn cancel_notification(&self, notification_id: &str) -> Result<()>;
}
