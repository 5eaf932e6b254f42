//! Scheduled content record and related types
//!
//! `ScheduledContent` is the central entity: one piece of content targeted at
//! one or more platforms for publication at an absolute instant. The record
//! carries its own lifecycle status, retry budget and notification history.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::platform::{ContentType, MediaKind, Platform};
use super::publishing::PlatformResult;
use crate::error::{CadenceError, Result};

/// The core scheduled content record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScheduledContent {
    //=== Identity ===
    /// Engine-assigned identifier ("sch-1738300800123-a1b2")
    pub id: String,

    /// Owning brand
    pub brand_id: String,

    /// Link to a pre-authored content record
    pub content_id: Option<String>,

    //=== Payload ===
    pub title: String,
    pub description: Option<String>,
    pub content: ContentBody,

    //=== Targeting ===
    pub platforms: Vec<Platform>,
    pub content_type: ContentType,
    pub campaign: Option<CampaignRef>,
    pub tags: Vec<String>,

    //=== Timing ===
    /// Absolute publication instant; all comparisons use this
    pub scheduled_time: DateTime<Utc>,

    /// IANA timezone name, display/interpretation only
    pub timezone: String,

    //=== Lifecycle ===
    pub status: ScheduleStatus,
    pub priority: Priority,
    pub retry_count: u32,
    pub max_retries: u32,

    //=== Notifications ===
    pub notification_settings: Option<NotificationSettings>,

    /// When the pre-publish reminder is due (None = no reminder armed)
    pub reminder_at: Option<DateTime<Utc>>,

    /// Durable notification-service handle for the armed reminder
    pub reminder_notification_id: Option<String>,

    /// Notifications already delivered, for at-most-once delivery
    pub notifications: Vec<NotificationRecord>,

    /// Per-platform outcome of the latest publish attempt
    pub platform_results: Vec<PlatformResult>,

    //=== Audit ===
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    /// Bumped by the repository on every stored write; conditional writes
    /// must carry the revision they were loaded at
    #[serde(default)]
    pub revision: u64,

    pub published_at: Option<DateTime<Utc>>,
    pub failure_reason: Option<String>,
    pub cancellation_reason: Option<String>,
}

/// Lifecycle status of a schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleStatus {
    /// Saved but not queued for publishing
    Draft,
    /// Queued; publishes once due
    Scheduled,
    /// Claimed by a sweep, publish in flight
    Publishing,
    /// At least one platform published
    Published,
    /// No platform published and no retries left
    Failed,
    /// Cancelled by a user
    Cancelled,
}

impl ScheduleStatus {
    pub const ALL: [ScheduleStatus; 6] = [
        ScheduleStatus::Draft,
        ScheduleStatus::Scheduled,
        ScheduleStatus::Publishing,
        ScheduleStatus::Published,
        ScheduleStatus::Failed,
        ScheduleStatus::Cancelled,
    ];

    /// Convert to string for SQLite storage
    pub fn as_str(&self) -> &'static str {
        match self {
            ScheduleStatus::Draft => "draft",
            ScheduleStatus::Scheduled => "scheduled",
            ScheduleStatus::Publishing => "publishing",
            ScheduleStatus::Published => "published",
            ScheduleStatus::Failed => "failed",
            ScheduleStatus::Cancelled => "cancelled",
        }
    }

    /// Parse from string
    pub fn parse(s: &str) -> Option<Self> {
        ScheduleStatus::ALL.iter().copied().find(|st| st.as_str() == s)
    }

    /// Returns true if no further transitions are possible
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ScheduleStatus::Published | ScheduleStatus::Failed | ScheduleStatus::Cancelled
        )
    }

    /// Returns true if users may still edit or cancel
    pub fn is_editable(&self) -> bool {
        matches!(self, ScheduleStatus::Draft | ScheduleStatus::Scheduled)
    }

    /// Returns true if the schedule takes part in conflict and limit checks
    pub fn is_active(&self) -> bool {
        !matches!(self, ScheduleStatus::Failed | ScheduleStatus::Cancelled)
    }

    /// Allowed edges of the lifecycle state machine.
    ///
    /// `Publishing -> Scheduled` is the retry edge taken when an attempt
    /// failed with budget left.
    pub fn can_transition_to(&self, next: ScheduleStatus) -> bool {
        use ScheduleStatus::*;
        matches!(
            (self, next),
            (Draft, Scheduled)
                | (Draft, Cancelled)
                | (Scheduled, Draft)
                | (Scheduled, Publishing)
                | (Scheduled, Cancelled)
                | (Publishing, Published)
                | (Publishing, Failed)
                | (Publishing, Scheduled)
        )
    }
}

/// Queue ordering hint; never affects correctness
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        }
    }

    /// Numeric rank, higher runs first
    pub fn rank(&self) -> u8 {
        match self {
            Priority::Low => 0,
            Priority::Medium => 1,
            Priority::High => 2,
            Priority::Urgent => 3,
        }
    }
}

/// Content payload. Opaque to the engine beyond platform validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ContentBody {
    pub text: String,
    pub media: Vec<MediaRef>,
    pub hashtags: Vec<String>,
    pub mentions: Vec<String>,
    pub link: Option<String>,
}

impl ContentBody {
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty() && self.media.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MediaRef {
    pub url: String,
    pub kind: MediaKind,
    #[serde(default)]
    pub alt_text: Option<String>,
}

/// Membership of a schedule in a marketing campaign.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CampaignRef {
    pub campaign_id: String,
    #[serde(default)]
    pub phase: CampaignPhase,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CampaignPhase {
    Teaser,
    Launch,
    #[default]
    Promotion,
    Reminder,
    Retraction,
}

/// Per-schedule notification preferences
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NotificationSettings {
    /// Minutes before `scheduled_time` to send the reminder; unset takes
    /// `scheduling.pre-publish-minutes` from config
    pub pre_publish_minutes: Option<i64>,
    pub recipients: Vec<String>,
    pub notify_on_success: bool,
    pub notify_on_failure: bool,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            pre_publish_minutes: None,
            recipients: Vec::new(),
            notify_on_success: true,
            notify_on_failure: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    PrePublishReminder,
    Published,
    Failed,
    Edited,
    Cancelled,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::PrePublishReminder => "pre_publish_reminder",
            NotificationKind::Published => "published",
            NotificationKind::Failed => "failed",
            NotificationKind::Edited => "edited",
            NotificationKind::Cancelled => "cancelled",
        }
    }
}

/// One delivered notification in a schedule's history.
///
/// Delivery is deduplicated on `(kind, platform, attempt, due_at)`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NotificationRecord {
    pub kind: NotificationKind,
    pub platform: Option<Platform>,
    pub attempt: u32,
    /// Reminder instant the entry was sent for; a re-armed reminder is a new delivery
    #[serde(default)]
    pub due_at: Option<DateTime<Utc>>,
    pub sent_at: DateTime<Utc>,
    pub recipients: Vec<String>,
}

impl NotificationRecord {
    pub fn same_delivery(&self, other: &NotificationRecord) -> bool {
        self.kind == other.kind
            && self.platform == other.platform
            && self.attempt == other.attempt
            && self.due_at == other.due_at
    }
}

/// Partial update applied by edit paths. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub content: Option<ContentBody>,
    pub platforms: Option<Vec<Platform>>,
    pub content_type: Option<ContentType>,
    pub campaign: Option<CampaignRef>,
    pub tags: Option<Vec<String>>,
    pub scheduled_time: Option<DateTime<Utc>>,
    pub timezone: Option<String>,
    pub priority: Option<Priority>,
    pub max_retries: Option<u32>,
    pub notification_settings: Option<NotificationSettings>,
    /// Move a draft into the publishing queue
    pub publish: bool,
    /// Accept the change even if it introduces conflicts
    pub allow_conflicts: bool,
}

impl ScheduleUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.content.is_none()
            && self.platforms.is_none()
            && self.content_type.is_none()
            && self.campaign.is_none()
            && self.tags.is_none()
            && self.scheduled_time.is_none()
            && self.timezone.is_none()
            && self.priority.is_none()
            && self.max_retries.is_none()
            && self.notification_settings.is_none()
            && !self.publish
    }
}

impl ScheduledContent {
    /// Current publish attempt number (1-indexed)
    pub fn attempt(&self) -> u32 {
        self.retry_count + 1
    }

    pub fn retries_left(&self) -> bool {
        self.retry_count < self.max_retries
    }

    /// Update the timestamp
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Move along the lifecycle state machine.
    pub fn transition(&mut self, next: ScheduleStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(CadenceError::State(format!(
                "cannot move schedule {} from {} to {}",
                self.id,
                self.status.as_str(),
                next.as_str()
            )));
        }
        self.status = next;
        self.touch();
        Ok(())
    }

    /// Reject mutation of schedules that are in flight, done, or about to go out.
    ///
    /// Drafts never go out on their own, so the time lock only covers queued schedules.
    pub fn ensure_mutable(&self, now: DateTime<Utc>, lock_window: Duration) -> Result<()> {
        self.ensure_cancellable()?;
        if self.status == ScheduleStatus::Scheduled && self.scheduled_time - now < lock_window {
            return Err(CadenceError::State(format!(
                "schedule {} publishes at {} and can no longer be changed (less than {} minutes away)",
                self.id,
                self.scheduled_time.to_rfc3339(),
                lock_window.num_minutes()
            )));
        }
        Ok(())
    }

    /// Status-only guard shared by every cancellation path.
    pub fn ensure_cancellable(&self) -> Result<()> {
        match self.status {
            ScheduleStatus::Draft | ScheduleStatus::Scheduled => Ok(()),
            ScheduleStatus::Publishing | ScheduleStatus::Published => Err(CadenceError::State(format!(
                "schedule {} is {} and cannot be modified",
                self.id,
                self.status.as_str()
            ))),
            ScheduleStatus::Failed | ScheduleStatus::Cancelled => Err(CadenceError::State(format!(
                "schedule {} is already {}",
                self.id,
                self.status.as_str()
            ))),
        }
    }

    /// Apply a partial update, returning the names of the fields that changed.
    pub fn apply_update(&mut self, update: &ScheduleUpdate) -> Vec<&'static str> {
        let mut changed = Vec::new();

        macro_rules! set {
            ($field:ident, $name:literal) => {
                if let Some(value) = &update.$field {
                    if self.$field != *value {
                        self.$field = value.clone();
                        changed.push($name);
                    }
                }
            };
        }

        set!(title, "title");
        set!(content, "content");
        set!(platforms, "platforms");
        set!(content_type, "content_type");
        set!(tags, "tags");
        set!(scheduled_time, "scheduled_time");
        set!(timezone, "timezone");
        set!(priority, "priority");
        set!(max_retries, "max_retries");

        if let Some(description) = &update.description
            && self.description.as_ref() != Some(description)
        {
            self.description = Some(description.clone());
            changed.push("description");
        }
        if let Some(campaign) = &update.campaign
            && self.campaign.as_ref() != Some(campaign)
        {
            self.campaign = Some(campaign.clone());
            changed.push("campaign");
        }
        if let Some(settings) = &update.notification_settings
            && self.notification_settings.as_ref() != Some(settings)
        {
            self.notification_settings = Some(settings.clone());
            changed.push("notification_settings");
        }
        if update.publish && self.status == ScheduleStatus::Draft {
            self.status = ScheduleStatus::Scheduled;
            changed.push("status");
        }

        if !changed.is_empty() {
            self.touch();
        }
        changed
    }

    pub fn has_notification(&self, record: &NotificationRecord) -> bool {
        self.notifications.iter().any(|n| n.same_delivery(record))
    }

    /// True when the reminder is due and not yet delivered.
    pub fn reminder_due(&self, now: DateTime<Utc>) -> bool {
        self.status == ScheduleStatus::Scheduled
            && self.reminder_at.is_some_and(|at| at <= now)
            && !self.notifications.iter().any(|n| {
                n.kind == NotificationKind::PrePublishReminder
                    && n.attempt == self.attempt()
                    && n.due_at == self.reminder_at
            })
    }

    pub fn recipients(&self) -> Vec<String> {
        self.notification_settings
            .as_ref()
            .map(|s| s.recipients.clone())
            .unwrap_or_default()
    }
}
