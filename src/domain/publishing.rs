//! Per-platform publishing outcomes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::platform::Platform;
use super::schedule::{ScheduleStatus, ScheduledContent};

/// Status of one platform target within a schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformStatus {
    Pending,
    Publishing,
    Published,
    Failed,
    Cancelled,
}

impl PlatformStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlatformStatus::Pending => "pending",
            PlatformStatus::Publishing => "publishing",
            PlatformStatus::Published => "published",
            PlatformStatus::Failed => "failed",
            PlatformStatus::Cancelled => "cancelled",
        }
    }
}

/// Structured error attached to a failed platform attempt
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PublishErrorDetail {
    pub code: String,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl PublishErrorDetail {
    pub const VALIDATION_FAILED: &'static str = "PLATFORM_VALIDATION_FAILED";
    pub const PUBLISH_FAILED: &'static str = "PUBLISH_FAILED";
    pub const PUBLISHING_ERROR: &'static str = "PUBLISHING_ERROR";

    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// Engagement numbers captured right after publishing
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct InitialMetrics {
    pub likes: Option<u64>,
    pub shares: Option<u64>,
    pub comments: Option<u64>,
    pub views: Option<u64>,
    pub reach: Option<u64>,
}

/// Persisted outcome of the latest attempt on one platform
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlatformResult {
    pub platform: Platform,
    pub status: PlatformStatus,
    pub platform_post_id: Option<String>,
    pub error: Option<PublishErrorDetail>,
    pub metrics: Option<InitialMetrics>,
    pub attempted_at: DateTime<Utc>,
}

impl PlatformResult {
    pub fn published(platform: Platform, post_id: String, metrics: Option<InitialMetrics>) -> Self {
        Self {
            platform,
            status: PlatformStatus::Published,
            platform_post_id: Some(post_id),
            error: None,
            metrics,
            attempted_at: Utc::now(),
        }
    }

    pub fn failed(platform: Platform, error: PublishErrorDetail) -> Self {
        Self {
            platform,
            status: PlatformStatus::Failed,
            platform_post_id: None,
            error: Some(error),
            metrics: None,
            attempted_at: Utc::now(),
        }
    }

    pub fn is_published(&self) -> bool {
        self.status == PlatformStatus::Published
    }
}

/// Projection of a schedule's state on one platform
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PublishingStatus {
    pub platform: Platform,
    pub status: PlatformStatus,
    pub platform_post_id: Option<String>,
    pub error: Option<PublishErrorDetail>,
    pub metrics: Option<InitialMetrics>,
    pub last_updated: DateTime<Utc>,
}

impl From<&PlatformResult> for PublishingStatus {
    fn from(result: &PlatformResult) -> Self {
        Self {
            platform: result.platform,
            status: result.status,
            platform_post_id: result.platform_post_id.clone(),
            error: result.error.clone(),
            metrics: result.metrics.clone(),
            last_updated: result.attempted_at,
        }
    }
}

impl PublishingStatus {
    /// Project per-platform status from a persisted schedule.
    pub fn project(schedule: &ScheduledContent) -> Vec<PublishingStatus> {
        schedule
            .platforms
            .iter()
            .map(|platform| {
                let recorded = schedule.platform_results.iter().find(|r| r.platform == *platform);
                let bare = |status| PublishingStatus {
                    platform: *platform,
                    status,
                    platform_post_id: None,
                    error: None,
                    metrics: None,
                    last_updated: schedule.updated_at,
                };
                match (schedule.status, recorded) {
                    (ScheduleStatus::Cancelled, _) => bare(PlatformStatus::Cancelled),
                    (ScheduleStatus::Publishing, _) => bare(PlatformStatus::Publishing),
                    (ScheduleStatus::Published | ScheduleStatus::Failed, Some(result)) => result.into(),
                    (ScheduleStatus::Failed, None) => PublishingStatus {
                        error: schedule
                            .failure_reason
                            .as_ref()
                            .map(|reason| PublishErrorDetail::new(PublishErrorDetail::PUBLISHING_ERROR, reason.clone())),
                        ..bare(PlatformStatus::Failed)
                    },
                    // Awaiting a retry: surface the previous error but report pending
                    (ScheduleStatus::Scheduled, Some(result)) => PublishingStatus {
                        error: result.error.clone(),
                        ..bare(PlatformStatus::Pending)
                    },
                    _ => bare(PlatformStatus::Pending),
                }
            })
            .collect()
    }
}
