//! Request and response shapes for the scheduling API.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::conflict::SchedulingConflict;
use super::platform::{ContentType, Platform};
use super::schedule::{
    CampaignRef, ContentBody, NotificationSettings, Priority, ScheduleStatus, ScheduledContent,
};
use crate::error::{CadenceError, Result};

/// Request to schedule one piece of content
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleRequest {
    pub brand_id: String,
    #[serde(default)]
    pub content_id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub content: ContentBody,
    pub platforms: Vec<Platform>,
    #[serde(default)]
    pub content_type: ContentType,
    #[serde(default)]
    pub campaign: Option<CampaignRef>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub scheduled_time: DateTime<Utc>,
    /// Falls back to the configured default timezone
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    /// Falls back to the configured default retry budget
    #[serde(default)]
    pub max_retries: Option<u32>,
    #[serde(default)]
    pub notification_settings: Option<NotificationSettings>,
    #[serde(default)]
    pub created_by: String,
    /// Save as a draft instead of queueing
    #[serde(default)]
    pub draft: bool,
    /// Accept the schedule whatever conflicts are found
    #[serde(default)]
    pub allow_conflicts: bool,
    /// Let the engine move the schedule to clear auto-resolvable conflicts
    #[serde(default)]
    pub auto_resolve: bool,
}

/// Inclusive-exclusive instant range `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if end <= start {
            return Err(CadenceError::Validation(format!(
                "time range end {} must be after start {}",
                end.to_rfc3339(),
                start.to_rfc3339()
            )));
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        t >= self.start && t < self.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DistributionStrategy {
    /// Spread items evenly across the time range
    #[default]
    Even,
    /// Ask the timing advisor for the best slot per item
    Optimal,
    /// Use caller-supplied exact times
    Custom,
}

/// One item of a bulk import. Brand and author come from the batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkItem {
    #[serde(default)]
    pub content_id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub content: ContentBody,
    pub platforms: Vec<Platform>,
    #[serde(default)]
    pub content_type: ContentType,
    #[serde(default)]
    pub campaign: Option<CampaignRef>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub notification_settings: Option<NotificationSettings>,
    /// Exact time for the custom strategy when `custom_times` is not given
    #[serde(default)]
    pub scheduled_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkScheduleRequest {
    pub brand_id: String,
    #[serde(default)]
    pub created_by: String,
    pub items: Vec<BulkItem>,
    #[serde(default)]
    pub strategy: DistributionStrategy,
    #[serde(default)]
    pub time_range: Option<TimeRange>,
    #[serde(default)]
    pub custom_times: Vec<DateTime<Utc>>,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub max_retries: Option<u32>,
    #[serde(default)]
    pub allow_conflicts: bool,
}

impl BulkScheduleRequest {
    /// Build the per-item request for a resolved time.
    pub fn item_request(&self, item: &BulkItem, scheduled_time: DateTime<Utc>) -> ScheduleRequest {
        ScheduleRequest {
            brand_id: self.brand_id.clone(),
            content_id: item.content_id.clone(),
            title: item.title.clone(),
            description: item.description.clone(),
            content: item.content.clone(),
            platforms: item.platforms.clone(),
            content_type: item.content_type,
            campaign: item.campaign.clone(),
            tags: item.tags.clone(),
            scheduled_time,
            timezone: self.timezone.clone(),
            priority: item.priority,
            max_retries: self.max_retries,
            notification_settings: item.notification_settings.clone(),
            created_by: self.created_by.clone(),
            draft: false,
            allow_conflicts: self.allow_conflicts,
            auto_resolve: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkScheduled {
    pub index: usize,
    pub schedule: ScheduledContent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkConflict {
    pub index: usize,
    pub conflicts: Vec<SchedulingConflict>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkFailure {
    pub index: usize,
    pub code: String,
    pub error: String,
}

/// Per-item outcome buckets of a bulk import
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BulkScheduleResult {
    pub scheduled: Vec<BulkScheduled>,
    pub conflicts: Vec<BulkConflict>,
    pub failed: Vec<BulkFailure>,
}

impl BulkScheduleResult {
    pub fn total(&self) -> usize {
        self.scheduled.len() + self.conflicts.len() + self.failed.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    #[default]
    ScheduledTime,
    CreatedAt,
    Priority,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// Filters for listing schedules. Empty vectors mean "any".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleQuery {
    pub brand_id: Option<String>,
    pub platforms: Vec<Platform>,
    pub statuses: Vec<ScheduleStatus>,
    pub priorities: Vec<Priority>,
    pub campaign_id: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub tags: Vec<String>,
    pub content_types: Vec<ContentType>,
    pub sort_by: SortField,
    pub sort_order: SortOrder,
    pub offset: usize,
    pub limit: Option<usize>,
}

impl ScheduleQuery {
    pub fn for_brand(brand_id: impl Into<String>) -> Self {
        Self {
            brand_id: Some(brand_id.into()),
            ..Default::default()
        }
    }

    pub fn matches(&self, schedule: &ScheduledContent) -> bool {
        if let Some(brand) = &self.brand_id
            && &schedule.brand_id != brand
        {
            return false;
        }
        if !self.platforms.is_empty() && !schedule.platforms.iter().any(|p| self.platforms.contains(p)) {
            return false;
        }
        if !self.statuses.is_empty() && !self.statuses.contains(&schedule.status) {
            return false;
        }
        if !self.priorities.is_empty() && !self.priorities.contains(&schedule.priority) {
            return false;
        }
        if let Some(campaign_id) = &self.campaign_id
            && schedule.campaign.as_ref().map(|c| &c.campaign_id) != Some(campaign_id)
        {
            return false;
        }
        if self.from.is_some_and(|from| schedule.scheduled_time < from) {
            return false;
        }
        if self.to.is_some_and(|to| schedule.scheduled_time >= to) {
            return false;
        }
        if !self.tags.is_empty() && !self.tags.iter().all(|t| schedule.tags.contains(t)) {
            return false;
        }
        if !self.content_types.is_empty() && !self.content_types.contains(&schedule.content_type) {
            return false;
        }
        true
    }
}

/// A ranked candidate publication instant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSuggestion {
    pub time: DateTime<Utc>,
    pub score: f64,
    pub audience_score: f64,
    pub headroom_score: f64,
    pub density_score: f64,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ViewType {
    Day,
    #[default]
    Week,
    Month,
}

/// Daily posting usage for one platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformUsage {
    pub platform: Platform,
    pub date: NaiveDate,
    pub count: u32,
    pub limit: u32,
}

/// Everything a calendar UI needs for one window
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarView {
    pub brand_id: String,
    pub view_type: ViewType,
    pub timezone: String,
    pub window: TimeRange,
    pub schedules: Vec<ScheduledContent>,
    pub conflicts: Vec<SchedulingConflict>,
    pub optimal_times: Vec<TimeSuggestion>,
    pub platform_usage: Vec<PlatformUsage>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::schedule::fixtures::sample_schedule;
    use crate::domain::schedule::CampaignPhase;
    use chrono::Duration;

    #[test]
    fn test_time_range_rejects_inverted() {
        let now = Utc::now();
        assert!(TimeRange::new(now, now).is_err());
        assert!(TimeRange::new(now, now - Duration::hours(1)).is_err());
        let range = TimeRange::new(now, now + Duration::hours(1)).unwrap();
        assert!(range.contains(now));
        assert!(!range.contains(now + Duration::hours(1)));
    }

    #[test]
    fn test_query_filters() {
        let mut schedule = sample_schedule();
        schedule.tags = vec!["q4".to_string(), "promo".to_string()];
        schedule.campaign = Some(CampaignRef {
            campaign_id: "fall".to_string(),
            phase: CampaignPhase::Launch,
        });

        assert!(ScheduleQuery::for_brand("brand-1").matches(&schedule));
        assert!(!ScheduleQuery::for_brand("brand-2").matches(&schedule));

        let query = ScheduleQuery {
            platforms: vec![Platform::Linkedin],
            tags: vec!["q4".to_string()],
            campaign_id: Some("fall".to_string()),
            ..Default::default()
        };
        assert!(query.matches(&schedule));

        let query = ScheduleQuery {
            statuses: vec![ScheduleStatus::Published],
            ..Default::default()
        };
        assert!(!query.matches(&schedule));

        let query = ScheduleQuery {
            to: Some(schedule.scheduled_time),
            ..Default::default()
        };
        assert!(!query.matches(&schedule));
    }

    #[test]
    fn test_bulk_item_request_inherits_batch_fields() {
        let batch = BulkScheduleRequest {
            brand_id: "brand-9".to_string(),
            created_by: "importer".to_string(),
            items: vec![],
            strategy: DistributionStrategy::Custom,
            time_range: None,
            custom_times: vec![],
            timezone: Some("Europe/Paris".to_string()),
            max_retries: Some(1),
            allow_conflicts: true,
        };
        let item = BulkItem {
            content_id: None,
            title: "Post".to_string(),
            description: None,
            content: ContentBody::default(),
            platforms: vec![Platform::Instagram],
            content_type: ContentType::Image,
            campaign: None,
            tags: vec![],
            priority: Priority::High,
            notification_settings: None,
            scheduled_time: None,
        };
        let when = Utc::now();
        let request = batch.item_request(&item, when);
        assert_eq!(request.brand_id, "brand-9");
        assert_eq!(request.created_by, "importer");
        assert_eq!(request.scheduled_time, when);
        assert_eq!(request.max_retries, Some(1));
        assert!(request.allow_conflicts);
    }
}
