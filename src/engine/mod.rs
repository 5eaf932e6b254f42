//! Content scheduling engine.
//!
//! Front door for creating and changing schedules:
//! - shape validation and conflict-gated acceptance (with optional auto-resolve)
//! - bulk scheduling with even, optimal or custom distribution
//! - edits and cancellations routed through the publishing manager's
//!   conditional writes
//! - filtered listing and calendar views

mod bulk;
mod calendar;
mod validate;

use chrono::{DateTime, Duration, Utc};
use std::cmp::Ordering;
use std::sync::Arc;

use crate::advisor::{Advisor, SuggestionQuery};
use crate::config::{SchedulingConfig, parse_timezone};
use crate::domain::{
    ContentType, Platform, ScheduleQuery, ScheduleRequest, ScheduleStatus, ScheduleUpdate, ScheduledContent,
    SchedulingConflict, SortField, SortOrder, TimeRange, TimeSuggestion,
};
use crate::error::{CadenceError, Result};
use crate::id::generate_schedule_id;
use crate::publishing::{PublishingManager, validate_update};
use crate::store::ScheduleRepository;

pub use calendar::week_start;

pub struct SchedulingEngine {
    repo: Arc<dyn ScheduleRepository>,
    publishing: Arc<PublishingManager>,
    advisor: Advisor,
}

impl std::fmt::Debug for SchedulingEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchedulingEngine")
            .field("advisor", &self.advisor)
            .finish_non_exhaustive()
    }
}

impl SchedulingEngine {
    pub fn new(repo: Arc<dyn ScheduleRepository>, publishing: Arc<PublishingManager>, advisor: Advisor) -> Self {
        Self {
            repo,
            publishing,
            advisor,
        }
    }

    pub fn advisor(&self) -> &Advisor {
        &self.advisor
    }

    fn scheduling(&self) -> &SchedulingConfig {
        self.advisor.scheduling()
    }

    /// Validate, conflict-check and persist a new schedule.
    ///
    /// Blocking conflicts reject the request with `Conflict` unless
    /// `allow_conflicts` is set. With `auto_resolve`, a schedule whose blocking
    /// conflicts all carry a suggested time is moved there and checked again,
    /// up to the configured number of passes.
    pub async fn schedule_content(&self, request: ScheduleRequest) -> Result<ScheduledContent> {
        self.schedule_content_at(request, Utc::now()).await
    }

    pub async fn schedule_content_at(&self, request: ScheduleRequest, now: DateTime<Utc>) -> Result<ScheduledContent> {
        let (platforms, timezone) = validate::validate_request(&request, self.scheduling(), now)?;
        let mut record = ScheduledContent {
            id: generate_schedule_id(),
            brand_id: request.brand_id,
            content_id: request.content_id,
            title: request.title,
            description: request.description,
            content: request.content,
            platforms,
            content_type: request.content_type,
            campaign: request.campaign,
            tags: request.tags,
            scheduled_time: request.scheduled_time,
            timezone,
            status: if request.draft {
                ScheduleStatus::Draft
            } else {
                ScheduleStatus::Scheduled
            },
            priority: request.priority,
            retry_count: 0,
            max_retries: request.max_retries.unwrap_or(self.scheduling().default_max_retries),
            notification_settings: request.notification_settings,
            reminder_at: None,
            reminder_notification_id: None,
            notifications: Vec::new(),
            platform_results: Vec::new(),
            created_by: request.created_by,
            created_at: now,
            updated_at: now,
            revision: 0,
            published_at: None,
            failure_reason: None,
            cancellation_reason: None,
        };

        if !request.allow_conflicts {
            let requested = record.scheduled_time;
            let accepted = self.gate(&mut record, request.auto_resolve).await?;
            if record.scheduled_time != requested {
                tracing::info!(
                    brand_id = %record.brand_id,
                    requested = %requested.to_rfc3339(),
                    moved_to = %record.scheduled_time.to_rfc3339(),
                    "Auto-resolved conflicts by rescheduling"
                );
            }
            for conflict in accepted {
                tracing::debug!(
                    brand_id = %record.brand_id,
                    conflict = conflict.conflict_type.as_str(),
                    severity = conflict.severity.as_str(),
                    "Accepted with non-blocking conflict"
                );
            }
        }

        self.repo.insert_schedule(&record).await?;
        tracing::info!(
            schedule_id = %record.id,
            brand_id = %record.brand_id,
            status = record.status.as_str(),
            scheduled_time = %record.scheduled_time.to_rfc3339(),
            "Schedule created"
        );

        if record.status == ScheduleStatus::Scheduled
            && let Some(at) = self.publishing.arm_reminder(&record).await
        {
            record.reminder_at = Some(at);
            if let Some(stored) = self.repo.get_schedule_by_id(&record.id).await? {
                record = stored;
            }
        }
        Ok(record)
    }

    /// Run conflict checks, moving the record when auto-resolve allows it.
    ///
    /// Returns the non-blocking conflicts the record was accepted with.
    async fn gate(&self, record: &mut ScheduledContent, auto_resolve: bool) -> Result<Vec<SchedulingConflict>> {
        let passes = self.scheduling().auto_resolve_passes;
        let mut pass = 0;
        loop {
            let conflicts = self.check_scheduling_conflicts(record).await?;
            let (blocking, advisory): (Vec<_>, Vec<_>) = conflicts.into_iter().partition(|c| c.is_blocking());
            if blocking.is_empty() {
                return Ok(advisory);
            }
            if !auto_resolve || pass >= passes {
                return Err(CadenceError::Conflict(blocking));
            }

            let moves: Option<Vec<DateTime<Utc>>> = blocking.iter().map(|c| c.auto_resolution_time()).collect();
            let next = match moves.and_then(|times| times.into_iter().max()) {
                Some(next) if next > record.scheduled_time => next,
                _ => return Err(CadenceError::Conflict(blocking)),
            };
            tracing::debug!(pass, from = %record.scheduled_time.to_rfc3339(), to = %next.to_rfc3339(), "Auto-resolve pass");
            record.scheduled_time = next;
            pass += 1;
        }
    }

    /// Conflicts `schedule` has with the brand's other schedules. Read only.
    pub async fn check_scheduling_conflicts(&self, schedule: &ScheduledContent) -> Result<Vec<SchedulingConflict>> {
        let (start, end) = self.advisor.conflict_window(schedule.scheduled_time);
        let existing = self.repo.list_in_window(&schedule.brand_id, start, end).await?;
        Ok(self.advisor.detect_conflicts(schedule, &existing))
    }

    /// Ranked publication instants for new content, in the default timezone.
    pub async fn suggest_optimal_times(
        &self,
        brand_id: &str,
        platforms: &[Platform],
        content_type: ContentType,
        time_range: TimeRange,
        count: usize,
    ) -> Result<Vec<TimeSuggestion>> {
        let query = SuggestionQuery {
            brand_id: brand_id.to_string(),
            platforms: platforms.to_vec(),
            content_type,
            range: time_range,
            count,
            timezone: self.scheduling().default_tz()?,
        };
        self.suggest_at(&query, Utc::now()).await
    }

    pub(crate) async fn suggest_at(&self, query: &SuggestionQuery, now: DateTime<Utc>) -> Result<Vec<TimeSuggestion>> {
        // Daily limits look at the whole local day on either side of the range
        let margin = Duration::days(1);
        let existing = self
            .repo
            .list_in_window(&query.brand_id, query.range.start - margin, query.range.end + margin)
            .await?;
        Ok(self.advisor.suggest_times(query, &existing, now))
    }

    /// Apply an edit on the engine's behalf.
    ///
    /// A change to time or platforms is conflict-checked unless the update
    /// sets `allow_conflicts`. No edit notification is sent.
    pub async fn update_scheduled_content(&self, id: &str, update: ScheduleUpdate) -> Result<ScheduledContent> {
        self.update_scheduled_content_as(id, update, None, Utc::now()).await
    }

    pub async fn update_scheduled_content_at(
        &self,
        id: &str,
        update: ScheduleUpdate,
        now: DateTime<Utc>,
    ) -> Result<ScheduledContent> {
        self.update_scheduled_content_as(id, update, None, now).await
    }

    /// Conflict-gated edit shared by engine and user-attributed callers.
    ///
    /// With an `editor` the edit notification names them.
    pub async fn update_scheduled_content_as(
        &self,
        id: &str,
        update: ScheduleUpdate,
        editor: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<ScheduledContent> {
        let current = self
            .repo
            .get_schedule_by_id(id)
            .await?
            .ok_or_else(|| CadenceError::NotFound(id.to_string()))?;
        current.ensure_mutable(now, self.scheduling().edit_lock())?;
        validate_update(&current, &update, self.scheduling(), now)?;

        let moves = update.scheduled_time.is_some() || update.platforms.is_some() || update.publish;
        if moves && !update.allow_conflicts {
            let mut candidate = current.clone();
            candidate.apply_update(&update);
            let blocking: Vec<SchedulingConflict> = self
                .check_scheduling_conflicts(&candidate)
                .await?
                .into_iter()
                .filter(|c| c.is_blocking())
                .collect();
            if !blocking.is_empty() {
                tracing::info!(schedule_id = %id, blocking = blocking.len(), editor = editor.unwrap_or("engine"), "Edit rejected by conflicts");
                return Err(CadenceError::Conflict(blocking));
            }
        }

        self.publishing.apply_edit(id, &update, editor, now).await
    }

    /// Cancel a draft or queued schedule.
    pub async fn cancel_scheduled_content(&self, id: &str, reason: Option<&str>) -> Result<ScheduledContent> {
        self.publishing.apply_cancel(id, reason, None, false, Utc::now()).await
    }

    /// Filtered, sorted, paginated listing.
    pub async fn get_scheduled_content(&self, query: &ScheduleQuery) -> Result<Vec<ScheduledContent>> {
        let mut schedules: Vec<ScheduledContent> = self
            .repo
            .list_schedules(query.brand_id.as_deref())
            .await?
            .into_iter()
            .filter(|s| query.matches(s))
            .collect();

        schedules.sort_by(|a, b| {
            let ord = match query.sort_by {
                SortField::ScheduledTime => a.scheduled_time.cmp(&b.scheduled_time),
                SortField::CreatedAt => a.created_at.cmp(&b.created_at),
                SortField::Priority => a.priority.cmp(&b.priority),
            };
            let ord = match query.sort_order {
                SortOrder::Asc => ord,
                SortOrder::Desc => ord.reverse(),
            };
            if ord == Ordering::Equal {
                a.id.cmp(&b.id)
            } else {
                ord
            }
        });

        Ok(schedules
            .into_iter()
            .skip(query.offset)
            .take(query.limit.unwrap_or(usize::MAX))
            .collect())
    }

    pub async fn get_schedule(&self, id: &str) -> Result<ScheduledContent> {
        self.repo
            .get_schedule_by_id(id)
            .await?
            .ok_or_else(|| CadenceError::NotFound(id.to_string()))
    }

    fn zone(&self, timezone: Option<&str>) -> Result<chrono_tz::Tz> {
        match timezone {
            Some(name) => parse_timezone(name),
            None => self.scheduling().default_tz(),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::harness::{harness, harness_with, sample_request};
    use super::*;
    use crate::domain::{NotificationKind, NotificationSettings, Priority};

    #[tokio::test]
    async fn test_schedule_persists_and_arms_reminder() {
        let h = harness();
        let mut request = sample_request();
        request.notification_settings = Some(NotificationSettings::default());

        let schedule = h.engine.schedule_content(request.clone()).await.unwrap();

        assert_eq!(schedule.status, ScheduleStatus::Scheduled);
        assert_eq!(schedule.max_retries, 3);
        assert_eq!(schedule.reminder_at, Some(request.scheduled_time - Duration::minutes(30)));
        assert!(h.manager.timers().is_armed(&schedule.id).await);
        assert!(h.store.get_schedule_by_id(&schedule.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_configured_lead_fills_unset_reminder_minutes() {
        let h = harness_with(SchedulingConfig {
            pre_publish_minutes: 45,
            ..Default::default()
        });
        let mut request = sample_request();
        request.notification_settings = Some(NotificationSettings::default());
        let schedule = h.engine.schedule_content(request.clone()).await.unwrap();
        assert_eq!(schedule.reminder_at, Some(request.scheduled_time - Duration::minutes(45)));

        let mut request = sample_request();
        request.title = "Explicit lead".to_string();
        request.content.text = "Nothing alike here at all".to_string();
        request.scheduled_time += Duration::hours(6);
        request.notification_settings = Some(NotificationSettings {
            pre_publish_minutes: Some(10),
            ..Default::default()
        });
        let schedule = h.engine.schedule_content(request.clone()).await.unwrap();
        assert_eq!(schedule.reminder_at, Some(request.scheduled_time - Duration::minutes(10)));
    }

    #[tokio::test]
    async fn test_draft_gets_no_reminder() {
        let h = harness();
        let mut request = sample_request();
        request.draft = true;
        request.notification_settings = Some(NotificationSettings::default());

        let schedule = h.engine.schedule_content(request).await.unwrap();

        assert_eq!(schedule.status, ScheduleStatus::Draft);
        assert!(schedule.reminder_at.is_none());
        assert!(h.notifier.scheduled().is_empty());
    }

    #[tokio::test]
    async fn test_overlap_rejected_with_conflict() {
        let h = harness();
        let first = h.engine.schedule_content(sample_request()).await.unwrap();

        let mut request = sample_request();
        request.scheduled_time = first.scheduled_time + Duration::minutes(5);
        let err = h.engine.schedule_content(request).await.unwrap_err();

        match err {
            CadenceError::Conflict(conflicts) => {
                assert!(conflicts.iter().all(|c| c.is_blocking()));
                assert!(conflicts[0].conflicting_schedule_ids.contains(&first.id));
            }
            other => panic!("expected conflict, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_allow_conflicts_accepts() {
        let h = harness();
        let first = h.engine.schedule_content(sample_request()).await.unwrap();

        let mut request = sample_request();
        request.scheduled_time = first.scheduled_time + Duration::minutes(5);
        request.allow_conflicts = true;
        assert!(h.engine.schedule_content(request).await.is_ok());
    }

    #[tokio::test]
    async fn test_auto_resolve_moves_schedule() {
        let h = harness();
        let first = h.engine.schedule_content(sample_request()).await.unwrap();

        let mut request = sample_request();
        request.title = "Different post".to_string();
        request.content.text = "Fresh arrivals in store today".to_string();
        request.scheduled_time = first.scheduled_time + Duration::minutes(5);
        request.auto_resolve = true;
        let moved = h.engine.schedule_content(request.clone()).await.unwrap();

        assert!(moved.scheduled_time > request.scheduled_time);
        let conflicts = h.engine.check_scheduling_conflicts(&moved).await.unwrap();
        assert!(conflicts.iter().all(|c| !c.is_blocking()));
    }

    #[tokio::test]
    async fn test_update_rejects_conflicting_move() {
        let h = harness();
        let first = h.engine.schedule_content(sample_request()).await.unwrap();
        let mut request = sample_request();
        request.title = "Other".to_string();
        request.content.text = "Completely unrelated words".to_string();
        request.scheduled_time = first.scheduled_time + Duration::hours(6);
        let second = h.engine.schedule_content(request).await.unwrap();

        let update = ScheduleUpdate {
            scheduled_time: Some(first.scheduled_time + Duration::minutes(1)),
            ..Default::default()
        };
        let err = h.engine.update_scheduled_content(&second.id, update).await.unwrap_err();
        assert!(matches!(err, CadenceError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_attributed_edit_hits_conflict_gate() {
        let h = harness();
        let first = h.engine.schedule_content(sample_request()).await.unwrap();
        let mut request = sample_request();
        request.title = "Other".to_string();
        request.content.text = "Completely unrelated words".to_string();
        request.scheduled_time = first.scheduled_time + Duration::hours(6);
        let second = h.engine.schedule_content(request).await.unwrap();

        let mut update = ScheduleUpdate {
            scheduled_time: Some(first.scheduled_time + Duration::minutes(1)),
            ..Default::default()
        };
        let err = h
            .engine
            .update_scheduled_content_as(&second.id, update.clone(), Some("sam"), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, CadenceError::Conflict(_)));
        assert!(h.notifier.sent_of_kind(NotificationKind::Edited).is_empty());
        let stored = h.engine.get_schedule(&second.id).await.unwrap();
        assert_eq!(stored.scheduled_time, second.scheduled_time);

        update.allow_conflicts = true;
        let moved = h
            .engine
            .update_scheduled_content_as(&second.id, update, Some("sam"), Utc::now())
            .await
            .unwrap();
        assert_eq!(moved.scheduled_time, first.scheduled_time + Duration::minutes(1));
        assert_eq!(h.notifier.sent_of_kind(NotificationKind::Edited).len(), 1);
    }

    #[tokio::test]
    async fn test_draft_near_its_time_stays_editable() {
        let h = harness();
        let mut request = sample_request();
        request.draft = true;
        request.scheduled_time = Utc::now() + Duration::minutes(2);
        let draft = h.engine.schedule_content(request).await.unwrap();

        let edited = h
            .engine
            .update_scheduled_content_as(
                &draft.id,
                ScheduleUpdate {
                    title: Some("Spring sale, reworded".to_string()),
                    ..Default::default()
                },
                Some("sam"),
                Utc::now(),
            )
            .await
            .unwrap();
        assert_eq!(edited.title, "Spring sale, reworded");

        let cancelled = h
            .manager
            .cancel_scheduled_content(&draft.id, "not needed", "sam")
            .await
            .unwrap();
        assert_eq!(cancelled.status, ScheduleStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_update_publishes_draft() {
        let h = harness();
        let mut request = sample_request();
        request.draft = true;
        let draft = h.engine.schedule_content(request).await.unwrap();

        let updated = h
            .engine
            .update_scheduled_content(
                &draft.id,
                ScheduleUpdate {
                    publish: true,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.status, ScheduleStatus::Scheduled);
        assert!(h.notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn test_update_published_fails_with_state() {
        let h = harness();
        let schedule = h.engine.schedule_content(sample_request()).await.unwrap();
        for status in [ScheduleStatus::Publishing, ScheduleStatus::Published] {
            h.store.update_schedule_status(&schedule.id, status, None).await.unwrap();
        }

        let err = h
            .engine
            .update_scheduled_content(
                &schedule.id,
                ScheduleUpdate {
                    title: Some("late change".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CadenceError::State(_)));
        let err = h.engine.cancel_scheduled_content(&schedule.id, None).await.unwrap_err();
        assert!(matches!(err, CadenceError::State(_)));
    }

    #[tokio::test]
    async fn test_cancel_draft_disarms() {
        let h = harness();
        let mut request = sample_request();
        request.draft = true;
        let draft = h.engine.schedule_content(request).await.unwrap();

        let cancelled = h.engine.cancel_scheduled_content(&draft.id, Some("dropped")).await.unwrap();

        assert_eq!(cancelled.status, ScheduleStatus::Cancelled);
        assert!(!h.manager.timers().is_armed(&draft.id).await);
    }

    #[tokio::test]
    async fn test_query_sort_and_paginate() {
        let h = harness();
        let base = Utc::now() + Duration::days(2);
        for (i, priority) in [Priority::Low, Priority::Urgent, Priority::High].into_iter().enumerate() {
            let mut request = sample_request();
            request.title = format!("Post {}", i);
            request.content.text = format!("unique body number {}", i);
            request.scheduled_time = base + Duration::hours(3 * i as i64);
            request.priority = priority;
            h.engine.schedule_content(request).await.unwrap();
        }

        let query = ScheduleQuery {
            brand_id: Some("brand-1".to_string()),
            sort_by: SortField::Priority,
            sort_order: SortOrder::Desc,
            limit: Some(2),
            ..Default::default()
        };
        let page = h.engine.get_scheduled_content(&query).await.unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].priority, Priority::Urgent);
        assert_eq!(page[1].priority, Priority::High);

        let rest = h
            .engine
            .get_scheduled_content(&ScheduleQuery { offset: 2, ..query })
            .await
            .unwrap();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].priority, Priority::Low);
    }
}
