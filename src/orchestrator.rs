//! Scheduling orchestrator.
//!
//! One API surface over the scheduling engine and the publishing manager,
//! for the calendar UI, bulk import and the sweep driver.

use chrono::{NaiveDate, Utc};
use std::sync::Arc;

use crate::advisor::Advisor;
use crate::config::GlobalConfig;
use crate::domain::{
    BulkScheduleRequest, BulkScheduleResult, CalendarView, ContentType, Platform, PublishingStatus, ScheduleQuery,
    ScheduleRequest, ScheduleStatus, ScheduleUpdate, ScheduledContent, SchedulingConflict, TimeRange, TimeSuggestion,
    ViewType,
};
use crate::engine::SchedulingEngine;
use crate::error::Result;
use crate::metrics::{MetricsCollector, NoopMetricsCollector};
use crate::notify::{LogNotifier, NotificationService};
use crate::platform::{DryRunPublisher, PlatformPublisher};
use crate::publishing::{NotificationReport, PublishingManager, SweepReport};
use crate::store::{ScheduleRepository, ScheduleStore};

/// The external collaborators an orchestrator is wired to.
pub struct Collaborators {
    pub repository: Arc<dyn ScheduleRepository>,
    pub publisher: Arc<dyn PlatformPublisher>,
    pub notifier: Arc<dyn NotificationService>,
    pub metrics: Arc<dyn MetricsCollector>,
}

impl Collaborators {
    /// File-backed store, dry-run publishing and log notifications.
    pub fn local(config: &GlobalConfig) -> Result<Self> {
        let store = ScheduleStore::open_at(&config.storage.data_dir)?;
        Ok(Self {
            repository: Arc::new(store),
            publisher: Arc::new(DryRunPublisher::new(config.platforms.clone())),
            notifier: Arc::new(LogNotifier::new()),
            metrics: Arc::new(NoopMetricsCollector),
        })
    }
}

#[derive(Debug)]
pub struct SchedulingOrchestrator {
    engine: SchedulingEngine,
    publishing: Arc<PublishingManager>,
}

impl SchedulingOrchestrator {
    pub fn new(config: &GlobalConfig, collaborators: Collaborators) -> Self {
        let publishing = Arc::new(PublishingManager::new(
            collaborators.repository.clone(),
            collaborators.publisher,
            collaborators.notifier,
            collaborators.metrics,
            config.scheduling.clone(),
            config.sweep.clone(),
        ));
        let advisor = Advisor::new(config.scheduling.clone(), config.platforms.clone());
        let engine = SchedulingEngine::new(collaborators.repository, publishing.clone(), advisor);
        Self { engine, publishing }
    }

    /// Orchestrator over the local collaborators.
    pub fn open(config: &GlobalConfig) -> Result<Self> {
        Ok(Self::new(config, Collaborators::local(config)?))
    }

    pub fn engine(&self) -> &SchedulingEngine {
        &self.engine
    }

    pub fn publishing(&self) -> &Arc<PublishingManager> {
        &self.publishing
    }

    //=== Scheduling ===

    pub async fn schedule_content(&self, request: ScheduleRequest) -> Result<ScheduledContent> {
        self.engine.schedule_content(request).await
    }

    pub async fn bulk_schedule_content(&self, request: &BulkScheduleRequest) -> Result<BulkScheduleResult> {
        self.engine.bulk_schedule_content(request).await
    }

    pub async fn check_scheduling_conflicts(&self, schedule: &ScheduledContent) -> Result<Vec<SchedulingConflict>> {
        self.engine.check_scheduling_conflicts(schedule).await
    }

    pub async fn suggest_optimal_times(
        &self,
        brand_id: &str,
        platforms: &[Platform],
        content_type: ContentType,
        time_range: TimeRange,
        count: usize,
    ) -> Result<Vec<TimeSuggestion>> {
        self.engine
            .suggest_optimal_times(brand_id, platforms, content_type, time_range, count)
            .await
    }

    /// Edit a schedule. Every edit passes the conflict gate; with a user the
    /// edit is also notified and attributed.
    pub async fn update_scheduled_content(
        &self,
        id: &str,
        update: ScheduleUpdate,
        user_id: Option<&str>,
    ) -> Result<ScheduledContent> {
        self.engine
            .update_scheduled_content_as(id, update, user_id, Utc::now())
            .await
    }

    /// Cancel a schedule. With a user the edit lock window applies and the
    /// cancellation is notified.
    pub async fn cancel_scheduled_content(
        &self,
        id: &str,
        reason: Option<&str>,
        user_id: Option<&str>,
    ) -> Result<ScheduledContent> {
        match user_id {
            Some(user) => {
                self.publishing
                    .cancel_scheduled_content(id, reason.unwrap_or("cancelled by user"), user)
                    .await
            }
            None => self.engine.cancel_scheduled_content(id, reason).await,
        }
    }

    //=== Queries ===

    pub async fn get_scheduled_content(&self, query: &ScheduleQuery) -> Result<Vec<ScheduledContent>> {
        self.engine.get_scheduled_content(query).await
    }

    pub async fn get_schedule(&self, id: &str) -> Result<ScheduledContent> {
        self.engine.get_schedule(id).await
    }

    pub async fn get_calendar_view(
        &self,
        brand_id: &str,
        view_type: ViewType,
        start_date: NaiveDate,
        timezone: Option<&str>,
    ) -> Result<CalendarView> {
        self.engine
            .get_calendar_view(brand_id, view_type, start_date, timezone)
            .await
    }

    pub async fn get_publishing_status(&self, id: &str) -> Result<Vec<PublishingStatus>> {
        self.publishing.get_publishing_status(id).await
    }

    //=== Sweeps ===

    /// One publishing sweep and one notification sweep, then drop finished
    /// reminder timers.
    pub async fn run_sweep(&self) -> Result<(SweepReport, NotificationReport)> {
        let publishing = self.publishing.process_publishing_queue().await?;
        let notifications = self.publishing.process_notification_queue().await?;
        let reaped = self.publishing.timers().reap().await;
        if reaped > 0 {
            tracing::debug!(reaped, "Dropped finished reminder timers");
        }
        Ok((publishing, notifications))
    }

    /// Re-arm local reminder timers for queued schedules after a restart.
    ///
    /// Reminders already due are left to the notification sweep.
    pub async fn restore_reminders(&self) -> Result<usize> {
        let now = Utc::now();
        let query = ScheduleQuery {
            statuses: vec![ScheduleStatus::Scheduled],
            from: Some(now),
            ..Default::default()
        };
        let mut restored = 0;
        for schedule in self.engine.get_scheduled_content(&query).await? {
            if schedule.reminder_at.is_some_and(|at| at > now)
                && self.publishing.arm_reminder(&schedule).await.is_some()
            {
                restored += 1;
            }
        }
        if restored > 0 {
            tracing::info!(restored, "Reminder timers restored");
        }
        Ok(restored)
    }

    /// Abort local timers before exit.
    pub async fn shutdown(&self) {
        self.publishing.shutdown().await;
    }
}
