//! Publishing manager implementation.

use chrono::{DateTime, Duration, Utc};
use futures::FutureExt;
use futures::future::join_all;
use serde_json::json;
use std::any::Any;
use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::task::JoinHandle;

use super::notices;
use super::timers::TimerRegistry;
use crate::config::{SchedulingConfig, SweepConfig, parse_timezone};
use crate::domain::{
    NotificationKind, NotificationRecord, Platform, PlatformResult, PublishErrorDetail, PublishingStatus,
    ScheduleStatus, ScheduleUpdate, ScheduledContent,
};
use crate::error::{CadenceError, Result};
use crate::metrics::MetricsCollector;
use crate::notify::NotificationService;
use crate::platform::PlatformPublisher;
use crate::store::ScheduleRepository;

/// Reloads a conditional write makes before reporting a concurrent change.
const WRITE_PASSES: usize = 3;

/// How one publish attempt ended for the parent schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// Every platform published
    Published,
    /// Some platforms published; the schedule is `published` with an annotation
    PartiallyPublished,
    /// Nothing published; requeued for the given time
    Retrying(DateTime<Utc>),
    /// Nothing published and the retry budget is spent
    Failed,
}

/// Moves schedules through publishing and owns their reminder timers.
pub struct PublishingManager {
    repo: Arc<dyn ScheduleRepository>,
    publisher: Arc<dyn PlatformPublisher>,
    notifier: Arc<dyn NotificationService>,
    metrics: Arc<dyn MetricsCollector>,
    pub(super) scheduling: SchedulingConfig,
    pub(super) sweep: SweepConfig,
    timers: TimerRegistry,
}

impl std::fmt::Debug for PublishingManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PublishingManager")
            .field("scheduling", &self.scheduling)
            .field("sweep", &self.sweep)
            .finish_non_exhaustive()
    }
}

impl PublishingManager {
    pub fn new(
        repo: Arc<dyn ScheduleRepository>,
        publisher: Arc<dyn PlatformPublisher>,
        notifier: Arc<dyn NotificationService>,
        metrics: Arc<dyn MetricsCollector>,
        scheduling: SchedulingConfig,
        sweep: SweepConfig,
    ) -> Self {
        Self {
            repo,
            publisher,
            notifier,
            metrics,
            scheduling,
            sweep,
            timers: TimerRegistry::new(),
        }
    }

    pub fn repository(&self) -> &Arc<dyn ScheduleRepository> {
        &self.repo
    }

    pub fn notifier(&self) -> &Arc<dyn NotificationService> {
        &self.notifier
    }

    pub fn scheduling(&self) -> &SchedulingConfig {
        &self.scheduling
    }

    pub fn timers(&self) -> &TimerRegistry {
        &self.timers
    }

    pub(super) async fn load(&self, id: &str) -> Result<ScheduledContent> {
        self.repo
            .get_schedule_by_id(id)
            .await?
            .ok_or_else(|| CadenceError::NotFound(id.to_string()))
    }

    //=== Reminders ===

    /// Arm the pre-publish reminder `pre_publish_minutes` before publication.
    ///
    /// Registers a durable notification and a local timer backstop, replacing
    /// whatever was armed for the schedule before. Returns the reminder time,
    /// or None when that time has already passed or the schedule is not queued.
    pub async fn schedule_pre_publish_notifications(
        &self,
        schedule: &ScheduledContent,
        pre_publish_minutes: i64,
    ) -> Result<Option<DateTime<Utc>>> {
        self.schedule_pre_publish_notifications_at(schedule, pre_publish_minutes, Utc::now())
            .await
    }

    pub async fn schedule_pre_publish_notifications_at(
        &self,
        schedule: &ScheduledContent,
        pre_publish_minutes: i64,
        now: DateTime<Utc>,
    ) -> Result<Option<DateTime<Utc>>> {
        for _ in 0..WRITE_PASSES {
            let mut current = self.load(&schedule.id).await?;
            let remind_at = current.scheduled_time - Duration::minutes(pre_publish_minutes);
            if remind_at <= now {
                tracing::warn!(
                    schedule_id = %current.id,
                    remind_at = %remind_at.to_rfc3339(),
                    "Pre-publish reminder time already passed, not scheduling"
                );
                return Ok(None);
            }
            if current.status != ScheduleStatus::Scheduled {
                tracing::debug!(schedule_id = %current.id, status = current.status.as_str(), "No reminder for unqueued schedule");
                return Ok(None);
            }

            self.cancel_timers(&current.id, current.reminder_notification_id.take()).await;

            let notification = notices::reminder(&current, pre_publish_minutes);
            let durable_id = match self.notifier.schedule_notification(&notification, remind_at).await {
                Ok(id) => Some(id),
                Err(e) => {
                    tracing::warn!(schedule_id = %current.id, error = %e, "Durable reminder registration failed");
                    None
                }
            };

            current.reminder_at = Some(remind_at);
            current.reminder_notification_id = durable_id.clone();
            current.touch();
            if !self.repo.replace_if_status(&current, &[ScheduleStatus::Scheduled]).await? {
                if let Some(id) = &durable_id {
                    self.cancel_durable(id).await;
                }
                tracing::debug!(schedule_id = %current.id, "Schedule changed while arming reminder, reloading");
                continue;
            }

            let handle = self.spawn_reminder_timer(&current.id, remind_at);
            if let Some(replaced) = self.timers.arm(&current.id, remind_at, durable_id, handle).await {
                self.cancel_durable(&replaced).await;
            }
            tracing::info!(
                schedule_id = %current.id,
                remind_at = %remind_at.to_rfc3339(),
                "Pre-publish reminder armed"
            );
            return Ok(Some(remind_at));
        }
        tracing::warn!(schedule_id = %schedule.id, "Reminder not armed, schedule kept changing");
        Ok(None)
    }

    /// Arm the reminder a queued schedule's settings ask for. Failures are logged.
    pub async fn arm_reminder(&self, schedule: &ScheduledContent) -> Option<DateTime<Utc>> {
        if schedule.status != ScheduleStatus::Scheduled {
            return None;
        }
        let minutes = schedule
            .notification_settings
            .as_ref()?
            .pre_publish_minutes
            .unwrap_or(self.scheduling.pre_publish_minutes);
        match self.schedule_pre_publish_notifications(schedule, minutes).await {
            Ok(at) => at,
            Err(e) => {
                tracing::warn!(schedule_id = %schedule.id, error = %e, "Failed to arm reminder");
                None
            }
        }
    }

    fn spawn_reminder_timer(&self, schedule_id: &str, fire_at: DateTime<Utc>) -> JoinHandle<()> {
        let repo = self.repo.clone();
        let notifier = self.notifier.clone();
        let schedule_id = schedule_id.to_string();
        tokio::spawn(async move {
            let wait = (fire_at - Utc::now()).to_std().unwrap_or_default();
            tokio::time::sleep(wait).await;
            let now = Utc::now().max(fire_at);
            match deliver_reminder(repo.as_ref(), notifier.as_ref(), &schedule_id, now).await {
                Ok(true) => tracing::debug!(schedule_id = %schedule_id, "Reminder delivered by local timer"),
                Ok(false) => {}
                Err(e) => tracing::warn!(schedule_id = %schedule_id, error = %e, "Local reminder timer failed"),
            }
        })
    }

    /// Abort the local timer and cancel every durable reminder known for a schedule.
    async fn cancel_timers(&self, schedule_id: &str, recorded: Option<String>) {
        let mut durable: HashSet<String> = HashSet::new();
        if let Some(id) = self.timers.disarm(schedule_id).await {
            durable.insert(id);
        }
        if let Some(id) = recorded {
            durable.insert(id);
        }
        for id in durable {
            self.cancel_durable(&id).await;
        }
    }

    async fn cancel_durable(&self, notification_id: &str) {
        if let Err(e) = self.notifier.cancel_notification(notification_id).await {
            tracing::warn!(notification_id, error = %e, "Failed to cancel durable notification");
        }
    }

    //=== Publishing ===

    /// Claim a due schedule and publish it to every platform.
    ///
    /// Fails with `ClaimLost` if the schedule is not `scheduled` and due,
    /// including when another worker claimed it first. Returns the
    /// per-platform outcome of this attempt.
    pub async fn publish_scheduled_content(&self, schedule: &ScheduledContent) -> Result<Vec<PublishingStatus>> {
        let (_, statuses) = self.attempt(schedule, Utc::now()).await?;
        Ok(statuses)
    }

    pub(super) async fn attempt(
        &self,
        schedule: &ScheduledContent,
        now: DateTime<Utc>,
    ) -> Result<(AttemptOutcome, Vec<PublishingStatus>)> {
        let Some(claimed) = self.repo.claim_for_publishing(&schedule.id, now).await? else {
            return Err(CadenceError::ClaimLost(schedule.id.clone()));
        };
        let attempt = claimed.attempt();
        tracing::info!(
            schedule_id = %claimed.id,
            attempt,
            platforms = claimed.platforms.len(),
            "Publishing schedule"
        );

        self.cancel_timers(&claimed.id, claimed.reminder_notification_id.clone()).await;

        let results = self.publish_all(&claimed).await;
        let (claimed, outcome) = self.record_attempt(claimed, &results, now).await?;

        self.notify_outcomes(&claimed, &results, attempt).await;

        match outcome {
            AttemptOutcome::Published => tracing::info!(schedule_id = %claimed.id, attempt, "Published"),
            AttemptOutcome::PartiallyPublished => tracing::warn!(
                schedule_id = %claimed.id,
                attempt,
                reason = claimed.failure_reason.as_deref().unwrap_or_default(),
                "Partially published"
            ),
            AttemptOutcome::Retrying(at) => tracing::warn!(
                schedule_id = %claimed.id,
                attempt,
                retry_at = %at.to_rfc3339(),
                "Publish failed, retry scheduled"
            ),
            AttemptOutcome::Failed => tracing::error!(
                schedule_id = %claimed.id,
                attempt,
                reason = claimed.failure_reason.as_deref().unwrap_or_default(),
                "Publish failed permanently"
            ),
        }

        Ok((outcome, results.iter().map(PublishingStatus::from).collect()))
    }

    /// Settle the attempt onto the claimed record and write it back.
    ///
    /// A write that lost to a history append reloads and settles again, as long
    /// as the record is still this attempt's claim.
    async fn record_attempt(
        &self,
        mut record: ScheduledContent,
        results: &[PlatformResult],
        now: DateTime<Utc>,
    ) -> Result<(ScheduledContent, AttemptOutcome)> {
        let retry_count = record.retry_count;
        for _ in 0..WRITE_PASSES {
            let mut settled = record.clone();
            let outcome = self.settle(&mut settled, results.to_vec(), now)?;
            if self.repo.replace_if_status(&settled, &[ScheduleStatus::Publishing]).await? {
                settled.revision += 1;
                return Ok((settled, outcome));
            }

            record = self.load(&record.id).await?;
            if record.status != ScheduleStatus::Publishing || record.retry_count != retry_count {
                break;
            }
            tracing::debug!(schedule_id = %record.id, "Claimed record changed during publish, reloading");
        }
        tracing::warn!(schedule_id = %record.id, "Claim taken over before the attempt was recorded");
        Err(CadenceError::ClaimLost(record.id))
    }

    /// Attempt every platform concurrently. A panic or error on one platform
    /// only fails that platform.
    async fn publish_all(&self, schedule: &ScheduledContent) -> Vec<PlatformResult> {
        let attempts = schedule.platforms.iter().map(|platform| {
            let platform = *platform;
            AssertUnwindSafe(self.publish_platform(schedule, platform))
                .catch_unwind()
                .map(move |caught| {
                    caught.unwrap_or_else(|panic| {
                        let message = panic_message(panic.as_ref());
                        tracing::error!(schedule_id = %schedule.id, platform = %platform, panic = %message, "Platform attempt panicked");
                        PlatformResult::failed(
                            platform,
                            PublishErrorDetail::new(
                                PublishErrorDetail::PUBLISHING_ERROR,
                                format!("unexpected failure: {}", message),
                            ),
                        )
                    })
                })
        });
        join_all(attempts).await
    }

    async fn publish_platform(&self, schedule: &ScheduledContent, platform: Platform) -> PlatformResult {
        match self.publisher.validate_content(platform, schedule).await {
            Ok(report) if !report.valid => {
                let error = CadenceError::PlatformValidation {
                    platform: platform.to_string(),
                    issues: report.issues.clone(),
                };
                tracing::warn!(schedule_id = %schedule.id, platform = %platform, error = %error, "Content rejected");
                return PlatformResult::failed(
                    platform,
                    PublishErrorDetail::new(error.code(), error.to_string()).with_details(json!({ "issues": report.issues })),
                );
            }
            Ok(_) => {}
            Err(e) => {
                return PlatformResult::failed(
                    platform,
                    PublishErrorDetail::new(PublishErrorDetail::PUBLISHING_ERROR, e.to_string())
                        .with_details(json!({ "stage": "validate" })),
                );
            }
        }

        let result = match self.publisher.publish_content(platform, schedule).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(schedule_id = %schedule.id, platform = %platform, error = %e, "Publish call failed");
                return PlatformResult::failed(
                    platform,
                    PublishErrorDetail::new(PublishErrorDetail::PUBLISHING_ERROR, e.to_string())
                        .with_details(json!({ "stage": "publish" })),
                );
            }
        };

        let post_id = match (result.success, result.platform_post_id) {
            (true, Some(post_id)) => post_id,
            (true, None) => {
                return PlatformResult::failed(
                    platform,
                    PublishErrorDetail::new(
                        PublishErrorDetail::PUBLISH_FAILED,
                        "platform reported success without a post id",
                    ),
                );
            }
            (false, _) => {
                let error = result.error.unwrap_or_else(|| {
                    let refused = CadenceError::Publish {
                        platform: platform.to_string(),
                        message: "refused without detail".to_string(),
                    };
                    PublishErrorDetail::new(refused.code(), refused.to_string())
                });
                tracing::warn!(schedule_id = %schedule.id, platform = %platform, code = %error.code, "Platform refused post");
                return PlatformResult::failed(platform, error);
            }
        };

        let metrics = match self.metrics.collect_initial_metrics(platform, &post_id).await {
            Ok(metrics) => Some(metrics),
            Err(e) => {
                tracing::warn!(schedule_id = %schedule.id, platform = %platform, error = %e, "Initial metrics unavailable");
                None
            }
        };
        PlatformResult::published(platform, post_id, metrics)
    }

    /// Derive the parent status from per-platform results.
    ///
    /// Nothing published with budget left takes the retry edge back to
    /// `scheduled` at `now + backoff(retry_count)`.
    fn settle(
        &self,
        record: &mut ScheduledContent,
        results: Vec<PlatformResult>,
        now: DateTime<Utc>,
    ) -> Result<AttemptOutcome> {
        let total = results.len();
        let published = results.iter().filter(|r| r.is_published()).count();
        let failures: Vec<String> = results
            .iter()
            .filter(|r| !r.is_published())
            .map(|r| {
                format!(
                    "{}: {}",
                    r.platform,
                    r.error.as_ref().map(|e| e.message.as_str()).unwrap_or("unknown error")
                )
            })
            .collect();
        record.platform_results = results;

        if published == total {
            record.transition(ScheduleStatus::Published)?;
            record.published_at = Some(now);
            record.failure_reason = None;
            return Ok(AttemptOutcome::Published);
        }
        if published > 0 {
            record.transition(ScheduleStatus::Published)?;
            record.published_at = Some(now);
            record.failure_reason = Some(format!(
                "Partial success: {} of {} platforms published; {}",
                published,
                total,
                failures.join("; ")
            ));
            return Ok(AttemptOutcome::PartiallyPublished);
        }

        self.fail_attempt(record, &failures.join("; "), now)
    }

    /// Route a failed attempt through the retry budget.
    pub(super) fn fail_attempt(
        &self,
        record: &mut ScheduledContent,
        summary: &str,
        now: DateTime<Utc>,
    ) -> Result<AttemptOutcome> {
        let attempt = record.attempt();
        if record.retries_left() {
            let retry_at = now + self.scheduling.backoff(record.retry_count);
            record.transition(ScheduleStatus::Scheduled)?;
            record.retry_count += 1;
            record.scheduled_time = retry_at;
            record.reminder_at = None;
            record.reminder_notification_id = None;
            record.failure_reason = Some(format!("Attempt {} failed: {}", attempt, summary));
            Ok(AttemptOutcome::Retrying(retry_at))
        } else {
            record.transition(ScheduleStatus::Failed)?;
            record.failure_reason = Some(format!(
                "Max retries exceeded after {} attempt(s): {}",
                attempt, summary
            ));
            Ok(AttemptOutcome::Failed)
        }
    }

    /// Success/failure notifications, at most one per (kind, platform, attempt).
    async fn notify_outcomes(&self, schedule: &ScheduledContent, results: &[PlatformResult], attempt: u32) {
        let settings = schedule.notification_settings.clone().unwrap_or_default();
        for result in results {
            let (kind, wanted) = if result.is_published() {
                (NotificationKind::Published, settings.notify_on_success)
            } else {
                (NotificationKind::Failed, settings.notify_on_failure)
            };
            if !wanted {
                continue;
            }

            let entry = NotificationRecord {
                kind,
                platform: Some(result.platform),
                attempt,
                due_at: None,
                sent_at: Utc::now(),
                recipients: schedule.recipients(),
            };
            match self.repo.record_notification(&schedule.id, &entry).await {
                Ok(true) => {}
                Ok(false) => continue,
                Err(e) => {
                    tracing::warn!(schedule_id = %schedule.id, error = %e, "Could not record notification");
                    continue;
                }
            }
            let notification = notices::outcome(schedule, result, attempt);
            if let Err(e) = self.notifier.send_notification(&notification).await {
                tracing::warn!(schedule_id = %schedule.id, kind = kind.as_str(), error = %e, "Notification delivery failed");
            }
        }
    }

    //=== Edit / cancel ===

    /// Edit a queued or draft schedule on behalf of `user_id`.
    ///
    /// Refused for in-flight or finished schedules and inside the edit lock
    /// window. A time change re-arms the reminder. The edit notification is
    /// always sent.
    pub async fn edit_scheduled_content(
        &self,
        id: &str,
        update: &ScheduleUpdate,
        user_id: &str,
    ) -> Result<ScheduledContent> {
        self.apply_edit(id, update, Some(user_id), Utc::now()).await
    }

    pub(crate) async fn apply_edit(
        &self,
        id: &str,
        update: &ScheduleUpdate,
        editor: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<ScheduledContent> {
        for _ in 0..WRITE_PASSES {
            let mut record = self.load(id).await?;
            record.ensure_mutable(now, self.scheduling.edit_lock())?;
            validate_update(&record, update, &self.scheduling, now)?;

            let previous_time = record.scheduled_time;
            let previous_status = record.status;
            let changed = record.apply_update(update);
            if changed.is_empty() {
                return Ok(record);
            }

            let rearm = record.scheduled_time != previous_time
                || record.status != previous_status
                || changed.contains(&"notification_settings");
            let old_durable = if rearm {
                record.reminder_at = None;
                record.reminder_notification_id.take()
            } else {
                None
            };

            if !self
                .repo
                .replace_if_status(&record, &[ScheduleStatus::Draft, ScheduleStatus::Scheduled])
                .await?
            {
                tracing::debug!(schedule_id = %id, "Schedule changed during edit, reloading");
                continue;
            }
            record.revision += 1;

            if rearm {
                self.cancel_timers(id, old_durable).await;
                self.arm_reminder(&record).await;
            }
            tracing::info!(schedule_id = %id, changed = ?changed, editor = editor.unwrap_or("engine"), "Schedule edited");

            if let Some(editor) = editor {
                let notification = notices::edited(&record, editor, &changed);
                if let Err(e) = self.notifier.send_notification(&notification).await {
                    tracing::warn!(schedule_id = %id, error = %e, "Edit notification failed");
                }
            }

            return self.load(id).await;
        }
        Err(self.moved_error(id).await)
    }

    /// Cancel a schedule on behalf of `user_id`.
    ///
    /// Same guards as editing, including the edit lock window.
    pub async fn cancel_scheduled_content(&self, id: &str, reason: &str, user_id: &str) -> Result<ScheduledContent> {
        self.apply_cancel(id, Some(reason), Some(user_id), true, Utc::now())
            .await
    }

    pub(crate) async fn apply_cancel(
        &self,
        id: &str,
        reason: Option<&str>,
        actor: Option<&str>,
        enforce_lock: bool,
        now: DateTime<Utc>,
    ) -> Result<ScheduledContent> {
        for _ in 0..WRITE_PASSES {
            let mut record = self.load(id).await?;
            if enforce_lock {
                record.ensure_mutable(now, self.scheduling.edit_lock())?;
            } else {
                record.ensure_cancellable()?;
            }

            let durable = record.reminder_notification_id.take();
            record.transition(ScheduleStatus::Cancelled)?;
            record.reminder_at = None;
            record.cancellation_reason = reason.map(str::to_string);

            if !self
                .repo
                .replace_if_status(&record, &[ScheduleStatus::Draft, ScheduleStatus::Scheduled])
                .await?
            {
                tracing::debug!(schedule_id = %id, "Schedule changed during cancel, reloading");
                continue;
            }
            record.revision += 1;

            self.cancel_timers(id, durable).await;
            tracing::info!(schedule_id = %id, reason = reason.unwrap_or_default(), "Schedule cancelled");

            if let Some(actor) = actor {
                let notification = notices::cancelled(&record, actor, reason);
                if let Err(e) = self.notifier.send_notification(&notification).await {
                    tracing::warn!(schedule_id = %id, error = %e, "Cancellation notification failed");
                }
            }
            return Ok(record);
        }
        Err(self.moved_error(id).await)
    }

    /// Error for a conditional write that kept losing to concurrent writes.
    async fn moved_error(&self, id: &str) -> CadenceError {
        match self.repo.get_schedule_by_id(id).await {
            Ok(Some(current)) => CadenceError::State(format!(
                "schedule {} changed concurrently and is now {}",
                id,
                current.status.as_str()
            )),
            Ok(None) => CadenceError::NotFound(id.to_string()),
            Err(e) => e,
        }
    }

    //=== Status ===

    /// Per-platform projection of a schedule's current state.
    pub async fn get_publishing_status(&self, id: &str) -> Result<Vec<PublishingStatus>> {
        let schedule = self.load(id).await?;
        Ok(PublishingStatus::project(&schedule))
    }

    /// Abort all local timers. Durable reminders are left in place.
    pub async fn shutdown(&self) {
        self.timers.shutdown().await;
    }
}

/// Deliver a due pre-publish reminder at most once.
///
/// The history entry is written before sending, so a crash between the two
/// loses the reminder rather than duplicating it.
pub(super) async fn deliver_reminder(
    repo: &dyn ScheduleRepository,
    notifier: &dyn NotificationService,
    schedule_id: &str,
    now: DateTime<Utc>,
) -> Result<bool> {
    let Some(schedule) = repo.get_schedule_by_id(schedule_id).await? else {
        return Ok(false);
    };
    if !schedule.reminder_due(now) {
        return Ok(false);
    }

    let entry = NotificationRecord {
        kind: NotificationKind::PrePublishReminder,
        platform: None,
        attempt: schedule.attempt(),
        due_at: schedule.reminder_at,
        sent_at: now,
        recipients: schedule.recipients(),
    };
    if !repo.record_notification(schedule_id, &entry).await? {
        return Ok(false);
    }

    let minutes = (schedule.scheduled_time - now).num_minutes();
    let notification = notices::reminder(&schedule, minutes);
    if let Err(e) = notifier.send_notification(&notification).await {
        tracing::warn!(schedule_id, error = %e, "Reminder delivery failed");
        return Ok(false);
    }
    Ok(true)
}

/// Check an edit against the schedule it applies to.
pub fn validate_update(
    current: &ScheduledContent,
    update: &ScheduleUpdate,
    scheduling: &SchedulingConfig,
    now: DateTime<Utc>,
) -> Result<()> {
    if let Some(title) = &update.title
        && title.trim().is_empty()
    {
        return Err(CadenceError::Validation("title must not be empty".to_string()));
    }
    if let Some(content) = &update.content
        && content.is_empty()
    {
        return Err(CadenceError::Validation("content must have text or media".to_string()));
    }
    if let Some(platforms) = &update.platforms {
        if platforms.is_empty() {
            return Err(CadenceError::Validation("at least one platform is required".to_string()));
        }
        let unique: HashSet<&Platform> = platforms.iter().collect();
        if unique.len() != platforms.len() {
            return Err(CadenceError::Validation("platforms must not repeat".to_string()));
        }
    }
    if let Some(time) = update.scheduled_time
        && time - now < scheduling.edit_lock()
    {
        return Err(CadenceError::Validation(format!(
            "new scheduled_time must be at least {} minutes in the future",
            scheduling.edit_lock_minutes
        )));
    }
    if let Some(timezone) = &update.timezone {
        parse_timezone(timezone)?;
    }
    if let Some(max_retries) = update.max_retries {
        if max_retries > scheduling.max_retries_cap {
            return Err(CadenceError::Validation(format!(
                "max_retries {} exceeds the cap of {}",
                max_retries, scheduling.max_retries_cap
            )));
        }
        if max_retries < current.retry_count {
            return Err(CadenceError::Validation(format!(
                "max_retries {} is below the {} retries already used",
                max_retries, current.retry_count
            )));
        }
    }
    if let Some(settings) = &update.notification_settings
        && settings.pre_publish_minutes.is_some_and(|m| m < 0)
    {
        return Err(CadenceError::Validation("pre_publish_minutes must not be negative".to_string()));
    }
    Ok(())
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic".to_string()
    }
}

#[cfg(test)]
pub(crate) mod harness {
    use super::*;
    use crate::metrics::StaticMetricsCollector;
    use crate::notify::RecordingNotifier;
    use crate::platform::MockPublisher;
    use crate::store::ScheduleStore;
    use tempfile::TempDir;

    pub struct Harness {
        pub manager: PublishingManager,
        pub store: Arc<ScheduleStore>,
        pub publisher: Arc<MockPublisher>,
        pub notifier: Arc<RecordingNotifier>,
        _temp: TempDir,
    }

    pub fn harness() -> Harness {
        harness_with(MockPublisher::new())
    }

    pub fn harness_with(publisher: MockPublisher) -> Harness {
        let temp = TempDir::new().unwrap();
        let store = Arc::new(ScheduleStore::open_at(temp.path()).unwrap());
        let publisher = Arc::new(publisher);
        let notifier = Arc::new(RecordingNotifier::new());
        let manager = PublishingManager::new(
            store.clone(),
            publisher.clone(),
            notifier.clone(),
            Arc::new(StaticMetricsCollector::new()),
            SchedulingConfig::default(),
            SweepConfig::default(),
        );
        Harness {
            manager,
            store,
            publisher,
            notifier,
            _temp: temp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::harness::harness;
    use super::*;
    use crate::domain::schedule::fixtures::sample_schedule;
    use crate::domain::{NotificationSettings, PlatformStatus};
    use crate::metrics::NoopMetricsCollector;
    use crate::notify::RecordingNotifier;
    use crate::platform::{MockOutcome, MockPublisher};
    use crate::store::ScheduleStore;
    use tempfile::TempDir;

    fn due_schedule() -> ScheduledContent {
        let mut s = sample_schedule();
        s.scheduled_time = Utc::now() - Duration::minutes(1);
        s
    }

    /// Repository that slips a reminder history append in ahead of the first
    /// conditional write, the way a concurrent reminder sweep would.
    struct InterleavedRepo {
        inner: Arc<ScheduleStore>,
        pending: std::sync::Mutex<Option<NotificationRecord>>,
    }

    impl InterleavedRepo {
        fn new(inner: Arc<ScheduleStore>, schedule: &ScheduledContent) -> Self {
            let entry = NotificationRecord {
                kind: NotificationKind::PrePublishReminder,
                platform: None,
                attempt: 1,
                due_at: schedule.reminder_at,
                sent_at: Utc::now(),
                recipients: vec![],
            };
            Self {
                inner,
                pending: std::sync::Mutex::new(Some(entry)),
            }
        }
    }

    #[async_trait::async_trait]
    impl ScheduleRepository for InterleavedRepo {
        async fn insert_schedule(&self, schedule: &ScheduledContent) -> Result<()> {
            self.inner.insert_schedule(schedule).await
        }

        async fn get_schedule_by_id(&self, id: &str) -> Result<Option<ScheduledContent>> {
            self.inner.get_schedule_by_id(id).await
        }

        async fn update_schedule_status(&self, id: &str, status: ScheduleStatus, reason: Option<&str>) -> Result<()> {
            self.inner.update_schedule_status(id, status, reason).await
        }

        async fn replace_if_status(&self, schedule: &ScheduledContent, expected: &[ScheduleStatus]) -> Result<bool> {
            let entry = self.pending.lock().unwrap().take();
            if let Some(entry) = entry {
                self.inner.record_notification(&schedule.id, &entry).await?;
            }
            self.inner.replace_if_status(schedule, expected).await
        }

        async fn claim_for_publishing(&self, id: &str, now: DateTime<Utc>) -> Result<Option<ScheduledContent>> {
            self.inner.claim_for_publishing(id, now).await
        }

        async fn record_notification(&self, id: &str, entry: &NotificationRecord) -> Result<bool> {
            self.inner.record_notification(id, entry).await
        }

        async fn get_schedules_due_for_publishing(&self, before: DateTime<Utc>) -> Result<Vec<ScheduledContent>> {
            self.inner.get_schedules_due_for_publishing(before).await
        }

        async fn get_schedules_due_for_notification(&self, before: DateTime<Utc>) -> Result<Vec<ScheduledContent>> {
            self.inner.get_schedules_due_for_notification(before).await
        }

        async fn get_stale_publishing(&self, updated_before: DateTime<Utc>) -> Result<Vec<ScheduledContent>> {
            self.inner.get_stale_publishing(updated_before).await
        }

        async fn list_schedules(&self, brand_id: Option<&str>) -> Result<Vec<ScheduledContent>> {
            self.inner.list_schedules(brand_id).await
        }

        async fn list_in_window(
            &self,
            brand_id: &str,
            start: DateTime<Utc>,
            end: DateTime<Utc>,
        ) -> Result<Vec<ScheduledContent>> {
            self.inner.list_in_window(brand_id, start, end).await
        }
    }

    fn interleaved(schedule: &ScheduledContent) -> (PublishingManager, Arc<ScheduleStore>, TempDir) {
        let temp = TempDir::new().unwrap();
        let store = Arc::new(ScheduleStore::open_at(temp.path()).unwrap());
        let manager = PublishingManager::new(
            Arc::new(InterleavedRepo::new(store.clone(), schedule)),
            Arc::new(MockPublisher::new()),
            Arc::new(RecordingNotifier::new()),
            Arc::new(NoopMetricsCollector),
            SchedulingConfig::default(),
            SweepConfig::default(),
        );
        (manager, store, temp)
    }

    #[tokio::test]
    async fn test_publish_all_platforms_succeed() {
        let h = harness();
        let schedule = due_schedule();
        h.store.insert_schedule(&schedule).await.unwrap();

        let statuses = h.manager.publish_scheduled_content(&schedule).await.unwrap();

        assert_eq!(statuses.len(), 2);
        assert!(statuses.iter().all(|s| s.status == PlatformStatus::Published));
        let stored = h.store.get_schedule_by_id(&schedule.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ScheduleStatus::Published);
        assert!(stored.failure_reason.is_none());
        assert!(stored.published_at.is_some());
        assert_eq!(h.notifier.sent_of_kind(NotificationKind::Published).len(), 2);
    }

    #[tokio::test]
    async fn test_partial_success_is_published_with_annotation() {
        let h = harness();
        h.publisher
            .script(Platform::Linkedin, [MockOutcome::Refuse("token expired".to_string())]);
        let schedule = due_schedule();
        h.store.insert_schedule(&schedule).await.unwrap();

        h.manager.publish_scheduled_content(&schedule).await.unwrap();

        let stored = h.store.get_schedule_by_id(&schedule.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ScheduleStatus::Published);
        assert!(stored.failure_reason.unwrap().starts_with("Partial success"));

        let status = h.manager.get_publishing_status(&schedule.id).await.unwrap();
        let by_platform = |p| status.iter().find(|s| s.platform == p).unwrap().status;
        assert_eq!(by_platform(Platform::Twitter), PlatformStatus::Published);
        assert_eq!(by_platform(Platform::Linkedin), PlatformStatus::Failed);
    }

    #[tokio::test]
    async fn test_validation_failure_does_not_stop_siblings() {
        let h = harness();
        h.publisher
            .script(Platform::Twitter, [MockOutcome::Invalid(vec!["too long".to_string()])]);
        let schedule = due_schedule();
        h.store.insert_schedule(&schedule).await.unwrap();

        let statuses = h.manager.publish_scheduled_content(&schedule).await.unwrap();

        let twitter = statuses.iter().find(|s| s.platform == Platform::Twitter).unwrap();
        assert_eq!(twitter.status, PlatformStatus::Failed);
        assert_eq!(twitter.error.as_ref().unwrap().code, PublishErrorDetail::VALIDATION_FAILED);
        assert_eq!(h.publisher.publish_calls(Platform::Twitter), 0);
        assert_eq!(h.publisher.publish_calls(Platform::Linkedin), 1);
    }

    #[tokio::test]
    async fn test_panic_is_isolated_to_platform() {
        let h = harness();
        h.publisher.script(Platform::Twitter, [MockOutcome::Panic]);
        let schedule = due_schedule();
        h.store.insert_schedule(&schedule).await.unwrap();

        let statuses = h.manager.publish_scheduled_content(&schedule).await.unwrap();

        let twitter = statuses.iter().find(|s| s.platform == Platform::Twitter).unwrap();
        let linkedin = statuses.iter().find(|s| s.platform == Platform::Linkedin).unwrap();
        assert_eq!(twitter.error.as_ref().unwrap().code, PublishErrorDetail::PUBLISHING_ERROR);
        assert_eq!(linkedin.status, PlatformStatus::Published);
    }

    #[tokio::test]
    async fn test_total_failure_schedules_retry() {
        let h = harness();
        for p in [Platform::Twitter, Platform::Linkedin] {
            h.publisher.set_default(p, MockOutcome::Error("timeout".to_string()));
        }
        let schedule = due_schedule();
        h.store.insert_schedule(&schedule).await.unwrap();
        let now = Utc::now();

        let (outcome, _) = h.manager.attempt(&schedule, now).await.unwrap();

        assert_eq!(outcome, AttemptOutcome::Retrying(now + Duration::minutes(5)));
        let stored = h.store.get_schedule_by_id(&schedule.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ScheduleStatus::Scheduled);
        assert_eq!(stored.retry_count, 1);
        assert_eq!(stored.scheduled_time, now + Duration::minutes(5));
    }

    #[tokio::test]
    async fn test_metrics_failure_keeps_publish() {
        let h = harness();
        let schedule = due_schedule();
        h.store.insert_schedule(&schedule).await.unwrap();

        let statuses = h.manager.publish_scheduled_content(&schedule).await.unwrap();

        assert!(statuses.iter().all(|s| s.status == PlatformStatus::Published));
        let stored = h.store.get_schedule_by_id(&schedule.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ScheduleStatus::Published);
        assert!(stored.failure_reason.is_none());
        assert!(stored.platform_results.iter().all(|r| r.metrics.is_none()));
        assert!(stored.platform_results.iter().all(|r| r.platform_post_id.is_some()));
    }

    #[tokio::test]
    async fn test_edit_keeps_concurrent_history_entry() {
        let schedule = sample_schedule();
        let (manager, store, _temp) = interleaved(&schedule);
        store.insert_schedule(&schedule).await.unwrap();

        let update = ScheduleUpdate {
            title: Some("Autumn launch, final".to_string()),
            ..Default::default()
        };
        let edited = manager.edit_scheduled_content(&schedule.id, &update, "alex").await.unwrap();

        assert_eq!(edited.title, "Autumn launch, final");
        assert_eq!(edited.notifications.len(), 1);
        assert_eq!(edited.notifications[0].kind, NotificationKind::PrePublishReminder);
    }

    #[tokio::test]
    async fn test_attempt_keeps_concurrent_history_entry() {
        let schedule = due_schedule();
        let (manager, store, _temp) = interleaved(&schedule);
        store.insert_schedule(&schedule).await.unwrap();

        manager.publish_scheduled_content(&schedule).await.unwrap();

        let stored = store.get_schedule_by_id(&schedule.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ScheduleStatus::Published);
        let reminders = stored
            .notifications
            .iter()
            .filter(|n| n.kind == NotificationKind::PrePublishReminder)
            .count();
        assert_eq!(reminders, 1);
    }

    #[tokio::test]
    async fn test_cancel_keeps_concurrent_history_entry() {
        let schedule = sample_schedule();
        let (manager, store, _temp) = interleaved(&schedule);
        store.insert_schedule(&schedule).await.unwrap();

        let cancelled = manager
            .cancel_scheduled_content(&schedule.id, "changed plans", "sam")
            .await
            .unwrap();

        assert_eq!(cancelled.status, ScheduleStatus::Cancelled);
        let stored = store.get_schedule_by_id(&schedule.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ScheduleStatus::Cancelled);
        assert_eq!(stored.notifications.len(), 1);
    }

    #[tokio::test]
    async fn test_second_claim_is_lost() {
        let h = harness();
        let schedule = due_schedule();
        h.store.insert_schedule(&schedule).await.unwrap();

        h.manager.publish_scheduled_content(&schedule).await.unwrap();
        let err = h.manager.publish_scheduled_content(&schedule).await.unwrap_err();
        assert!(matches!(err, CadenceError::ClaimLost(_)));
        assert_eq!(h.notifier.sent_of_kind(NotificationKind::Published).len(), 2);
    }

    #[tokio::test]
    async fn test_reminder_armed_and_persisted() {
        let h = harness();
        let mut schedule = sample_schedule();
        schedule.notification_settings = Some(NotificationSettings::default());
        h.store.insert_schedule(&schedule).await.unwrap();

        let at = h.manager.schedule_pre_publish_notifications(&schedule, 30).await.unwrap();

        assert_eq!(at, Some(schedule.scheduled_time - Duration::minutes(30)));
        assert!(h.manager.timers().is_armed(&schedule.id).await);
        let stored = h.store.get_schedule_by_id(&schedule.id).await.unwrap().unwrap();
        assert_eq!(stored.reminder_at, at);
        assert!(stored.reminder_notification_id.is_some());
        assert_eq!(h.notifier.scheduled().len(), 1);
    }

    #[tokio::test]
    async fn test_reminder_in_past_is_noop() {
        let h = harness();
        let mut schedule = sample_schedule();
        schedule.scheduled_time = Utc::now() + Duration::minutes(10);
        h.store.insert_schedule(&schedule).await.unwrap();

        let at = h.manager.schedule_pre_publish_notifications(&schedule, 30).await.unwrap();

        assert!(at.is_none());
        assert!(!h.manager.timers().is_armed(&schedule.id).await);
        assert!(h.notifier.scheduled().is_empty());
    }

    #[tokio::test]
    async fn test_rearming_replaces_durable_reminder() {
        let h = harness();
        let schedule = sample_schedule();
        h.store.insert_schedule(&schedule).await.unwrap();

        h.manager.schedule_pre_publish_notifications(&schedule, 30).await.unwrap();
        h.manager.schedule_pre_publish_notifications(&schedule, 60).await.unwrap();

        assert_eq!(h.notifier.scheduled().len(), 1);
        assert_eq!(h.notifier.cancelled().len(), 1);
        assert_eq!(h.manager.timers().pending().await, 1);
    }

    #[tokio::test]
    async fn test_edit_rejected_inside_lock_window() {
        let h = harness();
        let mut schedule = sample_schedule();
        schedule.scheduled_time = Utc::now() + Duration::minutes(3);
        h.store.insert_schedule(&schedule).await.unwrap();

        let update = ScheduleUpdate {
            title: Some("New title".to_string()),
            ..Default::default()
        };
        let err = h
            .manager
            .edit_scheduled_content(&schedule.id, &update, "alex")
            .await
            .unwrap_err();
        assert!(matches!(err, CadenceError::State(_)));
    }

    #[tokio::test]
    async fn test_edit_time_rearms_and_notifies() {
        let h = harness();
        let mut schedule = sample_schedule();
        schedule.notification_settings = Some(NotificationSettings::default());
        h.store.insert_schedule(&schedule).await.unwrap();
        h.manager.arm_reminder(&schedule).await.unwrap();

        let new_time = schedule.scheduled_time + Duration::hours(3);
        let update = ScheduleUpdate {
            scheduled_time: Some(new_time),
            ..Default::default()
        };
        let edited = h
            .manager
            .edit_scheduled_content(&schedule.id, &update, "alex")
            .await
            .unwrap();

        assert_eq!(edited.scheduled_time, new_time);
        assert_eq!(edited.reminder_at, Some(new_time - Duration::minutes(30)));
        assert_eq!(h.manager.timers().fire_time(&schedule.id).await, edited.reminder_at);
        let edits = h.notifier.sent_of_kind(NotificationKind::Edited);
        assert_eq!(edits.len(), 1);
        assert!(edits[0].body.contains("alex"));
        assert!(edits[0].body.contains("scheduled_time"));
    }

    #[tokio::test]
    async fn test_cancel_publishing_schedule_fails() {
        let h = harness();
        let mut schedule = sample_schedule();
        schedule.status = ScheduleStatus::Publishing;
        h.store.insert_schedule(&schedule).await.unwrap();

        let err = h
            .manager
            .cancel_scheduled_content(&schedule.id, "changed plans", "alex")
            .await
            .unwrap_err();
        assert!(matches!(err, CadenceError::State(_)));
    }

    #[tokio::test]
    async fn test_cancel_disarms_and_notifies() {
        let h = harness();
        let mut schedule = sample_schedule();
        schedule.notification_settings = Some(NotificationSettings::default());
        h.store.insert_schedule(&schedule).await.unwrap();
        h.manager.arm_reminder(&schedule).await.unwrap();

        let cancelled = h
            .manager
            .cancel_scheduled_content(&schedule.id, "product recalled", "sam")
            .await
            .unwrap();

        assert_eq!(cancelled.status, ScheduleStatus::Cancelled);
        assert_eq!(cancelled.cancellation_reason.as_deref(), Some("product recalled"));
        assert!(!h.manager.timers().is_armed(&schedule.id).await);
        assert!(h.notifier.scheduled().is_empty());
        let notes = h.notifier.sent_of_kind(NotificationKind::Cancelled);
        assert!(notes[0].body.contains("sam") && notes[0].body.contains("product recalled"));
    }

    #[test]
    fn test_validate_update_rules() {
        let schedule = sample_schedule();
        let scheduling = SchedulingConfig::default();
        let now = Utc::now();

        let empty_platforms = ScheduleUpdate {
            platforms: Some(vec![]),
            ..Default::default()
        };
        assert!(validate_update(&schedule, &empty_platforms, &scheduling, now).is_err());

        let past = ScheduleUpdate {
            scheduled_time: Some(now - Duration::hours(1)),
            ..Default::default()
        };
        assert!(validate_update(&schedule, &past, &scheduling, now).is_err());

        let too_many_retries = ScheduleUpdate {
            max_retries: Some(99),
            ..Default::default()
        };
        assert!(validate_update(&schedule, &too_many_retries, &scheduling, now).is_err());

        let fine = ScheduleUpdate {
            timezone: Some("Europe/Berlin".to_string()),
            ..Default::default()
        };
        assert!(validate_update(&schedule, &fine, &scheduling, now).is_ok());
    }
}
