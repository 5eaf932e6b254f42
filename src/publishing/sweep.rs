//! Publishing and notification sweeps.
//!
//! Sweeps are idempotent: running two concurrently, or rerunning one after a
//! crash, never publishes a schedule twice or repeats a notification.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use super::manager::{AttemptOutcome, PublishingManager, deliver_reminder};
use crate::domain::ScheduleStatus;
use crate::error::{CadenceError, Result};

/// Counters from one publishing sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Schedules found due
    pub due: usize,
    pub published: usize,
    pub partial: usize,
    pub retried: usize,
    pub failed: usize,
    /// Claimed by another worker first
    pub skipped: usize,
    pub errors: usize,
    /// Abandoned `publishing` claims returned to the retry path
    pub recovered: usize,
}

/// Counters from one notification sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NotificationReport {
    pub due: usize,
    pub sent: usize,
    pub skipped: usize,
    pub errors: usize,
}

impl PublishingManager {
    /// Publish everything due now, highest priority first.
    pub async fn process_publishing_queue(&self) -> Result<SweepReport> {
        self.process_publishing_queue_at(Utc::now()).await
    }

    pub async fn process_publishing_queue_at(&self, now: DateTime<Utc>) -> Result<SweepReport> {
        let mut report = SweepReport {
            recovered: self.recover_stale_claims(now).await?,
            ..Default::default()
        };

        let mut due = self.repository().get_schedules_due_for_publishing(now).await?;
        due.sort_by(|a, b| {
            b.priority
                .rank()
                .cmp(&a.priority.rank())
                .then_with(|| a.scheduled_time.cmp(&b.scheduled_time))
        });
        due.truncate(self.sweep.batch_limit);
        report.due = due.len();

        for schedule in &due {
            match self.attempt(schedule, now).await {
                Ok((AttemptOutcome::Published, _)) => report.published += 1,
                Ok((AttemptOutcome::PartiallyPublished, _)) => report.partial += 1,
                Ok((AttemptOutcome::Retrying(_), _)) => report.retried += 1,
                Ok((AttemptOutcome::Failed, _)) => report.failed += 1,
                Err(CadenceError::ClaimLost(_)) => report.skipped += 1,
                Err(e) => {
                    tracing::error!(schedule_id = %schedule.id, error = %e, "Publish attempt errored");
                    report.errors += 1;
                }
            }
        }

        if report.due > 0 || report.recovered > 0 {
            tracing::info!(
                due = report.due,
                published = report.published,
                partial = report.partial,
                retried = report.retried,
                failed = report.failed,
                skipped = report.skipped,
                errors = report.errors,
                recovered = report.recovered,
                "Publishing sweep complete"
            );
        }
        Ok(report)
    }

    /// Treat claims untouched for `stale_claim_minutes` as failed attempts.
    async fn recover_stale_claims(&self, now: DateTime<Utc>) -> Result<usize> {
        let cutoff = now - Duration::minutes(self.sweep.stale_claim_minutes);
        let stale = self.repository().get_stale_publishing(cutoff).await?;
        let mut recovered = 0;

        for mut record in stale {
            let summary = format!("publish claim abandoned since {}", record.updated_at.to_rfc3339());
            let outcome = self.fail_attempt(&mut record, &summary, now)?;
            if self
                .repository()
                .replace_if_status(&record, &[ScheduleStatus::Publishing])
                .await?
            {
                tracing::warn!(schedule_id = %record.id, outcome = ?outcome, "Recovered stale publishing claim");
                recovered += 1;
            }
        }
        Ok(recovered)
    }

    /// Deliver every pre-publish reminder that is due and unsent.
    pub async fn process_notification_queue(&self) -> Result<NotificationReport> {
        self.process_notification_queue_at(Utc::now()).await
    }

    pub async fn process_notification_queue_at(&self, now: DateTime<Utc>) -> Result<NotificationReport> {
        let due = self.repository().get_schedules_due_for_notification(now).await?;
        let mut report = NotificationReport {
            due: due.len(),
            ..Default::default()
        };

        for schedule in &due {
            match deliver_reminder(self.repository().as_ref(), self.notifier().as_ref(), &schedule.id, now).await {
                Ok(true) => report.sent += 1,
                Ok(false) => report.skipped += 1,
                Err(e) => {
                    tracing::warn!(schedule_id = %schedule.id, error = %e, "Reminder sweep failed");
                    report.errors += 1;
                }
            }
        }

        if report.due > 0 {
            tracing::info!(
                due = report.due,
                sent = report.sent,
                skipped = report.skipped,
                errors = report.errors,
                "Notification sweep complete"
            );
        }
        Ok(report)
    }
}
