//! Schedule repository: the single source of truth for schedule state.
//!
//! `ScheduleRepository` is the seam the engine and publishing manager talk to.
//! Besides plain lookups it exposes the atomic conditional writes the
//! services rely on:
//! - `claim_for_publishing`: compare-and-swap `scheduled -> publishing`
//! - `replace_if_status`: race-safe edit/cancel/finalize
//! - `record_notification`: at-most-once notification history append
//!
//! `ScheduleStore` implements it with a JSONL append log and a SQLite index.

mod schedule_store;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{NotificationRecord, ScheduleStatus, ScheduledContent};
use crate::error::Result;

pub use schedule_store::ScheduleStore;

#[async_trait]
pub trait ScheduleRepository: Send + Sync {
    /// Persist a new schedule. Fails if the id already exists.
    async fn insert_schedule(&self, schedule: &ScheduledContent) -> Result<()>;

    async fn get_schedule_by_id(&self, id: &str) -> Result<Option<ScheduledContent>>;

    /// Set status along a legal lifecycle edge, recording `reason` as the
    /// failure reason when given. Illegal edges fail with `CadenceError::State`.
    async fn update_schedule_status(&self, id: &str, status: ScheduleStatus, reason: Option<&str>) -> Result<()>;

    /// Overwrite the stored record only if its current status is one of
    /// `expected` and it is still at `schedule.revision`.
    ///
    /// Returns false when another write got in first; callers reload and retry.
    async fn replace_if_status(&self, schedule: &ScheduledContent, expected: &[ScheduleStatus]) -> Result<bool>;

    /// Atomically move a due `scheduled` record to `publishing`.
    ///
    /// Returns the claimed record, or None if another worker got there first
    /// or the record is not due.
    async fn claim_for_publishing(&self, id: &str, now: DateTime<Utc>) -> Result<Option<ScheduledContent>>;

    /// Append to the notification history unless the same delivery is present.
    ///
    /// Returns true if the entry was newly recorded.
    async fn record_notification(&self, id: &str, entry: &NotificationRecord) -> Result<bool>;

    /// `scheduled` records due at or before `before`, highest priority first.
    async fn get_schedules_due_for_publishing(&self, before: DateTime<Utc>) -> Result<Vec<ScheduledContent>>;

    /// `scheduled` records whose pre-publish reminder is due and unsent.
    async fn get_schedules_due_for_notification(&self, before: DateTime<Utc>) -> Result<Vec<ScheduledContent>>;

    /// `publishing` records not touched since `updated_before`.
    async fn get_stale_publishing(&self, updated_before: DateTime<Utc>) -> Result<Vec<ScheduledContent>>;

    /// All schedules, optionally restricted to one brand, ordered by time.
    async fn list_schedules(&self, brand_id: Option<&str>) -> Result<Vec<ScheduledContent>>;

    /// A brand's schedules with `start <= scheduled_time < end`.
    async fn list_in_window(
        &self,
        brand_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ScheduledContent>>;
}
