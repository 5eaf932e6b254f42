//! Publishing management.
//!
//! Drives schedules from due to published/failed:
//! - single-flight claim through the repository
//! - concurrent, isolated per-platform validate/publish/metrics
//! - retry with exponential backoff persisted as the next `scheduled_time`
//! - pre-publish reminders (durable notification + local timer backstop)
//! - publishing and notification sweeps

mod manager;
mod notices;
mod sweep;
mod timers;

pub use manager::{AttemptOutcome, PublishingManager, validate_update};
pub use sweep::{NotificationReport, SweepReport};
pub use timers::TimerRegistry;
