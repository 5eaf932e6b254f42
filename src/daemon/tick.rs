//! Tick - one sweep pass of the daemon
//!
//! Each tick:
//! - Recovers stale publishing claims and publishes due schedules
//! - Delivers due pre-publish reminders
//! - Folds both reports into the session counters

use std::time::Duration;

use crate::config::SweepConfig;
use crate::publishing::{NotificationReport, SweepReport};

/// Configuration for the daemon tick loop
#[derive(Debug, Clone)]
pub struct TickConfig {
    /// Interval between ticks
    pub tick_interval: Duration,
    /// Stop after this many ticks (None runs until shutdown)
    pub max_ticks: Option<u64>,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(60),
            max_ticks: None,
        }
    }
}

impl TickConfig {
    pub fn new(tick_interval: Duration) -> Self {
        Self {
            tick_interval,
            max_ticks: None,
        }
    }

    /// Stop after a fixed number of ticks
    pub fn with_max_ticks(mut self, max_ticks: u64) -> Self {
        self.max_ticks = Some(max_ticks);
        self
    }
}

impl From<&SweepConfig> for TickConfig {
    fn from(sweep: &SweepConfig) -> Self {
        Self::new(Duration::from_secs(sweep.interval_secs.max(1)))
    }
}

/// What happened during a tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickResult {
    /// Nothing was due
    Idle,
    /// Schedules were attempted or reminders delivered
    Worked { attempted: usize, reminders: usize },
    /// Daemon should shut down
    Shutdown,
    /// The sweep itself failed
    Error(String),
}

/// Session counters across ticks
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TickState {
    /// Number of ticks since start
    pub tick_count: u64,
    pub total_published: u64,
    pub total_partial: u64,
    pub total_retried: u64,
    pub total_failed: u64,
    pub total_recovered: u64,
    pub total_reminders: u64,
    /// Schedule-level errors plus failed sweeps
    pub total_errors: u64,
    /// Whether shutdown has been requested
    pub shutdown_requested: bool,
}

impl TickState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one tick's reports into the counters.
    pub fn record(&mut self, publishing: &SweepReport, notifications: &NotificationReport) -> TickResult {
        self.tick_count += 1;
        self.total_published += publishing.published as u64;
        self.total_partial += publishing.partial as u64;
        self.total_retried += publishing.retried as u64;
        self.total_failed += publishing.failed as u64;
        self.total_recovered += publishing.recovered as u64;
        self.total_reminders += notifications.sent as u64;
        self.total_errors += (publishing.errors + notifications.errors) as u64;

        let attempted = publishing.published + publishing.partial + publishing.retried + publishing.failed;
        if attempted == 0 && notifications.sent == 0 && publishing.recovered == 0 {
            TickResult::Idle
        } else {
            TickResult::Worked {
                attempted,
                reminders: notifications.sent,
            }
        }
    }

    /// Record a tick whose sweep failed outright.
    pub fn record_error(&mut self, message: impl Into<String>) -> TickResult {
        self.tick_count += 1;
        self.total_errors += 1;
        TickResult::Error(message.into())
    }

    /// Request shutdown
    pub fn request_shutdown(&mut self) {
        self.shutdown_requested = true;
    }

    pub fn reached(&self, config: &TickConfig) -> bool {
        config.max_ticks.is_some_and(|max| self.tick_count >= max)
    }
}
