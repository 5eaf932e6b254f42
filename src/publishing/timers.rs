//! Local reminder timers.
//!
//! One entry per schedule id: the tokio task that fires the local backstop
//! and the handle of the matching durable notification. Arming an id that
//! already has an entry aborts the old task first, so at most one local
//! timer exists per schedule.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

#[derive(Debug)]
struct TimerEntry {
    fire_at: DateTime<Utc>,
    durable_id: Option<String>,
    handle: JoinHandle<()>,
}

/// Per-manager registry of armed reminder timers keyed by schedule id.
#[derive(Debug, Default)]
pub struct TimerRegistry {
    timers: RwLock<HashMap<String, TimerEntry>>,
}

impl TimerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a timer task, returning the durable id of any entry it replaced.
    pub async fn arm(
        &self,
        schedule_id: &str,
        fire_at: DateTime<Utc>,
        durable_id: Option<String>,
        handle: JoinHandle<()>,
    ) -> Option<String> {
        let mut timers = self.timers.write().await;
        let previous = timers.insert(
            schedule_id.to_string(),
            TimerEntry {
                fire_at,
                durable_id,
                handle,
            },
        );
        previous.and_then(|old| {
            old.handle.abort();
            old.durable_id
        })
    }

    /// Abort a schedule's timer, returning its durable id.
    pub async fn disarm(&self, schedule_id: &str) -> Option<String> {
        let mut timers = self.timers.write().await;
        timers.remove(schedule_id).and_then(|entry| {
            entry.handle.abort();
            entry.durable_id
        })
    }

    /// When the schedule's local timer fires, if one is armed and still pending.
    pub async fn fire_time(&self, schedule_id: &str) -> Option<DateTime<Utc>> {
        let timers = self.timers.read().await;
        timers
            .get(schedule_id)
            .filter(|entry| !entry.handle.is_finished())
            .map(|entry| entry.fire_at)
    }

    pub async fn is_armed(&self, schedule_id: &str) -> bool {
        self.fire_time(schedule_id).await.is_some()
    }

    /// Number of timers still waiting to fire.
    pub async fn pending(&self) -> usize {
        let timers = self.timers.read().await;
        timers.values().filter(|entry| !entry.handle.is_finished()).count()
    }

    /// Entries held, finished or not.
    pub async fn tracked(&self) -> usize {
        self.timers.read().await.len()
    }

    /// Drop entries whose task already ran.
    pub async fn reap(&self) -> usize {
        let mut timers = self.timers.write().await;
        let before = timers.len();
        timers.retain(|_, entry| !entry.handle.is_finished());
        before - timers.len()
    }

    /// Abort every timer.
    pub async fn shutdown(&self) {
        let mut timers = self.timers.write().await;
        for (_, entry) in timers.drain() {
            entry.handle.abort();
        }
    }
}
