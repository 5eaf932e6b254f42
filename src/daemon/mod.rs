//! Sweep daemon
//!
//! The daemon is the long-running process that:
//! - Restores local reminder timers on start
//! - Runs both sweeps every tick until shutdown
//! - Keeps per-session counters

pub mod tick;

pub use tick::*;

use std::future::Future;
use std::sync::Arc;
use tokio::time::MissedTickBehavior;

use crate::error::Result;
use crate::orchestrator::SchedulingOrchestrator;

#[derive(Debug)]
pub struct SweepDaemon {
    orchestrator: Arc<SchedulingOrchestrator>,
    config: TickConfig,
    state: TickState,
}

impl SweepDaemon {
    pub fn new(orchestrator: Arc<SchedulingOrchestrator>, config: TickConfig) -> Self {
        Self {
            orchestrator,
            config,
            state: TickState::new(),
        }
    }

    pub fn state(&self) -> &TickState {
        &self.state
    }

    /// Run one tick. Sweep failures are recorded, not returned.
    pub async fn tick(&mut self) -> TickResult {
        let result = match self.orchestrator.run_sweep().await {
            Ok((publishing, notifications)) => self.state.record(&publishing, &notifications),
            Err(e) => {
                tracing::error!(error = %e, "Sweep failed");
                self.state.record_error(e.to_string())
            }
        };
        if let TickResult::Worked { attempted, reminders } = result {
            tracing::debug!(tick = self.state.tick_count, attempted, reminders, "Tick");
        }
        result
    }

    /// Tick at the configured interval until `shutdown` resolves or the tick
    /// limit is reached.
    pub async fn run_until<F>(&mut self, shutdown: F) -> Result<TickState>
    where
        F: Future<Output = ()>,
    {
        self.orchestrator.restore_reminders().await?;
        tracing::info!(interval = ?self.config.tick_interval, "Sweep daemon started");

        let mut interval = tokio::time::interval(self.config.tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.tick().await;
                    if self.state.reached(&self.config) {
                        break;
                    }
                }
                _ = &mut shutdown => {
                    self.state.request_shutdown();
                    break;
                }
            }
        }

        self.orchestrator.shutdown().await;
        tracing::info!(
            ticks = self.state.tick_count,
            published = self.state.total_published,
            failed = self.state.total_failed,
            errors = self.state.total_errors,
            "Sweep daemon stopped"
        );
        Ok(self.state.clone())
    }
}
