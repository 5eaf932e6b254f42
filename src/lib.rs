//! Cadence - content scheduling & publishing engine
//!
//! Schedules multi-platform content for future publication, checks new
//! schedules for conflicts with a brand's existing ones, and drives the
//! publish step with per-platform isolation, retry with backoff, status
//! tracking and operator notifications.

pub mod advisor;
pub mod config;
pub mod daemon;
pub mod domain;
pub mod engine;
pub mod error;
pub mod id;
pub mod metrics;
pub mod notify;
pub mod orchestrator;
pub mod platform;
pub mod publishing;
pub mod store;

pub use error::{CadenceError, Result};
