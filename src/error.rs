//! Error types for Cadence
//!
//! Centralized error handling using thiserror.

use thiserror::Error;

use crate::domain::SchedulingConflict;

/// All error types that can occur in Cadence
#[derive(Debug, Error)]
pub enum CadenceError {
    /// Malformed request, rejected before anything is persisted
    #[error("Validation error: {0}")]
    Validation(String),

    /// Scheduling conflicts above the acceptance threshold
    #[error("Scheduling conflict: {}", summarize_conflicts(.0))]
    Conflict(Vec<SchedulingConflict>),

    /// Edit or cancel attempted outside the allowed status/time window
    #[error("Invalid state: {0}")]
    State(String),

    /// Schedule not found in storage
    #[error("Schedule not found: {0}")]
    NotFound(String),

    /// Another worker already claimed this schedule for publishing
    #[error("Schedule already claimed: {0}")]
    ClaimLost(String),

    /// Platform rejected the content before publishing
    #[error("Platform validation failed on {platform}: {}", .issues.join("; "))]
    PlatformValidation { platform: String, issues: Vec<String> },

    /// Platform publish call failed
    #[error("Publish failed on {platform}: {message}")]
    Publish { platform: String, message: String },

    /// Storage/persistence error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Notification service error
    #[error("Notification error: {0}")]
    Notification(String),

    /// Metrics collector error
    #[error("Metrics error: {0}")]
    Metrics(String),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// SQLite index error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl CadenceError {
    /// Infrastructure failures that a later sweep may succeed on.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            CadenceError::Storage(_)
                | CadenceError::Notification(_)
                | CadenceError::Metrics(_)
                | CadenceError::Io(_)
                | CadenceError::Sqlite(_)
        )
    }

    /// Stable machine-readable code for the error kind.
    pub fn code(&self) -> &'static str {
        match self {
            CadenceError::Validation(_) => "VALIDATION_ERROR",
            CadenceError::Conflict(_) => "CONFLICT_ERROR",
            CadenceError::State(_) => "STATE_ERROR",
            CadenceError::NotFound(_) => "NOT_FOUND",
            CadenceError::ClaimLost(_) => "CLAIM_LOST",
            CadenceError::PlatformValidation { .. } => "PLATFORM_VALIDATION_FAILED",
            CadenceError::Publish { .. } => "PUBLISH_FAILED",
            CadenceError::Config(_) => "CONFIG_ERROR",
            CadenceError::Storage(_)
            | CadenceError::Notification(_)
            | CadenceError::Metrics(_)
            | CadenceError::Io(_)
            | CadenceError::Json(_)
            | CadenceError::Yaml(_)
            | CadenceError::Sqlite(_) => "TRANSIENT_INFRA_ERROR",
        }
    }
}

fn summarize_conflicts(conflicts: &[SchedulingConflict]) -> String {
    conflicts
        .iter()
        .map(|c| format!("[{}] {}", c.severity.as_str(), c.description))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result type alias for Cadence operations
pub type Result<T> = std::result::Result<T, CadenceError>;
