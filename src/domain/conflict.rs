//! Scheduling conflicts reported by the advisor.
//!
//! Conflicts are advisory and never persisted as engine state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictType {
    TimeOverlap,
    PlatformLimit,
    ContentSimilarity,
    CampaignConflict,
}

impl ConflictType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictType::TimeOverlap => "time_overlap",
            ConflictType::PlatformLimit => "platform_limit",
            ConflictType::ContentSimilarity => "content_similarity",
            ConflictType::CampaignConflict => "campaign_conflict",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ConflictSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictSeverity::Low => "low",
            ConflictSeverity::Medium => "medium",
            ConflictSeverity::High => "high",
            ConflictSeverity::Critical => "critical",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionAction {
    Reschedule,
    Merge,
    Cancel,
    Ignore,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestedResolution {
    pub action: ResolutionAction,
    pub suggested_time: Option<DateTime<Utc>>,
}

impl SuggestedResolution {
    pub fn reschedule(to: Option<DateTime<Utc>>) -> Self {
        Self {
            action: ResolutionAction::Reschedule,
            suggested_time: to,
        }
    }

    pub fn action(action: ResolutionAction) -> Self {
        Self {
            action,
            suggested_time: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulingConflict {
    pub conflict_type: ConflictType,
    pub severity: ConflictSeverity,
    pub description: String,
    pub conflicting_schedule_ids: Vec<String>,
    pub resolution: SuggestedResolution,
    pub auto_resolvable: bool,
}

impl SchedulingConflict {
    /// Whether this conflict stops a schedule from being accepted.
    ///
    /// Anything at medium severity or above blocks, as does any conflict
    /// the engine cannot resolve on its own.
    pub fn is_blocking(&self) -> bool {
        self.severity >= ConflictSeverity::Medium || !self.auto_resolvable
    }

    /// Time the engine may move the schedule to when auto-resolving.
    pub fn auto_resolution_time(&self) -> Option<DateTime<Utc>> {
        if !self.auto_resolvable || self.resolution.action != ResolutionAction::Reschedule {
            return None;
        }
        self.resolution.suggested_time
    }
}
