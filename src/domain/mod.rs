//! Domain types for Cadence
//!
//! This module contains all core domain types:
//! - ScheduledContent: the central schedule record and its lifecycle
//! - PublishingStatus: per-platform projection of a publish attempt
//! - SchedulingConflict: advisory output of the conflict checks
//! - Requests: inputs for scheduling, bulk import, queries and calendar views

pub mod conflict;
pub mod platform;
pub mod publishing;
pub mod request;
pub mod schedule;

pub use conflict::{ConflictSeverity, ConflictType, ResolutionAction, SchedulingConflict, SuggestedResolution};
pub use platform::{ContentType, MediaKind, Platform};
pub use publishing::{InitialMetrics, PlatformResult, PlatformStatus, PublishErrorDetail, PublishingStatus};
pub use request::{
    BulkConflict, BulkFailure, BulkItem, BulkScheduleRequest, BulkScheduleResult, BulkScheduled, CalendarView,
    DistributionStrategy, PlatformUsage, ScheduleQuery, ScheduleRequest, SortField, SortOrder, TimeRange,
    TimeSuggestion, ViewType,
};
pub use schedule::{
    CampaignPhase, CampaignRef, ContentBody, MediaRef, NotificationKind, NotificationRecord, NotificationSettings,
    Priority, ScheduleStatus, ScheduleUpdate, ScheduledContent,
};
