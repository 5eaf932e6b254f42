//! Conflict & timing advisor.
//!
//! Pure computation over the schedules sharing a brand and time window.
//! The advisor never touches storage; callers hand it the candidate and the
//! neighbouring schedules they loaded.

mod conflicts;
mod similarity;
mod timing;

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use std::sync::Arc;

use crate::config::{PlatformRules, PlatformsConfig, SchedulingConfig, parse_timezone};
use crate::domain::{Platform, ScheduledContent};

pub use similarity::{SimilarityCheck, TokenJaccard, fingerprint};
pub use timing::SuggestionQuery;

pub struct Advisor {
    scheduling: SchedulingConfig,
    platforms: PlatformsConfig,
    similarity: Arc<dyn SimilarityCheck>,
}

impl std::fmt::Debug for Advisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Advisor")
            .field("scheduling", &self.scheduling)
            .field("platforms", &self.platforms)
            .finish_non_exhaustive()
    }
}

impl Advisor {
    pub fn new(scheduling: SchedulingConfig, platforms: PlatformsConfig) -> Self {
        Self {
            scheduling,
            platforms,
            similarity: Arc::new(TokenJaccard),
        }
    }

    /// Replace the default token Jaccard similarity check.
    pub fn with_similarity(mut self, similarity: Arc<dyn SimilarityCheck>) -> Self {
        self.similarity = similarity;
        self
    }

    pub fn rules(&self, platform: Platform) -> PlatformRules {
        self.platforms.rules(platform)
    }

    pub fn scheduling(&self) -> &SchedulingConfig {
        &self.scheduling
    }

    /// Window of neighbouring schedules the conflict checks need to see.
    pub fn conflict_window(&self, at: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        let half = Duration::hours(self.scheduling.conflict_window_hours);
        (at - half, at + half)
    }

    /// Timezone a schedule's calendar days are counted in.
    fn zone_of(&self, schedule: &ScheduledContent) -> Tz {
        parse_timezone(&schedule.timezone)
            .or_else(|_| self.scheduling.default_tz())
            .unwrap_or(Tz::UTC)
    }
}

/// Neighbours that can take part in conflicts with `candidate`.
fn peers<'a>(
    candidate: &'a ScheduledContent,
    existing: &'a [ScheduledContent],
) -> impl Iterator<Item = &'a ScheduledContent> + 'a {
    existing
        .iter()
        .filter(move |s| s.id != candidate.id && s.brand_id == candidate.brand_id && s.status.is_active())
}
