//! Conflict detection.

use chrono::{Duration, Timelike};

use super::{Advisor, peers};
use crate::domain::{
    CampaignPhase, ConflictSeverity, ConflictType, Platform, ResolutionAction, ScheduledContent, SchedulingConflict,
    SuggestedResolution,
};

const NEAR_DUPLICATE: f64 = 0.95;

impl Advisor {
    /// Every conflict `candidate` would introduce among `existing`.
    ///
    /// Only active schedules of the same brand participate and a schedule
    /// never conflicts with itself. Results are ordered by descending
    /// severity, then by type.
    pub fn detect_conflicts(&self, candidate: &ScheduledContent, existing: &[ScheduledContent]) -> Vec<SchedulingConflict> {
        let mut conflicts = Vec::new();
        for platform in &candidate.platforms {
            conflicts.extend(self.time_overlap(candidate, existing, *platform));
            conflicts.extend(self.platform_limit(candidate, existing, *platform));
        }
        conflicts.extend(self.content_similarity(candidate, existing));
        conflicts.extend(self.campaign_conflicts(candidate, existing));

        conflicts.sort_by(|a, b| {
            b.severity
                .cmp(&a.severity)
                .then_with(|| a.conflict_type.as_str().cmp(b.conflict_type.as_str()))
        });
        conflicts
    }

    fn time_overlap(
        &self,
        candidate: &ScheduledContent,
        existing: &[ScheduledContent],
        platform: Platform,
    ) -> Option<SchedulingConflict> {
        let interval = Duration::minutes(self.rules(platform).min_interval_minutes);
        if interval <= Duration::zero() {
            return None;
        }

        let close: Vec<&ScheduledContent> = peers(candidate, existing)
            .filter(|s| s.platforms.contains(&platform))
            .filter(|s| (s.scheduled_time - candidate.scheduled_time).abs() < interval)
            .collect();
        if close.is_empty() {
            return None;
        }

        let nearest = close
            .iter()
            .map(|s| (s.scheduled_time - candidate.scheduled_time).abs())
            .min()
            .unwrap_or(interval);
        let latest = close.iter().map(|s| s.scheduled_time).max().unwrap_or(candidate.scheduled_time);
        let severity = if nearest * 2 < interval {
            ConflictSeverity::High
        } else {
            ConflictSeverity::Medium
        };

        Some(SchedulingConflict {
            conflict_type: ConflictType::TimeOverlap,
            severity,
            description: format!(
                "{} other post(s) on {} within {} minutes (closest {} minutes away)",
                close.len(),
                platform,
                interval.num_minutes(),
                nearest.num_minutes()
            ),
            conflicting_schedule_ids: sorted_ids(close),
            resolution: SuggestedResolution::reschedule(Some(latest + interval)),
            auto_resolvable: true,
        })
    }

    fn platform_limit(
        &self,
        candidate: &ScheduledContent,
        existing: &[ScheduledContent],
        platform: Platform,
    ) -> Option<SchedulingConflict> {
        let rules = self.rules(platform);
        let tz = self.zone_of(candidate);
        let local = candidate.scheduled_time.with_timezone(&tz);

        let same_day: Vec<&ScheduledContent> = peers(candidate, existing)
            .filter(|s| s.platforms.contains(&platform))
            .filter(|s| s.scheduled_time.with_timezone(&tz).date_naive() == local.date_naive())
            .collect();

        if same_day.len() as u32 >= rules.daily_limit {
            return Some(SchedulingConflict {
                conflict_type: ConflictType::PlatformLimit,
                severity: ConflictSeverity::High,
                description: format!(
                    "{} daily limit of {} posts reached on {}",
                    platform,
                    rules.daily_limit,
                    local.date_naive()
                ),
                conflicting_schedule_ids: sorted_ids(same_day),
                resolution: SuggestedResolution::reschedule(Some(candidate.scheduled_time + Duration::days(1))),
                auto_resolvable: true,
            });
        }

        let same_hour: Vec<&ScheduledContent> = same_day
            .into_iter()
            .filter(|s| s.scheduled_time.with_timezone(&tz).hour() == local.hour())
            .collect();
        if same_hour.len() as u32 >= rules.hourly_limit {
            return Some(SchedulingConflict {
                conflict_type: ConflictType::PlatformLimit,
                severity: ConflictSeverity::Medium,
                description: format!(
                    "{} hourly limit of {} posts reached at {}:00",
                    platform,
                    rules.hourly_limit,
                    local.hour()
                ),
                conflicting_schedule_ids: sorted_ids(same_hour),
                resolution: SuggestedResolution::reschedule(Some(candidate.scheduled_time + Duration::hours(1))),
                auto_resolvable: true,
            });
        }
        None
    }

    fn content_similarity(&self, candidate: &ScheduledContent, existing: &[ScheduledContent]) -> Vec<SchedulingConflict> {
        let window = Duration::hours(self.scheduling.similarity_window_hours);
        let threshold = self.scheduling.similarity_threshold;

        let mut conflicts = Vec::new();
        for other in peers(candidate, existing) {
            if (other.scheduled_time - candidate.scheduled_time).abs() > window {
                continue;
            }
            let score = self.similarity.similarity(&candidate.content, &other.content);
            if score < threshold {
                continue;
            }
            let severity = if score >= NEAR_DUPLICATE {
                ConflictSeverity::Medium
            } else {
                ConflictSeverity::Low
            };
            conflicts.push(SchedulingConflict {
                conflict_type: ConflictType::ContentSimilarity,
                severity,
                description: format!(
                    "content is {:.0}% similar to \"{}\" scheduled {}",
                    score * 100.0,
                    other.title,
                    other.scheduled_time.to_rfc3339()
                ),
                conflicting_schedule_ids: vec![other.id.clone()],
                resolution: SuggestedResolution::action(ResolutionAction::Merge),
                auto_resolvable: false,
            });
        }
        conflicts
    }

    fn campaign_conflicts(&self, candidate: &ScheduledContent, existing: &[ScheduledContent]) -> Vec<SchedulingConflict> {
        let Some(campaign) = &candidate.campaign else {
            return Vec::new();
        };
        let window = Duration::hours(self.scheduling.conflict_window_hours);

        let mut conflicts = Vec::new();
        for other in peers(candidate, existing) {
            let Some(other_campaign) = &other.campaign else {
                continue;
            };
            if other_campaign.campaign_id != campaign.campaign_id
                || !other.platforms.iter().any(|p| candidate.platforms.contains(p))
                || (other.scheduled_time - candidate.scheduled_time).abs() > window
            {
                continue;
            }

            use CampaignPhase::*;
            let (severity, action, what) = match (campaign.phase, other_campaign.phase) {
                (Launch, Retraction) | (Retraction, Launch) => {
                    (ConflictSeverity::Critical, ResolutionAction::Cancel, "launch and retraction")
                }
                (Launch, Launch) => (ConflictSeverity::High, ResolutionAction::Merge, "two launches"),
                _ => continue,
            };
            conflicts.push(SchedulingConflict {
                conflict_type: ConflictType::CampaignConflict,
                severity,
                description: format!(
                    "campaign {} has {} on overlapping platforms (\"{}\")",
                    campaign.campaign_id, what, other.title
                ),
                conflicting_schedule_ids: vec![other.id.clone()],
                resolution: SuggestedResolution::action(action),
                auto_resolvable: false,
            });
        }
        conflicts
    }
}

fn sorted_ids(schedules: Vec<&ScheduledContent>) -> Vec<String> {
    let mut ids: Vec<String> = schedules.into_iter().map(|s| s.id.clone()).collect();
    ids.sort();
    ids
}
