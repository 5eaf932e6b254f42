//! Optimal posting time suggestions.
//!
//! Candidates are the whole hours inside the requested range. Each one is
//! scored as `0.5 * audience + 0.3 * headroom + 0.2 * density`:
//! - audience: configured hour table per platform, adjusted by content type
//! - headroom: unused share of each platform's daily limit that local day
//! - density: how few of the brand's posts already sit near the candidate
//!
//! Candidates that would break a posting limit or minimum interval are
//! dropped. Ranking is descending by score with ties going to the earlier
//! time, and picks are spaced at least the largest minimum interval apart,
//! so identical inputs always give identical output.

use chrono::{DateTime, Duration, DurationRound, Timelike, Utc};
use chrono_tz::Tz;

use super::Advisor;
use crate::domain::{ContentType, Platform, ScheduledContent, TimeRange, TimeSuggestion};

const AUDIENCE_WEIGHT: f64 = 0.5;
const HEADROOM_WEIGHT: f64 = 0.3;
const DENSITY_WEIGHT: f64 = 0.2;

/// Upper bound on hourly candidates examined per call (about three months).
const MAX_CANDIDATES: usize = 24 * 92;

/// Inputs for `Advisor::suggest_times`.
#[derive(Debug, Clone)]
pub struct SuggestionQuery {
    pub brand_id: String,
    pub platforms: Vec<Platform>,
    pub content_type: ContentType,
    pub range: TimeRange,
    pub count: usize,
    pub timezone: Tz,
}

impl Advisor {
    /// Rank candidate instants for a new post.
    ///
    /// `existing` holds the brand's schedules around the range; `now` bounds
    /// how early a suggestion may fall.
    pub fn suggest_times(
        &self,
        query: &SuggestionQuery,
        existing: &[ScheduledContent],
        now: DateTime<Utc>,
    ) -> Vec<TimeSuggestion> {
        if query.count == 0 || query.platforms.is_empty() {
            return Vec::new();
        }

        let neighbours: Vec<&ScheduledContent> = existing
            .iter()
            .filter(|s| s.brand_id == query.brand_id && s.status.is_active())
            .collect();
        let spacing = self.spacing(&query.platforms);
        let earliest = now + Duration::minutes(self.scheduling.suggestion_lead_minutes);

        let mut scored: Vec<TimeSuggestion> = hourly_candidates(query.range)
            .filter(|t| *t >= earliest)
            .filter_map(|t| self.score(query, &neighbours, spacing, t))
            .collect();

        scored.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.time.cmp(&b.time)));

        let mut picked: Vec<TimeSuggestion> = Vec::new();
        for suggestion in scored {
            if picked.len() >= query.count {
                break;
            }
            if picked.iter().all(|p| (p.time - suggestion.time).abs() >= spacing) {
                picked.push(suggestion);
            }
        }
        picked
    }

    /// Largest minimum interval among the platforms, at least one hour.
    fn spacing(&self, platforms: &[Platform]) -> Duration {
        let minutes = platforms
            .iter()
            .map(|p| self.rules(*p).min_interval_minutes)
            .max()
            .unwrap_or(0)
            .max(60);
        Duration::minutes(minutes)
    }

    fn score(
        &self,
        query: &SuggestionQuery,
        neighbours: &[&ScheduledContent],
        spacing: Duration,
        at: DateTime<Utc>,
    ) -> Option<TimeSuggestion> {
        let local = at.with_timezone(&query.timezone);
        let mut audience = 0.0;
        let mut headroom = 0.0;

        for platform in &query.platforms {
            let rules = self.rules(*platform);
            let on_platform: Vec<&&ScheduledContent> =
                neighbours.iter().filter(|s| s.platforms.contains(platform)).collect();

            let interval = Duration::minutes(rules.min_interval_minutes);
            if on_platform.iter().any(|s| (s.scheduled_time - at).abs() < interval) {
                return None;
            }
            let same_day: Vec<&&&ScheduledContent> = on_platform
                .iter()
                .filter(|s| s.scheduled_time.with_timezone(&query.timezone).date_naive() == local.date_naive())
                .collect();
            let same_hour = same_day
                .iter()
                .filter(|s| s.scheduled_time.with_timezone(&query.timezone).hour() == local.hour())
                .count() as u32;
            if same_day.len() as u32 >= rules.daily_limit || same_hour >= rules.hourly_limit {
                return None;
            }

            let activity = rules.audience_activity(&local) + content_type_boost(query.content_type, local.hour());
            audience += activity.clamp(0.0, 1.0);
            headroom += 1.0 - same_day.len() as f64 / rules.daily_limit as f64;
        }

        let n = query.platforms.len() as f64;
        let audience = audience / n;
        let headroom = headroom / n;
        let nearby = neighbours
            .iter()
            .filter(|s| (s.scheduled_time - at).abs() < spacing * 2)
            .count();
        let density = 1.0 / (1.0 + nearby as f64);
        let score = AUDIENCE_WEIGHT * audience + HEADROOM_WEIGHT * headroom + DENSITY_WEIGHT * density;

        Some(TimeSuggestion {
            time: at,
            score,
            audience_score: audience,
            headroom_score: headroom,
            density_score: density,
            reason: describe(audience, headroom, nearby),
        })
    }
}

/// Whole hours in `[start, end)`, starting at the first hour boundary at or after start.
fn hourly_candidates(range: TimeRange) -> impl Iterator<Item = DateTime<Utc>> {
    let first = match range.start.duration_trunc(Duration::hours(1)) {
        Ok(trunc) if trunc == range.start => trunc,
        Ok(trunc) => trunc + Duration::hours(1),
        Err(_) => range.start,
    };
    (0..MAX_CANDIDATES)
        .map(move |i| first + Duration::hours(i as i64))
        .take_while(move |t| *t < range.end)
}

/// Extra audience for formats that do well at certain local hours.
fn content_type_boost(content_type: ContentType, hour: u32) -> f64 {
    match content_type {
        ContentType::Video | ContentType::Story if (18..=22).contains(&hour) => 0.1,
        ContentType::Text | ContentType::Link if (7..=10).contains(&hour) => 0.1,
        ContentType::Image | ContentType::Carousel if (11..=14).contains(&hour) => 0.05,
        _ => 0.0,
    }
}

fn describe(audience: f64, headroom: f64, nearby: usize) -> String {
    let hour = if audience >= 0.9 {
        "peak audience hour"
    } else if audience >= 0.6 {
        "good audience hour"
    } else {
        "off-peak hour"
    };
    let load = match nearby {
        0 => "no nearby posts".to_string(),
        1 => "1 nearby post".to_string(),
        n => format!("{} nearby posts", n),
    };
    format!("{}, {:.0}% of daily limit free, {}", hour, headroom * 100.0, load)
}
