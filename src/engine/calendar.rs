//! Calendar views.

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use std::collections::{BTreeMap, HashSet};

use super::SchedulingEngine;
use crate::advisor::SuggestionQuery;
use crate::domain::{
    CalendarView, ContentType, Platform, PlatformUsage, SchedulingConflict, TimeRange, ViewType,
};
use crate::error::{CadenceError, Result};

/// Suggestions included with each calendar view.
const CALENDAR_SUGGESTIONS: usize = 5;

impl SchedulingEngine {
    /// Entries, conflicts, suggestions and daily usage for one calendar window.
    ///
    /// Day and week windows start at local midnight of `start_date` (weeks are
    /// moved back to Monday); month windows cover the calendar month holding
    /// `start_date`.
    pub async fn get_calendar_view(
        &self,
        brand_id: &str,
        view_type: ViewType,
        start_date: NaiveDate,
        timezone: Option<&str>,
    ) -> Result<CalendarView> {
        self.get_calendar_view_at(brand_id, view_type, start_date, timezone, Utc::now())
            .await
    }

    pub async fn get_calendar_view_at(
        &self,
        brand_id: &str,
        view_type: ViewType,
        start_date: NaiveDate,
        timezone: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<CalendarView> {
        let tz = self.zone(timezone)?;
        let (first_day, end_day) = window_days(view_type, start_date)?;
        let window = TimeRange::new(local_midnight(tz, first_day)?, local_midnight(tz, end_day)?)?;

        let schedules = self.repo.list_in_window(brand_id, window.start, window.end).await?;

        let mut conflicts: Vec<SchedulingConflict> = Vec::new();
        let mut seen: HashSet<(String, Vec<String>)> = HashSet::new();
        if !schedules.is_empty() {
            let (start, _) = self.advisor.conflict_window(window.start);
            let (_, end) = self.advisor.conflict_window(window.end);
            let neighbours = self.repo.list_in_window(brand_id, start, end).await?;
            for schedule in schedules.iter().filter(|s| s.status.is_active()) {
                for conflict in self.advisor.detect_conflicts(schedule, &neighbours) {
                    let mut ids = conflict.conflicting_schedule_ids.clone();
                    ids.push(schedule.id.clone());
                    ids.sort();
                    if seen.insert((conflict.conflict_type.as_str().to_string(), ids)) {
                        conflicts.push(conflict);
                    }
                }
            }
        }

        let mut platforms: Vec<Platform> = schedules.iter().flat_map(|s| s.platforms.iter().copied()).collect();
        platforms.sort();
        platforms.dedup();
        let optimal_times = self.calendar_suggestions(brand_id, &platforms, window, tz, now).await?;

        let mut usage: BTreeMap<(NaiveDate, Platform), u32> = BTreeMap::new();
        for schedule in schedules.iter().filter(|s| s.status.is_active()) {
            let day = schedule.scheduled_time.with_timezone(&tz).date_naive();
            for platform in &schedule.platforms {
                *usage.entry((day, *platform)).or_default() += 1;
            }
        }
        let platform_usage = usage
            .into_iter()
            .map(|((date, platform), count)| PlatformUsage {
                platform,
                date,
                count,
                limit: self.advisor.rules(platform).daily_limit,
            })
            .collect();

        Ok(CalendarView {
            brand_id: brand_id.to_string(),
            view_type,
            timezone: tz.name().to_string(),
            window,
            schedules,
            conflicts,
            optimal_times,
            platform_usage,
        })
    }

    async fn calendar_suggestions(
        &self,
        brand_id: &str,
        platforms: &[Platform],
        window: TimeRange,
        tz: Tz,
        now: DateTime<Utc>,
    ) -> Result<Vec<crate::domain::TimeSuggestion>> {
        let start = window.start.max(now);
        let Ok(range) = TimeRange::new(start, window.end) else {
            return Ok(Vec::new());
        };
        let platforms = if platforms.is_empty() {
            vec![Platform::Facebook, Platform::Instagram, Platform::Twitter, Platform::Linkedin]
        } else {
            platforms.to_vec()
        };
        let query = SuggestionQuery {
            brand_id: brand_id.to_string(),
            platforms,
            content_type: ContentType::Text,
            range,
            count: CALENDAR_SUGGESTIONS,
            timezone: tz,
        };
        self.suggest_at(&query, now).await
    }
}

/// Monday of the week holding `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

/// First day of the window and the day after its last day.
fn window_days(view_type: ViewType, start_date: NaiveDate) -> Result<(NaiveDate, NaiveDate)> {
    match view_type {
        ViewType::Day => Ok((start_date, start_date + Duration::days(1))),
        ViewType::Week => {
            let monday = week_start(start_date);
            Ok((monday, monday + Duration::days(7)))
        }
        ViewType::Month => {
            let first = start_date.with_day(1).ok_or_else(|| bad_date(start_date))?;
            let next = if first.month() == 12 {
                NaiveDate::from_ymd_opt(first.year() + 1, 1, 1)
            } else {
                NaiveDate::from_ymd_opt(first.year(), first.month() + 1, 1)
            };
            Ok((first, next.ok_or_else(|| bad_date(start_date))?))
        }
    }
}

/// Start of a local day as an instant. Days that skip midnight start at the
/// first valid local time.
fn local_midnight(tz: Tz, date: NaiveDate) -> Result<DateTime<Utc>> {
    let midnight = date.and_hms_opt(0, 0, 0).ok_or_else(|| bad_date(date))?;
    if let Some(at) = tz.from_local_datetime(&midnight).earliest() {
        return Ok(at.with_timezone(&Utc));
    }
    (1..=4)
        .map(|h| midnight + Duration::minutes(30 * h))
        .find_map(|t| tz.from_local_datetime(&t).earliest())
        .map(|at| at.with_timezone(&Utc))
        .ok_or_else(|| bad_date(date))
}

fn bad_date(date: NaiveDate) -> CadenceError {
    CadenceError::Validation(format!("cannot build a calendar window from {}", date))
}
