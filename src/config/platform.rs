//! Per-platform rules: posting limits, content constraints, audience hours.
//!
//! Every platform has built-in rules. A config entry only needs the fields
//! it wants to change; the rest come from the built-in rules for that platform.

use chrono::{DateTime, Datelike, TimeZone, Timelike, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::{MediaKind, Platform};
use crate::error::{CadenceError, Result};

/// Effective rules for one platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformRules {
    pub daily_limit: u32,
    pub hourly_limit: u32,
    /// Minimum spacing between two posts on this platform.
    pub min_interval_minutes: i64,
    pub max_text_length: usize,
    pub max_media: usize,
    pub max_hashtags: usize,
    pub media_kinds: Vec<MediaKind>,
    pub requires_media: bool,
    /// Local hours (0-23) of peak audience activity.
    pub peak_hours: Vec<u32>,
    /// Local hours of good but not peak activity.
    pub good_hours: Vec<u32>,
    /// Multiplier applied to audience activity on Saturday and Sunday.
    pub weekend_factor: f64,
}

const PEAK_ACTIVITY: f64 = 1.0;
const GOOD_ACTIVITY: f64 = 0.65;
const DAYTIME_ACTIVITY: f64 = 0.3;
const NIGHT_ACTIVITY: f64 = 0.1;

impl PlatformRules {
    /// Built-in rules for a platform.
    pub fn builtin(platform: Platform) -> Self {
        use MediaKind::*;
        match platform {
            Platform::Twitter => rules(15, 3, 30, 280, 4, 5, &[Image, Video, Gif], false, &[9, 12, 17], &[8, 10, 11, 13, 15, 16, 18], 0.8),
            Platform::Facebook => rules(5, 2, 60, 63_206, 10, 10, &[Image, Video], false, &[13, 15], &[9, 10, 11, 12, 14, 16], 0.9),
            Platform::Instagram => rules(3, 1, 120, 2_200, 10, 30, &[Image, Video], true, &[11, 19], &[9, 12, 13, 17, 18, 20], 1.0),
            Platform::Linkedin => rules(2, 1, 180, 3_000, 9, 5, &[Image, Video, Document], false, &[8, 12], &[7, 9, 10, 11, 17], 0.4),
            Platform::Tiktok => rules(4, 1, 120, 2_200, 1, 10, &[Video], true, &[19, 21], &[12, 15, 18, 20, 22], 1.1),
            Platform::Youtube => rules(2, 1, 240, 5_000, 1, 15, &[Video], true, &[15, 17], &[12, 14, 16, 18, 19, 20], 1.1),
            Platform::Pinterest => rules(10, 3, 30, 500, 5, 20, &[Image, Video], true, &[20, 21], &[14, 15, 16, 19, 22], 1.1),
            Platform::GoogleAds => rules(20, 5, 15, 90, 20, 0, &[Image, Video], false, &[10, 14], &[9, 11, 12, 13, 15, 16, 17], 0.7),
            Platform::MetaAds => rules(20, 5, 15, 125, 10, 0, &[Image, Video], false, &[12, 19], &[9, 10, 11, 13, 18, 20], 0.9),
        }
    }

    /// Audience activity in `[0, 1]` for an instant seen in a local timezone.
    pub fn audience_activity<Tz: TimeZone>(&self, local: &DateTime<Tz>) -> f64 {
        let hour = local.hour();
        let base = if self.peak_hours.contains(&hour) {
            PEAK_ACTIVITY
        } else if self.good_hours.contains(&hour) {
            GOOD_ACTIVITY
        } else if (6..=22).contains(&hour) {
            DAYTIME_ACTIVITY
        } else {
            NIGHT_ACTIVITY
        };
        let factor = match local.weekday() {
            Weekday::Sat | Weekday::Sun => self.weekend_factor,
            _ => 1.0,
        };
        (base * factor).clamp(0.0, 1.0)
    }
}

#[allow(clippy::too_many_arguments)]
fn rules(
    daily_limit: u32,
    hourly_limit: u32,
    min_interval_minutes: i64,
    max_text_length: usize,
    max_media: usize,
    max_hashtags: usize,
    media_kinds: &[MediaKind],
    requires_media: bool,
    peak_hours: &[u32],
    good_hours: &[u32],
    weekend_factor: f64,
) -> PlatformRules {
    PlatformRules {
        daily_limit,
        hourly_limit,
        min_interval_minutes,
        max_text_length,
        max_media,
        max_hashtags,
        media_kinds: media_kinds.to_vec(),
        requires_media,
        peak_hours: peak_hours.to_vec(),
        good_hours: good_hours.to_vec(),
        weekend_factor,
    }
}

/// Partial rules from the config file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct PlatformOverride {
    pub daily_limit: Option<u32>,
    pub hourly_limit: Option<u32>,
    pub min_interval_minutes: Option<i64>,
    pub max_text_length: Option<usize>,
    pub max_media: Option<usize>,
    pub max_hashtags: Option<usize>,
    pub media_kinds: Option<Vec<MediaKind>>,
    pub requires_media: Option<bool>,
    pub peak_hours: Option<Vec<u32>>,
    pub good_hours: Option<Vec<u32>>,
    pub weekend_factor: Option<f64>,
}

impl PlatformOverride {
    fn apply(&self, mut base: PlatformRules) -> PlatformRules {
        macro_rules! merge {
            ($($field:ident),*) => {
                $(if let Some(value) = &self.$field {
                    base.$field = value.clone();
                })*
            };
        }
        merge!(
            daily_limit,
            hourly_limit,
            min_interval_minutes,
            max_text_length,
            max_media,
            max_hashtags,
            media_kinds,
            requires_media,
            peak_hours,
            good_hours,
            weekend_factor
        );
        base
    }
}

/// Platform rule overrides keyed by platform.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlatformsConfig {
    overrides: BTreeMap<Platform, PlatformOverride>,
}

impl PlatformsConfig {
    /// Effective rules for a platform.
    pub fn rules(&self, platform: Platform) -> PlatformRules {
        let base = PlatformRules::builtin(platform);
        match self.overrides.get(&platform) {
            Some(over) => over.apply(base),
            None => base,
        }
    }

    pub fn set_override(&mut self, platform: Platform, over: PlatformOverride) {
        self.overrides.insert(platform, over);
    }

    pub fn validate(&self) -> Result<()> {
        for platform in self.overrides.keys() {
            let rules = self.rules(*platform);
            if rules.daily_limit == 0 || rules.hourly_limit == 0 {
                return Err(CadenceError::Config(format!(
                    "platforms.{}: posting limits must be > 0",
                    platform
                )));
            }
            if rules.hourly_limit > rules.daily_limit {
                return Err(CadenceError::Config(format!(
                    "platforms.{}: hourly-limit exceeds daily-limit",
                    platform
                )));
            }
            if rules.min_interval_minutes < 0 {
                return Err(CadenceError::Config(format!(
                    "platforms.{}: min-interval-minutes must be >= 0",
                    platform
                )));
            }
            if rules.peak_hours.iter().chain(&rules.good_hours).any(|h| *h > 23) {
                return Err(CadenceError::Config(format!(
                    "platforms.{}: audience hours must be within 0-23",
                    platform
                )));
            }
        }
        Ok(())
    }
}
