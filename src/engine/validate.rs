//! Request validation.

use chrono::{DateTime, Utc};

use crate::config::{SchedulingConfig, parse_timezone};
use crate::domain::{Platform, ScheduleRequest};
use crate::error::{CadenceError, Result};

/// Shape checks every new schedule passes before conflicts are considered.
///
/// Returns the de-duplicated platform list (first occurrence wins) and the
/// resolved timezone name.
pub(super) fn validate_request(
    request: &ScheduleRequest,
    scheduling: &SchedulingConfig,
    now: DateTime<Utc>,
) -> Result<(Vec<Platform>, String)> {
    if request.brand_id.trim().is_empty() {
        return Err(invalid("brand_id is required"));
    }
    if request.title.trim().is_empty() {
        return Err(invalid("title is required"));
    }
    if request.content.is_empty() {
        return Err(invalid("content must have text or media"));
    }

    let mut platforms: Vec<Platform> = Vec::with_capacity(request.platforms.len());
    for platform in &request.platforms {
        if !platforms.contains(platform) {
            platforms.push(*platform);
        }
    }
    if platforms.is_empty() {
        return Err(invalid("at least one platform is required"));
    }

    if request.scheduled_time <= now {
        return Err(CadenceError::Validation(format!(
            "scheduled_time {} is not in the future",
            request.scheduled_time.to_rfc3339()
        )));
    }

    let timezone = request
        .timezone
        .clone()
        .unwrap_or_else(|| scheduling.default_timezone.clone());
    parse_timezone(&timezone)?;

    if let Some(max_retries) = request.max_retries
        && max_retries > scheduling.max_retries_cap
    {
        return Err(CadenceError::Validation(format!(
            "max_retries {} exceeds the cap of {}",
            max_retries, scheduling.max_retries_cap
        )));
    }
    if let Some(settings) = &request.notification_settings
        && settings.pre_publish_minutes.is_some_and(|m| m < 0)
    {
        return Err(invalid("pre_publish_minutes must not be negative"));
    }

    Ok((platforms, timezone))
}

fn invalid(message: &str) -> CadenceError {
    CadenceError::Validation(message.to_string())
}
