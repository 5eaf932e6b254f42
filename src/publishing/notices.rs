//! Notification wording for the publishing lifecycle.

use crate::domain::{NotificationKind, PlatformResult, ScheduledContent};
use crate::notify::Notification;

pub(crate) fn reminder(schedule: &ScheduledContent, minutes: i64) -> Notification {
    Notification::for_schedule(
        schedule,
        NotificationKind::PrePublishReminder,
        format!("Publishing soon: {}", schedule.title),
        format!(
            "\"{}\" publishes to {} in {} minutes ({})",
            schedule.title,
            platform_list(schedule),
            minutes.max(0),
            schedule.scheduled_time.to_rfc3339()
        ),
    )
}

pub(crate) fn outcome(schedule: &ScheduledContent, result: &PlatformResult, attempt: u32) -> Notification {
    let notification = if result.is_published() {
        Notification::for_schedule(
            schedule,
            NotificationKind::Published,
            format!("Published on {}: {}", result.platform, schedule.title),
            format!(
                "\"{}\" is live on {} (post {})",
                schedule.title,
                result.platform,
                result.platform_post_id.as_deref().unwrap_or("unknown")
            ),
        )
    } else {
        let (code, message) = result
            .error
            .as_ref()
            .map(|e| (e.code.as_str(), e.message.as_str()))
            .unwrap_or(("UNKNOWN", "no error detail"));
        Notification::for_schedule(
            schedule,
            NotificationKind::Failed,
            format!("Publishing failed on {}: {}", result.platform, schedule.title),
            format!(
                "Attempt {} of \"{}\" on {} failed [{}]: {}",
                attempt, schedule.title, result.platform, code, message
            ),
        )
    };
    notification.on_platform(result.platform)
}

pub(crate) fn edited(schedule: &ScheduledContent, editor: &str, changed: &[&str]) -> Notification {
    Notification::for_schedule(
        schedule,
        NotificationKind::Edited,
        format!("Schedule edited: {}", schedule.title),
        format!("{} changed {} of \"{}\"", editor, changed.join(", "), schedule.title),
    )
}

pub(crate) fn cancelled(schedule: &ScheduledContent, actor: &str, reason: Option<&str>) -> Notification {
    Notification::for_schedule(
        schedule,
        NotificationKind::Cancelled,
        format!("Schedule cancelled: {}", schedule.title),
        format!(
            "{} cancelled \"{}\": {}",
            actor,
            schedule.title,
            reason.unwrap_or("no reason given")
        ),
    )
}

fn platform_list(schedule: &ScheduledContent) -> String {
    schedule
        .platforms
        .iter()
        .map(|p| p.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
