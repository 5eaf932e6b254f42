//! ID generation utilities for Cadence
//!
//! Provides functions for generating unique identifiers for schedules,
//! notifications and synthetic platform posts.

use chrono::Utc;
use rand::Rng;

/// Get current timestamp in milliseconds since Unix epoch
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Generate a unique schedule ID
///
/// Format: `sch-{timestamp_ms}-{random_hex}`
/// Example: `sch-1738300800123-a1b2`
pub fn generate_schedule_id() -> String {
    let random: u16 = rand::rng().random();
    format!("sch-{}-{:04x}", now_ms(), random)
}

/// Generate a notification ID scoped to a schedule
///
/// Format: `ntf-{schedule_id}-{random_hex}`
pub fn generate_notification_id(schedule_id: &str) -> String {
    let random: u32 = rand::rng().random();
    format!("ntf-{}-{:08x}", schedule_id, random)
}

/// Generate a synthetic post ID for a platform
///
/// Format: `{platform}-{timestamp_ms}-{random_hex}`
pub fn generate_post_id(platform: &str) -> String {
    let random: u16 = rand::rng().random();
    format!("{}-{}-{:04x}", platform, now_ms(), random)
}
