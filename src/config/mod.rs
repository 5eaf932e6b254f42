//! Configuration system for Cadence.
//!
//! A single YAML file (`cadence.yml`) with typed sections:
//! - `storage`: where the schedule store lives
//! - `sweep`: publishing/notification sweep cadence
//! - `scheduling`: edit lock, reminders, retries, conflict tuning
//! - `platforms`: per-platform limits, content rules and audience hours

use std::path::PathBuf;

pub use self::global::{GlobalConfig, SchedulingConfig, StorageConfig, SweepConfig, parse_timezone};
pub use self::platform::{PlatformOverride, PlatformRules, PlatformsConfig};

mod global;
mod platform;

/// Default config file name.
pub const CONFIG_FILE_NAME: &str = "cadence.yml";

/// Load configuration from the standard search paths.
///
/// Search order:
/// 1. Explicit path if provided
/// 2. .cadence.yml in current directory (project config)
/// 3. ~/.config/cadence/cadence.yml (user config)
/// 4. Default values
pub fn load_config(explicit_path: Option<&PathBuf>) -> crate::error::Result<GlobalConfig> {
    let config = GlobalConfig::load(explicit_path)?;
    config.validate()?;
    Ok(config)
}
