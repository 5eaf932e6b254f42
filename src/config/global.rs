//! Global configuration.
//!
//! Loaded from ~/.config/cadence/cadence.yml or .cadence.yml

use chrono::Duration;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use super::platform::PlatformsConfig;
use crate::error::{CadenceError, Result};

/// Global configuration for Cadence.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct GlobalConfig {
    /// Log level override (falls back to RUST_LOG).
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,

    /// Storage settings.
    pub storage: StorageConfig,

    /// Sweep cadence.
    pub sweep: SweepConfig,

    /// Scheduling rules.
    pub scheduling: SchedulingConfig,

    /// Per-platform rules.
    pub platforms: PlatformsConfig,
}

impl GlobalConfig {
    /// Load configuration with fallback chain.
    ///
    /// Search order:
    /// 1. Explicit path if provided
    /// 2. .cadence.yml in current directory
    /// 3. ~/.config/cadence/cadence.yml
    /// 4. Defaults
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // Explicit path takes precedence
        if let Some(path) = config_path {
            return Self::load_from_file(path)
                .map_err(|e| CadenceError::Config(format!("Failed to load config from {}: {}", path.display(), e)));
        }

        // Try project config
        let project_config = PathBuf::from(".cadence.yml");
        if project_config.exists() {
            match Self::load_from_file(&project_config) {
                Ok(config) => {
                    log::info!("Loaded config from .cadence.yml");
                    return Ok(config);
                }
                Err(e) => {
                    log::warn!("Failed to load .cadence.yml: {}", e);
                }
            }
        }

        // Try user config
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("cadence").join(super::CONFIG_FILE_NAME);
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => {
                        log::info!("Loaded config from {}", user_config.display());
                        return Ok(config);
                    }
                    Err(e) => {
                        log::warn!("Failed to load {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.sweep.interval_secs == 0 {
            return Err(CadenceError::Config("sweep.interval-secs must be > 0".to_string()));
        }
        if self.scheduling.retry_base_minutes <= 0 {
            return Err(CadenceError::Config(
                "scheduling.retry-base-minutes must be > 0".to_string(),
            ));
        }
        if self.scheduling.default_max_retries > self.scheduling.max_retries_cap {
            return Err(CadenceError::Config(
                "scheduling.default-max-retries exceeds scheduling.max-retries-cap".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.scheduling.similarity_threshold) {
            return Err(CadenceError::Config(
                "scheduling.similarity-threshold must be within 0..=1".to_string(),
            ));
        }
        self.scheduling.default_tz()?;
        self.platforms.validate()
    }
}

/// Storage settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding the JSONL log and SQLite index.
    #[serde(rename = "data-dir")]
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("cadence"),
        }
    }
}

/// Sweep cadence.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SweepConfig {
    /// Seconds between sweeps.
    #[serde(rename = "interval-secs")]
    pub interval_secs: u64,

    /// Minutes after which a `publishing` claim is considered abandoned.
    #[serde(rename = "stale-claim-minutes")]
    pub stale_claim_minutes: i64,

    /// Maximum due schedules processed per sweep.
    #[serde(rename = "batch-limit")]
    pub batch_limit: usize,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval_secs: 60,
            stale_claim_minutes: 30,
            batch_limit: 100,
        }
    }
}

/// Scheduling rules.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SchedulingConfig {
    /// Edits and cancellations are refused this close to publication.
    #[serde(rename = "edit-lock-minutes")]
    pub edit_lock_minutes: i64,

    /// Default lead time for pre-publish reminders.
    #[serde(rename = "pre-publish-minutes")]
    pub pre_publish_minutes: i64,

    #[serde(rename = "default-max-retries")]
    pub default_max_retries: u32,

    #[serde(rename = "max-retries-cap")]
    pub max_retries_cap: u32,

    /// Backoff is `retry_base_minutes * 2^retry_count`.
    #[serde(rename = "retry-base-minutes")]
    pub retry_base_minutes: i64,

    #[serde(rename = "default-timezone")]
    pub default_timezone: String,

    /// How many times auto-resolve may move a schedule before giving up.
    #[serde(rename = "auto-resolve-passes")]
    pub auto_resolve_passes: u32,

    /// Half-width of the window of existing schedules considered for conflicts.
    #[serde(rename = "conflict-window-hours")]
    pub conflict_window_hours: i64,

    #[serde(rename = "similarity-threshold")]
    pub similarity_threshold: f64,

    #[serde(rename = "similarity-window-hours")]
    pub similarity_window_hours: i64,

    /// Suggestions never fall closer to now than this.
    #[serde(rename = "suggestion-lead-minutes")]
    pub suggestion_lead_minutes: i64,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            edit_lock_minutes: 5,
            pre_publish_minutes: 30,
            default_max_retries: 3,
            max_retries_cap: 10,
            retry_base_minutes: 5,
            default_timezone: "UTC".to_string(),
            auto_resolve_passes: 3,
            conflict_window_hours: 48,
            similarity_threshold: 0.8,
            similarity_window_hours: 24,
            suggestion_lead_minutes: 15,
        }
    }
}

impl SchedulingConfig {
    pub fn edit_lock(&self) -> Duration {
        Duration::minutes(self.edit_lock_minutes)
    }

    /// Delay before retry number `retry_count + 1`.
    pub fn backoff(&self, retry_count: u32) -> Duration {
        let factor = 2i64.saturating_pow(retry_count.min(16));
        Duration::minutes(self.retry_base_minutes.saturating_mul(factor))
    }

    pub fn default_tz(&self) -> Result<Tz> {
        parse_timezone(&self.default_timezone)
    }
}

/// Parse an IANA timezone name.
pub fn parse_timezone(name: &str) -> Result<Tz> {
    name.parse::<Tz>()
        .map_err(|_| CadenceError::Validation(format!("unknown timezone: {}", name)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validates() {
        let config = GlobalConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.scheduling.edit_lock_minutes, 5);
        assert_eq!(config.scheduling.pre_publish_minutes, 30);
    }

    #[test]
    fn test_backoff_doubles() {
        let scheduling = SchedulingConfig::default();
        assert_eq!(scheduling.backoff(0), Duration::minutes(5));
        assert_eq!(scheduling.backoff(1), Duration::minutes(10));
        assert_eq!(scheduling.backoff(2), Duration::minutes(20));
    }

    #[test]
    fn test_parse_yaml_overrides() {
        let yaml = r#"
log-level: debug
sweep:
  interval-secs: 120
scheduling:
  default-timezone: America/New_York
  retry-base-minutes: 2
platforms:
  twitter:
    daily-limit: 5
"#;
        let config: GlobalConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.log_level.as_deref(), Some("debug"));
        assert_eq!(config.sweep.interval_secs, 120);
        assert_eq!(config.sweep.batch_limit, 100);
        assert_eq!(config.scheduling.retry_base_minutes, 2);
        assert!(config.validate().is_ok());
        assert_eq!(
            config.platforms.rules(crate::domain::Platform::Twitter).daily_limit,
            5
        );
    }

    #[test]
    fn test_validate_rejects_bad_timezone() {
        let mut config = GlobalConfig::default();
        config.scheduling.default_timezone = "Mars/Olympus".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let mut config = GlobalConfig::default();
        config.sweep.interval_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_explicit_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("cadence.yml");
        fs::write(&path, "sweep:\n  stale-claim-minutes: 10\n").unwrap();
        let config = GlobalConfig::load(Some(&path)).unwrap();
        assert_eq!(config.sweep.stale_claim_minutes, 10);
    }
}
