//! Platform publishing capability.
//!
//! Real social/ad platform wire protocols live behind `PlatformPublisher`.
//! This crate ships two implementations:
//! - `DryRunPublisher`: validates against the configured platform rules and
//!   "publishes" by logging and minting a synthetic post id
//! - `MockPublisher`: scriptable outcomes for tests

mod dry_run;
mod mock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{Platform, PublishErrorDetail, ScheduledContent};
use crate::error::Result;

pub use dry_run::{DryRunPublisher, check_content};
pub use mock::{MockOutcome, MockPublisher};

/// Result of checking content against one platform's rules.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub issues: Vec<String>,
}

impl ValidationReport {
    pub fn from_issues(issues: Vec<String>) -> Self {
        Self {
            valid: issues.is_empty(),
            issues,
        }
    }
}

/// Result of one publish call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishResult {
    pub success: bool,
    pub platform_post_id: Option<String>,
    pub error: Option<PublishErrorDetail>,
}

impl PublishResult {
    pub fn ok(post_id: impl Into<String>) -> Self {
        Self {
            success: true,
            platform_post_id: Some(post_id.into()),
            error: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            platform_post_id: None,
            error: Some(PublishErrorDetail::new(PublishErrorDetail::PUBLISH_FAILED, message)),
        }
    }
}

/// Publishes content to external platforms.
///
/// An `Err` return means the call itself broke (transport, auth, panic
/// upstream); a `PublishResult` with `success: false` means the platform
/// answered and refused.
#[async_trait]
pub trait PlatformPublisher: Send + Sync {
    async fn validate_content(&self, platform: Platform, content: &ScheduledContent) -> Result<ValidationReport>;

    async fn publish_content(&self, platform: Platform, content: &ScheduledContent) -> Result<PublishResult>;
}
