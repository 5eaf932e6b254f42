//! Rule-checking publisher that never leaves the process.

use async_trait::async_trait;

use super::{PlatformPublisher, PublishResult, ValidationReport};
use crate::config::{PlatformRules, PlatformsConfig};
use crate::domain::{ContentType, MediaKind, Platform, ScheduledContent};
use crate::error::Result;
use crate::id::generate_post_id;

/// Validates against configured platform rules and logs instead of posting.
#[derive(Debug, Clone, Default)]
pub struct DryRunPublisher {
    platforms: PlatformsConfig,
}

impl DryRunPublisher {
    pub fn new(platforms: PlatformsConfig) -> Self {
        Self { platforms }
    }
}

/// Check content against one platform's rules, returning every issue found.
pub fn check_content(platform: Platform, rules: &PlatformRules, content: &ScheduledContent) -> Vec<String> {
    let body = &content.content;
    let mut issues = Vec::new();

    if body.is_empty() {
        issues.push("content has neither text nor media".to_string());
    }

    let text_len = body.text.chars().count();
    if text_len > rules.max_text_length {
        issues.push(format!(
            "text is {} characters, {} allows {}",
            text_len, platform, rules.max_text_length
        ));
    }
    if body.media.len() > rules.max_media {
        issues.push(format!(
            "{} media attachments, {} allows {}",
            body.media.len(),
            platform,
            rules.max_media
        ));
    }
    if body.hashtags.len() > rules.max_hashtags {
        issues.push(format!(
            "{} hashtags, {} allows {}",
            body.hashtags.len(),
            platform,
            rules.max_hashtags
        ));
    }
    for media in &body.media {
        if !rules.media_kinds.contains(&media.kind) {
            issues.push(format!("{} does not accept {} media", platform, media.kind.as_str()));
        }
    }
    if rules.requires_media && body.media.is_empty() {
        issues.push(format!("{} requires at least one media attachment", platform));
    }

    let needs = match content.content_type {
        ContentType::Image | ContentType::Carousel => Some(MediaKind::Image),
        ContentType::Video => Some(MediaKind::Video),
        _ => None,
    };
    if let Some(kind) = needs
        && !body.media.iter().any(|m| m.kind == kind)
    {
        issues.push(format!(
            "{} content needs a {} attachment",
            content.content_type.as_str(),
            kind.as_str()
        ));
    }
    if content.content_type == ContentType::Carousel && body.media.len() < 2 {
        issues.push("carousel content needs at least two media attachments".to_string());
    }
    if content.content_type == ContentType::Link && body.link.is_none() {
        issues.push("link content has no link".to_string());
    }

    issues
}

#[async_trait]
impl PlatformPublisher for DryRunPublisher {
    async fn validate_content(&self, platform: Platform, content: &ScheduledContent) -> Result<ValidationReport> {
        let rules = self.platforms.rules(platform);
        Ok(ValidationReport::from_issues(check_content(platform, &rules, content)))
    }

    async fn publish_content(&self, platform: Platform, content: &ScheduledContent) -> Result<PublishResult> {
        let post_id = generate_post_id(platform.as_str());
        tracing::info!(
            schedule_id = %content.id,
            platform = %platform,
            post_id = %post_id,
            "Dry-run publish"
        );
        Ok(PublishResult::ok(post_id))
    }
}
