//! Scriptable publisher for tests.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use super::{PlatformPublisher, PublishResult, ValidationReport};
use crate::domain::{Platform, ScheduledContent};
use crate::error::{CadenceError, Result};
use crate::id::generate_post_id;

/// What the mock does on its next call for a platform.
#[derive(Debug, Clone, PartialEq)]
pub enum MockOutcome {
    /// Publish succeeds with a synthetic post id
    Succeed,
    /// Platform answers with a refusal
    Refuse(String),
    /// Validation reports these issues
    Invalid(Vec<String>),
    /// The call itself errors
    Error(String),
    /// The call panics
    Panic,
}

/// Publisher whose outcomes are queued per platform.
///
/// Platforms with nothing queued use the default outcome, `Succeed` unless
/// changed with `set_default`.
#[derive(Debug, Default)]
pub struct MockPublisher {
    scripted: Mutex<HashMap<Platform, VecDeque<MockOutcome>>>,
    defaults: Mutex<HashMap<Platform, MockOutcome>>,
    publish_calls: Mutex<HashMap<Platform, u32>>,
    delay: Option<Duration>,
}

impl MockPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep this long inside every publish call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Queue outcomes for the next attempts on a platform.
    pub fn script(&self, platform: Platform, outcomes: impl IntoIterator<Item = MockOutcome>) {
        if let Ok(mut scripted) = self.scripted.lock() {
            scripted.entry(platform).or_default().extend(outcomes);
        }
    }

    /// Outcome used once a platform's script runs dry.
    pub fn set_default(&self, platform: Platform, outcome: MockOutcome) {
        if let Ok(mut defaults) = self.defaults.lock() {
            defaults.insert(platform, outcome);
        }
    }

    /// Number of publish calls made for a platform.
    pub fn publish_calls(&self, platform: Platform) -> u32 {
        self.publish_calls
            .lock()
            .map(|calls| calls.get(&platform).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    fn peek(&self, platform: Platform) -> MockOutcome {
        let scripted = self.scripted.lock().ok().and_then(|s| s.get(&platform).and_then(|q| q.front().cloned()));
        scripted.unwrap_or_else(|| self.default_for(platform))
    }

    fn next(&self, platform: Platform) -> MockOutcome {
        let scripted = self
            .scripted
            .lock()
            .ok()
            .and_then(|mut s| s.get_mut(&platform).and_then(|q| q.pop_front()));
        scripted.unwrap_or_else(|| self.default_for(platform))
    }

    fn default_for(&self, platform: Platform) -> MockOutcome {
        self.defaults
            .lock()
            .ok()
            .and_then(|d| d.get(&platform).cloned())
            .unwrap_or(MockOutcome::Succeed)
    }
}

#[async_trait]
impl PlatformPublisher for MockPublisher {
    async fn validate_content(&self, platform: Platform, _content: &ScheduledContent) -> Result<ValidationReport> {
        match self.peek(platform) {
            MockOutcome::Invalid(issues) => {
                // Consume the scripted entry; publish is never reached
                self.next(platform);
                Ok(ValidationReport::from_issues(issues))
            }
            _ => Ok(ValidationReport::from_issues(Vec::new())),
        }
    }

    async fn publish_content(&self, platform: Platform, _content: &ScheduledContent) -> Result<PublishResult> {
        if let Ok(mut calls) = self.publish_calls.lock() {
            *calls.entry(platform).or_insert(0) += 1;
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match self.next(platform) {
            MockOutcome::Succeed | MockOutcome::Invalid(_) => Ok(PublishResult::ok(generate_post_id(platform.as_str()))),
            MockOutcome::Refuse(message) => Ok(PublishResult::failed(message)),
            MockOutcome::Error(message) => Err(CadenceError::Publish {
                platform: platform.to_string(),
                message,
            }),
            MockOutcome::Panic => panic!("mock publisher panic on {}", platform),
        }
    }
}
