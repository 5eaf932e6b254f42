//! Initial engagement metrics for freshly published posts.
//!
//! Collection is best-effort: a failure never changes a publish outcome.

use async_trait::async_trait;
use std::collections::HashMap;

use crate::domain::{InitialMetrics, Platform};
use crate::error::{CadenceError, Result};

#[async_trait]
pub trait MetricsCollector: Send + Sync {
    async fn collect_initial_metrics(&self, platform: Platform, post_id: &str) -> Result<InitialMetrics>;
}

/// Collector that reports nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMetricsCollector;

#[async_trait]
impl MetricsCollector for NoopMetricsCollector {
    async fn collect_initial_metrics(&self, _platform: Platform, _post_id: &str) -> Result<InitialMetrics> {
        Ok(InitialMetrics::default())
    }
}

/// Collector returning fixed numbers per platform; platforms without an
/// entry fail.
#[derive(Debug, Clone, Default)]
pub struct StaticMetricsCollector {
    metrics: HashMap<Platform, InitialMetrics>,
}

impl StaticMetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, platform: Platform, metrics: InitialMetrics) -> Self {
        self.metrics.insert(platform, metrics);
        self
    }
}

#[async_trait]
impl MetricsCollector for StaticMetricsCollector {
    async fn collect_initial_metrics(&self, platform: Platform, post_id: &str) -> Result<InitialMetrics> {
        self.metrics
            .get(&platform)
            .cloned()
            .ok_or_else(|| CadenceError::Metrics(format!("no metrics for {} post {}", platform, post_id)))
    }
}
