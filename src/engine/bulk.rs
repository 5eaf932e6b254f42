//! Bulk scheduling.

use chrono::{DateTime, Utc};

use super::SchedulingEngine;
use crate::advisor::SuggestionQuery;
use crate::domain::{
    BulkConflict, BulkFailure, BulkItem, BulkScheduleRequest, BulkScheduleResult, BulkScheduled, DistributionStrategy,
};
use crate::error::{CadenceError, Result};

impl SchedulingEngine {
    /// Schedule every item of a batch independently.
    ///
    /// The result holds exactly one outcome per item, keyed by its index in
    /// the request. Items are scheduled in order, so later items see the
    /// earlier ones when checking conflicts and picking optimal times.
    pub async fn bulk_schedule_content(&self, request: &BulkScheduleRequest) -> Result<BulkScheduleResult> {
        self.bulk_schedule_content_at(request, Utc::now()).await
    }

    pub async fn bulk_schedule_content_at(
        &self,
        request: &BulkScheduleRequest,
        now: DateTime<Utc>,
    ) -> Result<BulkScheduleResult> {
        // A bad batch timezone fails each item rather than the call
        let zone = self.zone(request.timezone.as_deref()).map_err(|e| match e {
            CadenceError::Validation(message) => message,
            other => other.to_string(),
        });
        let even = self.even_times(request);
        let mut result = BulkScheduleResult::default();

        for (index, item) in request.items.iter().enumerate() {
            let time = match (&zone, request.strategy) {
                (Err(message), _) => Err(CadenceError::Validation(message.clone())),
                (Ok(_), DistributionStrategy::Even) => even.get(index).copied().flatten().ok_or_else(missing_range),
                (Ok(_), DistributionStrategy::Custom) => custom_time(request, item, index),
                (Ok(tz), DistributionStrategy::Optimal) => self.optimal_time(request, item, *tz, now).await,
            };

            let outcome = match time {
                Ok(time) => self.schedule_content_at(request.item_request(item, time), now).await,
                Err(e) => Err(e),
            };
            match outcome {
                Ok(schedule) => result.scheduled.push(BulkScheduled { index, schedule }),
                Err(CadenceError::Conflict(conflicts)) => result.conflicts.push(BulkConflict { index, conflicts }),
                Err(e) => result.failed.push(BulkFailure {
                    index,
                    code: e.code().to_string(),
                    error: e.to_string(),
                }),
            }
        }

        tracing::info!(
            brand_id = %request.brand_id,
            items = request.items.len(),
            scheduled = result.scheduled.len(),
            conflicts = result.conflicts.len(),
            failed = result.failed.len(),
            "Bulk schedule complete"
        );
        Ok(result)
    }

    /// Evenly spaced slots: item `i` of `n` goes to `start + i * span / n`.
    fn even_times(&self, request: &BulkScheduleRequest) -> Vec<Option<DateTime<Utc>>> {
        let n = request.items.len();
        let Some(range) = request.time_range.filter(|_| request.strategy == DistributionStrategy::Even) else {
            return vec![None; n];
        };
        let step = (range.end - range.start) / n.max(1) as i32;
        (0..n).map(|i| Some(range.start + step * i as i32)).collect()
    }

    async fn optimal_time(
        &self,
        request: &BulkScheduleRequest,
        item: &BulkItem,
        timezone: chrono_tz::Tz,
        now: DateTime<Utc>,
    ) -> Result<DateTime<Utc>> {
        let range = request.time_range.ok_or_else(missing_range)?;
        let query = SuggestionQuery {
            brand_id: request.brand_id.clone(),
            platforms: item.platforms.clone(),
            content_type: item.content_type,
            range,
            count: 1,
            timezone,
        };
        self.suggest_at(&query, now)
            .await?
            .into_iter()
            .next()
            .map(|s| s.time)
            .ok_or_else(|| CadenceError::Validation("no free slot left in the time range".to_string()))
    }
}

fn custom_time(request: &BulkScheduleRequest, item: &BulkItem, index: usize) -> Result<DateTime<Utc>> {
    if !request.custom_times.is_empty() {
        return request.custom_times.get(index).copied().ok_or_else(|| {
            CadenceError::Validation(format!(
                "custom_times has {} entries, none for item {}",
                request.custom_times.len(),
                index
            ))
        });
    }
    item.scheduled_time
        .ok_or_else(|| CadenceError::Validation(format!("item {} has no scheduled_time", index)))
}

fn missing_range() -> CadenceError {
    CadenceError::Validation("time_range is required for this strategy".to_string())
}

#[cfg(test)]
mod tests {
    use super::super::harness::harness;
    use super::*;
    use crate::domain::{ContentBody, ContentType, Platform, Priority, TimeRange};
    use crate::store::ScheduleRepository;
    use chrono::Duration;

    fn item(n: usize) -> BulkItem {
        BulkItem {
            content_id: None,
            title: format!("Item {}", n),
            description: None,
            content: ContentBody {
                text: format!("bulk post {} about topic{}", n, n),
                ..Default::default()
            },
            platforms: vec![Platform::Twitter],
            content_type: ContentType::Text,
            campaign: None,
            tags: vec![],
            priority: Priority::Medium,
            notification_settings: None,
            scheduled_time: None,
        }
    }

    fn batch(strategy: DistributionStrategy, items: Vec<BulkItem>) -> BulkScheduleRequest {
        let start = Utc::now() + Duration::days(1);
        BulkScheduleRequest {
            brand_id: "brand-1".to_string(),
            created_by: "importer".to_string(),
            items,
            strategy,
            time_range: Some(TimeRange::new(start, start + Duration::hours(8)).unwrap()),
            custom_times: vec![],
            timezone: None,
            max_retries: None,
            allow_conflicts: false,
        }
    }

    #[tokio::test]
    async fn test_even_distribution() {
        let h = harness();
        let request = batch(DistributionStrategy::Even, (0..4).map(item).collect());

        let result = h.engine.bulk_schedule_content(&request).await.unwrap();

        assert_eq!(result.total(), 4);
        assert_eq!(result.scheduled.len(), 4);
        let start = request.time_range.unwrap().start;
        for scheduled in &result.scheduled {
            assert_eq!(
                scheduled.schedule.scheduled_time,
                start + Duration::hours(2 * scheduled.index as i64)
            );
        }
    }

    #[tokio::test]
    async fn test_mixed_outcomes_keep_indices() {
        let h = harness();
        let mut items: Vec<BulkItem> = (0..3).map(item).collect();
        items[1].title.clear();
        let base = Utc::now() + Duration::days(1);
        let mut request = batch(DistributionStrategy::Custom, items);
        // item 2 lands on top of item 0
        request.custom_times = vec![base, base + Duration::hours(2), base + Duration::minutes(5)];

        let result = h.engine.bulk_schedule_content(&request).await.unwrap();

        assert_eq!(result.total(), 3);
        assert_eq!(result.scheduled[0].index, 0);
        assert_eq!(result.failed[0].index, 1);
        assert_eq!(result.failed[0].code, "VALIDATION_ERROR");
        assert_eq!(result.conflicts[0].index, 2);
    }

    #[tokio::test]
    async fn test_custom_times_length_mismatch_fails_items() {
        let h = harness();
        let mut request = batch(DistributionStrategy::Custom, (0..2).map(item).collect());
        request.custom_times = vec![Utc::now() + Duration::days(1)];

        let result = h.engine.bulk_schedule_content(&request).await.unwrap();

        assert_eq!(result.total(), 2);
        assert_eq!(result.scheduled.len(), 1);
        assert_eq!(result.failed[0].index, 1);
    }

    #[tokio::test]
    async fn test_optimal_spreads_items() {
        let h = harness();
        let request = batch(DistributionStrategy::Optimal, (0..3).map(item).collect());

        let result = h.engine.bulk_schedule_content(&request).await.unwrap();

        assert_eq!(result.scheduled.len(), 3);
        let mut times: Vec<_> = result.scheduled.iter().map(|s| s.schedule.scheduled_time).collect();
        times.sort();
        times.dedup();
        assert_eq!(times.len(), 3);
    }

    #[tokio::test]
    async fn test_even_without_range_fails_every_item() {
        let h = harness();
        let mut request = batch(DistributionStrategy::Even, (0..2).map(item).collect());
        request.time_range = None;

        let result = h.engine.bulk_schedule_content(&request).await.unwrap();
        assert_eq!(result.failed.len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_batch_timezone_fails_every_item() {
        let h = harness();
        let mut request = batch(DistributionStrategy::Even, (0..3).map(item).collect());
        request.timezone = Some("Mars/Olympus".to_string());

        let result = h.engine.bulk_schedule_content(&request).await.unwrap();

        assert_eq!(result.total(), 3);
        let indices: Vec<usize> = result.failed.iter().map(|f| f.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        for failure in &result.failed {
            assert_eq!(failure.code, "VALIDATION_ERROR");
            assert!(failure.error.contains("Mars/Olympus"));
        }
        assert!(h.store.list_schedules(Some("brand-1")).await.unwrap().is_empty());
    }
}
