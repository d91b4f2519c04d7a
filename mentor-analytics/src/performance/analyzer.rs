//! Performance analyzer over the task-attempt log.

use std::sync::Arc;

use tracing::{debug, instrument};

use super::motivation::MotivationEstimate;
use super::recommendations::{Recommendation, RecommendationInputs, recommend};
use super::stats::{PerformanceStats, TrendReport, fluctuation_score};
use crate::config::PerformanceConfig;
use crate::error::Result;
use crate::store::{LearnerStore, PerformanceQuery};
use crate::types::{PerformanceEvent, UserId};

/// Rolling statistics over a learner's task attempts.
pub struct PerformanceAnalyzer {
    store: Arc<dyn LearnerStore>,
    config: PerformanceConfig,
}

impl PerformanceAnalyzer {
    pub fn new(store: Arc<dyn LearnerStore>, config: PerformanceConfig) -> Self {
        Self { store, config }
    }

    /// Append a task attempt.
    #[instrument(skip(self, event), fields(mentor.user_id = %user_id, mentor.topic = %event.topic))]
    pub async fn log_task(&self, user_id: &UserId, event: &PerformanceEvent) -> Result<()> {
        self.store.log_performance_event(user_id, event).await?;
        debug!(success = event.success, difficulty = %event.difficulty, "task logged");
        Ok(())
    }

    /// Summary stats over the trailing `days`, optionally for one topic.
    ///
    /// A window without events yields [`PerformanceStats::empty`].
    pub async fn get_stats(
        &self,
        user_id: &UserId,
        topic: Option<&str>,
        days: u32,
    ) -> Result<PerformanceStats> {
        let events = self.events(user_id, topic, days).await?;
        Ok(PerformanceStats::from_events(
            &events,
            self.config.fluctuation_window,
        ))
    }

    /// Compare success rates of the older and newer half of the window.
    #[instrument(skip(self), fields(mentor.user_id = %user_id))]
    pub async fn calculate_trend(
        &self,
        user_id: &UserId,
        topic: Option<&str>,
        days: u32,
    ) -> Result<TrendReport> {
        let events = self.events(user_id, topic, days).await?;
        let report = TrendReport::from_events(
            &events,
            self.config.trend_min_events,
            self.config.trend_threshold,
        );
        debug!(
            direction = %report.direction,
            change = report.change,
            events = report.event_count,
            "trend calculated"
        );
        Ok(report)
    }

    /// Fluctuation score (0-10) across all topics.
    pub async fn calculate_fluctuation(&self, user_id: &UserId, days: u32) -> Result<u8> {
        let events = self.events(user_id, None, days).await?;
        Ok(fluctuation_score(&events, self.config.fluctuation_window))
    }

    /// Motivation (1-10) across all topics.
    #[instrument(skip(self), fields(mentor.user_id = %user_id))]
    pub async fn estimate_motivation(
        &self,
        user_id: &UserId,
        days: u32,
    ) -> Result<MotivationEstimate> {
        let stats = self.get_stats(user_id, None, days).await?;
        let estimate = MotivationEstimate::from_stats(&stats, days);
        debug!(
            level = estimate.level,
            factors = estimate.factors.len(),
            "motivation estimated"
        );
        Ok(estimate)
    }

    /// Study recommendations from stats, trend and motivation over `days`.
    pub async fn generate_recommendations(
        &self,
        user_id: &UserId,
        days: u32,
    ) -> Result<Vec<Recommendation>> {
        let events = self.events(user_id, None, days).await?;
        let stats = PerformanceStats::from_events(&events, self.config.fluctuation_window);
        let trend = TrendReport::from_events(
            &events,
            self.config.trend_min_events,
            self.config.trend_threshold,
        );
        let motivation = MotivationEstimate::from_stats(&stats, days);

        Ok(recommend(&RecommendationInputs {
            stats: &stats,
            trend: &trend,
            motivation: &motivation,
            days,
        }))
    }

    /// Newest `limit` task attempts, newest first.
    pub async fn recent_events(
        &self,
        user_id: &UserId,
        topic: Option<&str>,
        days: u32,
        limit: usize,
    ) -> Result<Vec<PerformanceEvent>> {
        let query = PerformanceQuery::last_days(days)
            .for_topic(topic)
            .with_limit(limit);
        let mut events = self.store.query_performance_events(user_id, &query).await?;
        events.reverse();
        Ok(events)
    }

    /// Chronological task attempts in the window.
    pub async fn events(
        &self,
        user_id: &UserId,
        topic: Option<&str>,
        days: u32,
    ) -> Result<Vec<PerformanceEvent>> {
        let query = PerformanceQuery::last_days(days).for_topic(topic);
        self.store.query_performance_events(user_id, &query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::performance::{MotivationFactor, TrendDirection};
    use crate::store::InMemoryLearnerStore;
    use crate::types::{Difficulty, TaskOutcome};
    use chrono::{Duration, Utc};

    fn user() -> UserId {
        UserId::from("learner-1")
    }

    async fn analyzer_with(outcomes: &[bool]) -> (Arc<InMemoryLearnerStore>, PerformanceAnalyzer) {
        let store = Arc::new(InMemoryLearnerStore::new());
        let analyzer = PerformanceAnalyzer::new(store.clone(), PerformanceConfig::default());
        let start = Utc::now() - Duration::hours(2);
        for (i, success) in outcomes.iter().enumerate() {
            let event = PerformanceEvent::from_outcome_at(
                "algebra",
                &TaskOutcome::new(*success, 45.0).with_difficulty(Difficulty::Medium),
                start + Duration::minutes(i as i64),
            );
            analyzer.log_task(&user(), &event).await.unwrap();
        }
        (store, analyzer)
    }

    #[tokio::test]
    async fn test_log_task_appends() {
        let (store, _) = analyzer_with(&[true, false]).await;
        assert_eq!(store.performance_len(&user()), 2);
    }

    #[tokio::test]
    async fn test_stats_without_events() {
        let (_, analyzer) = analyzer_with(&[]).await;
        let stats = analyzer.get_stats(&user(), None, 30).await.unwrap();
        assert_eq!(stats, PerformanceStats::empty());
    }

    #[tokio::test]
    async fn test_stats_filter_by_topic() {
        let (_, analyzer) = analyzer_with(&[true, true, false]).await;
        let algebra = analyzer.get_stats(&user(), Some("algebra"), 30).await.unwrap();
        assert_eq!(algebra.tasks_completed, 3);

        let geometry = analyzer.get_stats(&user(), Some("geometry"), 30).await.unwrap();
        assert!(geometry.is_empty());
    }

    #[tokio::test]
    async fn test_trend_improving() {
        let (_, analyzer) = analyzer_with(&[
            true, false, true, false, false, true, true, true, true, false,
        ])
        .await;
        let report = analyzer.calculate_trend(&user(), None, 14).await.unwrap();
        assert_eq!(report.direction, TrendDirection::Improving);
    }

    #[tokio::test]
    async fn test_trend_insufficient() {
        let (_, analyzer) = analyzer_with(&[true, true, true, true]).await;
        let report = analyzer.calculate_trend(&user(), None, 14).await.unwrap();
        assert_eq!(report.direction, TrendDirection::InsufficientData);
    }

    #[tokio::test]
    async fn test_fluctuation_bounds() {
        let (_, analyzer) = analyzer_with(&[true, false, true, false, true, false]).await;
        let score = analyzer.calculate_fluctuation(&user(), 7).await.unwrap();
        assert!(score <= 10);

        let (_, empty) = analyzer_with(&[]).await;
        assert_eq!(empty.calculate_fluctuation(&user(), 7).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_motivation_neutral_without_events() {
        let (_, analyzer) = analyzer_with(&[]).await;
        let estimate = analyzer.estimate_motivation(&user(), 7).await.unwrap();
        assert_eq!(estimate, MotivationEstimate::neutral());
    }

    #[tokio::test]
    async fn test_motivation_rewards_success() {
        let (_, analyzer) = analyzer_with(&[true; 24]).await;
        let estimate = analyzer.estimate_motivation(&user(), 7).await.unwrap();
        assert!(estimate.factors.contains(&MotivationFactor::HighSuccessRate));
        assert!(estimate.factors.contains(&MotivationFactor::HighActivity));
        assert!((1..=10).contains(&estimate.level));
    }

    #[tokio::test]
    async fn test_recent_events_newest_first() {
        let (_, analyzer) = analyzer_with(&[true, false, true]).await;
        let recent = analyzer.recent_events(&user(), Some("algebra"), 30, 2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert!(recent[0].timestamp > recent[1].timestamp);
        assert!(recent[0].success);
    }

    #[tokio::test]
    async fn test_storage_failure_propagates() {
        let (store, analyzer) = analyzer_with(&[true]).await;
        store.set_unavailable(true);
        assert!(analyzer.get_stats(&user(), None, 30).await.is_err());
        assert!(analyzer.generate_recommendations(&user(), 14).await.is_err());
    }
}
