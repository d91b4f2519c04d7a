//! Fan-out/fan-in composition of the three analytics components.

use std::sync::Arc;

use tracing::{debug, instrument, warn};

use super::insights::{focus_areas_from, insights_from};
use super::types::{
    ContextSummary, FocusArea, Insight, LearningProgress, OverallStatus, TopicAnalysis,
    TopicContext, UserContext, next_step,
};
use crate::behavior::{BehaviorMonitor, DEFAULT_PATTERN_DAYS, DEFAULT_PROBLEM_DAYS};
use crate::competency::CompetencyModel;
use crate::error::Result;
use crate::performance::{
    DEFAULT_MOTIVATION_DAYS, DEFAULT_RECOMMENDATION_DAYS, DEFAULT_STATS_DAYS, DEFAULT_TREND_DAYS,
    PerformanceAnalyzer, split_rates,
};
use crate::types::{DEFAULT_LEVEL, UserId};

/// Events shown in a topic context.
const RECENT_HISTORY_LIMIT: usize = 10;

/// Events needed before progress reports an improvement.
const MIN_PROGRESS_EVENTS: usize = 4;

/// Builds learner snapshots for the prompt layer.
///
/// The `try_*` operations surface storage failures; the others are total and
/// fall back to documented defaults.
pub struct ContextAggregator {
    competency: Arc<CompetencyModel>,
    performance: Arc<PerformanceAnalyzer>,
    behavior: Arc<BehaviorMonitor>,
}

impl ContextAggregator {
    pub fn new(
        competency: Arc<CompetencyModel>,
        performance: Arc<PerformanceAnalyzer>,
        behavior: Arc<BehaviorMonitor>,
    ) -> Self {
        Self {
            competency,
            performance,
            behavior,
        }
    }

    /// Learner snapshot, or [`UserContext::fallback`] on any failure.
    pub async fn get_user_context(
        &self,
        user_id: &UserId,
        current_topic: Option<&str>,
    ) -> UserContext {
        match self.try_user_context(user_id, current_topic).await {
            Ok(context) => context,
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "user context unavailable, using default");
                UserContext::fallback(user_id, current_topic)
            }
        }
    }

    /// Learner snapshot with all reads issued concurrently.
    #[instrument(skip(self), fields(mentor.user_id = %user_id))]
    pub async fn try_user_context(
        &self,
        user_id: &UserId,
        current_topic: Option<&str>,
    ) -> Result<UserContext> {
        let (competencies, performance, behavior, weak_areas, strong_areas, motivation, trend) = tokio::try_join!(
            self.competency.get_competencies(user_id),
            self.performance
                .get_stats(user_id, current_topic, DEFAULT_STATS_DAYS),
            self.behavior
                .get_behavior_patterns(user_id, DEFAULT_PATTERN_DAYS),
            self.competency.get_weak_areas(user_id),
            self.competency.get_strong_areas(user_id),
            self.performance
                .estimate_motivation(user_id, DEFAULT_MOTIVATION_DAYS),
            self.performance
                .calculate_trend(user_id, current_topic, DEFAULT_TREND_DAYS),
        )?;

        let overall_status =
            OverallStatus::classify(performance.success_rate, motivation.level, trend.direction);
        let summary = ContextSummary {
            overall_status,
            topics_practiced: competencies.len(),
            weak_topic_count: weak_areas.topics.len(),
            strong_topic_count: strong_areas.topics.len(),
        };
        debug!(status = overall_status.as_str(), "user context built");

        Ok(UserContext {
            user_id: user_id.clone(),
            current_topic: current_topic.map(str::to_string),
            competencies,
            performance,
            behavior,
            weak_areas,
            strong_areas,
            motivation,
            trend,
            summary,
        })
    }

    /// Topic snapshot, or [`TopicContext::fallback`] on any failure.
    pub async fn get_topic_context(&self, user_id: &UserId, topic: &str) -> TopicContext {
        match self.try_topic_context(user_id, topic).await {
            Ok(context) => context,
            Err(e) => {
                warn!(user_id = %user_id, topic, error = %e, "topic context unavailable, using default");
                TopicContext::fallback(topic)
            }
        }
    }

    /// Topic snapshot: competency, 30-day stats, the latest attempts and a
    /// suggested next step.
    #[instrument(skip(self), fields(mentor.user_id = %user_id, mentor.topic = topic))]
    pub async fn try_topic_context(&self, user_id: &UserId, topic: &str) -> Result<TopicContext> {
        let (competency, performance, recent_history, trend) = tokio::try_join!(
            self.competency.get_competency(user_id, topic),
            self.performance
                .get_stats(user_id, Some(topic), DEFAULT_STATS_DAYS),
            self.performance.recent_events(
                user_id,
                Some(topic),
                DEFAULT_STATS_DAYS,
                RECENT_HISTORY_LIMIT
            ),
            self.performance
                .calculate_trend(user_id, Some(topic), DEFAULT_TREND_DAYS),
        )?;

        let level = competency
            .as_ref()
            .map_or(DEFAULT_LEVEL, |r| r.overall_level);
        let analysis = TopicAnalysis {
            level,
            trend: trend.direction,
            next_step: next_step(topic, level, trend.direction),
        };

        Ok(TopicContext {
            topic: topic.to_string(),
            competency,
            performance,
            recent_history,
            analysis,
        })
    }

    /// Ordered focus areas, at most one per category. Empty on failure.
    pub async fn identify_focus_areas(&self, user_id: &UserId) -> Vec<FocusArea> {
        match self.try_focus_areas(user_id).await {
            Ok(areas) => areas,
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "focus areas unavailable");
                Vec::new()
            }
        }
    }

    pub async fn try_focus_areas(&self, user_id: &UserId) -> Result<Vec<FocusArea>> {
        let (weak, motivation, problems, next) = tokio::try_join!(
            self.competency.get_weak_areas(user_id),
            self.performance
                .estimate_motivation(user_id, DEFAULT_MOTIVATION_DAYS),
            self.behavior
                .identify_problematic_patterns(user_id, DEFAULT_PROBLEM_DAYS),
            self.competency.recommend_next_practice(user_id),
        )?;

        Ok(focus_areas_from(&weak, &motivation, &problems, next.as_ref()))
    }

    /// Human-facing summaries of the learner snapshot.
    ///
    /// Derived from [`get_user_context`](Self::get_user_context), so a
    /// storage failure yields no insights rather than an error.
    pub async fn generate_insights(
        &self,
        user_id: &UserId,
        current_topic: Option<&str>,
    ) -> Vec<Insight> {
        let context = self.get_user_context(user_id, current_topic).await;
        insights_from(&context)
    }

    /// Progress over the trailing `days`, or [`LearningProgress::empty`] on
    /// any failure.
    pub async fn analyze_learning_progress(
        &self,
        user_id: &UserId,
        days: u32,
    ) -> LearningProgress {
        match self.try_learning_progress(user_id, days).await {
            Ok(progress) => progress,
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "learning progress unavailable, using default");
                LearningProgress::empty(days)
            }
        }
    }

    /// Progress over the trailing `days`.
    #[instrument(skip(self), fields(mentor.user_id = %user_id, mentor.window_days = days))]
    pub async fn try_learning_progress(
        &self,
        user_id: &UserId,
        days: u32,
    ) -> Result<LearningProgress> {
        let (competencies, events, weak, strong, performance_recs, behavior_recs) = tokio::try_join!(
            self.competency.get_competencies(user_id),
            self.performance.events(user_id, None, days),
            self.competency.get_weak_areas(user_id),
            self.competency.get_strong_areas(user_id),
            self.performance
                .generate_recommendations(user_id, DEFAULT_RECOMMENDATION_DAYS),
            self.behavior
                .get_behavior_recommendations(user_id, DEFAULT_PROBLEM_DAYS),
        )?;

        let overall_level = if competencies.is_empty() {
            0.0
        } else {
            competencies
                .values()
                .map(|r| f64::from(r.overall_level))
                .sum::<f64>()
                / competencies.len() as f64
        };

        let improvement = if events.len() < MIN_PROGRESS_EVENTS {
            0.0
        } else {
            let (first, second) = split_rates(&events);
            second - first
        };

        let mut recommendations = performance_recs;
        recommendations.extend(behavior_recs);

        Ok(LearningProgress {
            period_days: days,
            overall_level,
            improvement,
            strengths: strong.topic_names(),
            weaknesses: weak.topic_names(),
            recommendations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalyticsConfig;
    use crate::context::FocusCategory;
    use crate::store::{InMemoryLearnerStore, LearnerStore};
    use crate::types::{CompetencyRecord, PerformanceEvent, TaskOutcome};
    use chrono::{Duration, Utc};

    fn user() -> UserId {
        UserId::from("learner-1")
    }

    fn setup() -> (Arc<InMemoryLearnerStore>, ContextAggregator) {
        let store = Arc::new(InMemoryLearnerStore::new());
        let config = AnalyticsConfig::default();
        let aggregator = ContextAggregator::new(
            Arc::new(CompetencyModel::new(store.clone(), config.competency)),
            Arc::new(PerformanceAnalyzer::new(store.clone(), config.performance)),
            Arc::new(BehaviorMonitor::new(store.clone(), config.behavior)),
        );
        (store, aggregator)
    }

    async fn log_tasks(store: &InMemoryLearnerStore, topic: &str, outcomes: &[bool]) {
        let start = Utc::now() - Duration::hours(3);
        for (i, success) in outcomes.iter().enumerate() {
            let event = PerformanceEvent::from_outcome_at(
                topic,
                &TaskOutcome::new(*success, 40.0),
                start + Duration::minutes(i as i64),
            );
            store.log_performance_event(&user(), &event).await.unwrap();
        }
    }

    async fn seed_level(store: &InMemoryLearnerStore, topic: &str, level: u8) {
        let mut record = CompetencyRecord::new(Utc::now());
        record.overall_level = level;
        store.put_competency(&user(), topic, &record).await.unwrap();
    }

    #[tokio::test]
    async fn test_context_for_new_learner() {
        let (_, aggregator) = setup();
        let ctx = aggregator.try_user_context(&user(), None).await.unwrap();

        assert!(ctx.competencies.is_empty());
        assert_eq!(ctx.motivation.level, 5);
        // zero success rate counts as needing attention
        assert_eq!(ctx.status(), OverallStatus::NeedsAttention);
    }

    #[tokio::test]
    async fn test_context_is_idempotent() {
        let (store, aggregator) = setup();
        log_tasks(&store, "algebra", &[true, false, true, true, true, true]).await;
        seed_level(&store, "algebra", 4).await;

        let first = aggregator.get_user_context(&user(), Some("algebra")).await;
        let second = aggregator.get_user_context(&user(), Some("algebra")).await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_excellent_status() {
        let (store, aggregator) = setup();
        // 20 tasks in 3 hours: first half 60%, second half 100%
        let mut outcomes = vec![true, true, true, false, false, true, true, true, false, false];
        outcomes.extend([true; 10]);
        log_tasks(&store, "algebra", &outcomes).await;

        let ctx = aggregator.try_user_context(&user(), Some("algebra")).await.unwrap();
        assert_eq!(ctx.performance.success_rate, 80.0);
        assert!(ctx.motivation.level >= 7);
        assert_eq!(ctx.status(), OverallStatus::Excellent);
    }

    #[tokio::test]
    async fn test_outage_returns_default_context() {
        let (store, aggregator) = setup();
        store.set_unavailable(true);

        assert!(aggregator.try_user_context(&user(), None).await.is_err());
        let ctx = aggregator.get_user_context(&user(), Some("algebra")).await;
        assert_eq!(ctx.status(), OverallStatus::Unknown);
        assert_eq!(ctx.motivation.level, 5);

        let topic = aggregator.get_topic_context(&user(), "algebra").await;
        assert_eq!(topic, TopicContext::fallback("algebra"));
        assert!(aggregator.identify_focus_areas(&user()).await.is_empty());
        assert!(aggregator.generate_insights(&user(), None).await.is_empty());

        assert!(aggregator.try_learning_progress(&user(), 30).await.is_err());
        let progress = aggregator.analyze_learning_progress(&user(), 30).await;
        assert_eq!(progress, LearningProgress::empty(30));
        assert!(progress.recommendations.is_empty());
    }

    #[tokio::test]
    async fn test_topic_context() {
        let (store, aggregator) = setup();
        let outcomes: Vec<bool> = (0..12).map(|i| i % 3 != 0).collect();
        log_tasks(&store, "geometry", &outcomes).await;
        log_tasks(&store, "algebra", &[true]).await;
        seed_level(&store, "geometry", 2).await;

        let ctx = aggregator.try_topic_context(&user(), "geometry").await.unwrap();
        assert_eq!(ctx.performance.tasks_completed, 12);
        assert_eq!(ctx.recent_history.len(), 10);
        assert!(ctx.recent_history[0].timestamp > ctx.recent_history[9].timestamp);
        assert!(ctx.recent_history.iter().all(|e| e.topic == "geometry"));
        assert_eq!(ctx.analysis.level, 2);
    }

    #[tokio::test]
    async fn test_focus_areas_for_weak_topic() {
        let (store, aggregator) = setup();
        seed_level(&store, "geometry", 1).await;
        seed_level(&store, "algebra", 4).await;

        let areas = aggregator.identify_focus_areas(&user()).await;
        assert_eq!(areas[0].category, FocusCategory::CriticalWeakness);
        assert_eq!(areas[0].topic.as_deref(), Some("geometry"));
        assert_eq!(areas.last().unwrap().topic.as_deref(), Some("geometry"));
    }

    #[tokio::test]
    async fn test_learning_progress() {
        let (store, aggregator) = setup();
        seed_level(&store, "algebra", 5).await;
        seed_level(&store, "geometry", 2).await;
        log_tasks(&store, "algebra", &[false, false, true, true]).await;

        let progress = aggregator.try_learning_progress(&user(), 30).await.unwrap();
        assert_eq!(progress.overall_level, 3.5);
        assert_eq!(progress.improvement, 100.0);
        assert_eq!(progress.strengths, vec!["algebra"]);
        assert_eq!(progress.weaknesses, vec!["geometry"]);
    }

    #[tokio::test]
    async fn test_learning_progress_without_data() {
        let (_, aggregator) = setup();
        let progress = aggregator.analyze_learning_progress(&user(), 30).await;
        assert_eq!(progress.overall_level, 0.0);
        assert_eq!(progress.improvement, 0.0);
    }
}
