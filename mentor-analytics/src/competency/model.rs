//! Per-topic mastery state and its update rules.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::locks::KeyedLocks;
use super::scoring::{level_score, running_mean, score_to_level, step_towards, sub_topic_delta};
use crate::config::CompetencyConfig;
use crate::error::Result;
use crate::store::LearnerStore;
use crate::types::{
    CompetencyEvent, CompetencyRecord, Difficulty, HistoryEntry, TaskOutcome, UserId, clamp_level,
};

/// Deltas up to this magnitude are relative; larger values are absolute targets.
const RELATIVE_DELTA_LIMIT: f64 = 1.0;

/// A topic at or below a threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicArea {
    pub topic: String,
    pub level: u8,
}

/// A sub-topic at or below a threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubTopicArea {
    pub topic: String,
    pub sub_topic: String,
    pub level: f64,
}

/// Weak or strong areas at both granularities.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AreaReport {
    pub topics: Vec<TopicArea>,
    pub sub_topics: Vec<SubTopicArea>,
}

impl AreaReport {
    pub fn is_empty(&self) -> bool {
        self.topics.is_empty() && self.sub_topics.is_empty()
    }

    /// Topic names in report order.
    pub fn topic_names(&self) -> Vec<String> {
        self.topics.iter().map(|a| a.topic.clone()).collect()
    }
}

/// Why a practice topic was picked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PracticeReason {
    /// Lowest-level topic still below mastery.
    Weakness,
    /// Everything is mastered; keep a random topic fresh.
    Maintenance,
}

/// What to practice next.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PracticeRecommendation {
    pub topic: String,
    pub sub_topic: Option<String>,
    /// Current level of the topic (default level if never practiced).
    pub current_level: u8,
    pub suggested_difficulty: Difficulty,
    pub reason: PracticeReason,
}

/// Competency model backed by a [`LearnerStore`].
///
/// All read-modify-write sequences for one `(user, topic)` pair run under a
/// keyed async lock, so concurrent writers in one process never drop updates.
pub struct CompetencyModel {
    store: Arc<dyn LearnerStore>,
    config: CompetencyConfig,
    locks: KeyedLocks<(UserId, String)>,
}

impl CompetencyModel {
    pub fn new(store: Arc<dyn LearnerStore>, config: CompetencyConfig) -> Self {
        Self {
            store,
            config,
            locks: KeyedLocks::new(),
        }
    }

    pub fn config(&self) -> &CompetencyConfig {
        &self.config
    }

    /// Read one competency record.
    pub async fn get_competency(
        &self,
        user_id: &UserId,
        topic: &str,
    ) -> Result<Option<CompetencyRecord>> {
        self.store.get_competency(user_id, topic).await
    }

    /// Read every competency record of a learner, ordered by topic.
    pub async fn get_competencies(
        &self,
        user_id: &UserId,
    ) -> Result<BTreeMap<String, CompetencyRecord>> {
        self.store.get_competencies(user_id).await
    }

    /// Fold a completed task into the topic record.
    ///
    /// Recomputes the running success rate and average time, moves the
    /// overall level at most one step towards the scored level, and applies
    /// the outcome's sub-topic adjustment in the same write.
    #[instrument(skip(self, outcome), fields(mentor.user_id = %user_id, mentor.topic = topic))]
    pub async fn update_after_task(
        &self,
        user_id: &UserId,
        topic: &str,
        outcome: &TaskOutcome,
    ) -> Result<CompetencyRecord> {
        let _guard = self.locks.acquire(&(user_id.clone(), topic.to_string())).await;
        let now = Utc::now();
        let mut record = self
            .store
            .get_competency(user_id, topic)
            .await?
            .unwrap_or_else(|| CompetencyRecord::new(now));

        let count = record.tasks_completed.saturating_add(1);
        if outcome.success {
            record.successful_tasks = record.successful_tasks.saturating_add(1);
        }
        record.tasks_completed = count;
        record.success_rate =
            (f64::from(record.successful_tasks) / f64::from(count) * 100.0).clamp(0.0, 100.0);
        record.average_time = running_mean(record.average_time, outcome.seconds_spent(), count);

        let score = level_score(record.success_rate, count, outcome.success);
        let previous = record.overall_level;
        record.overall_level = step_towards(previous, score_to_level(score));
        record.last_practiced = now;

        if let Some(sub_topic) = &outcome.sub_topic {
            let delta = sub_topic_delta(outcome);
            if delta.abs() >= self.config.min_sub_topic_change {
                apply_sub_topic_change(&mut record, sub_topic, delta);
            }
        }

        record.push_history(
            HistoryEntry {
                timestamp: now,
                level: record.overall_level,
                event: CompetencyEvent::TaskCompleted {
                    success: outcome.success,
                    difficulty: outcome.difficulty,
                },
            },
            self.config.history_limit,
        );

        self.store.put_competency(user_id, topic, &record).await?;

        debug!(
            previous,
            level = record.overall_level,
            score,
            success_rate = record.success_rate,
            "competency updated after task"
        );
        Ok(record)
    }

    /// Change a sub-topic level.
    ///
    /// A `delta` with magnitude up to 1 is added to the current level; a
    /// larger value is taken as the absolute target. The result is clamped
    /// to 1-5.
    #[instrument(skip(self), fields(mentor.user_id = %user_id, mentor.topic = topic))]
    pub async fn update_sub_topic(
        &self,
        user_id: &UserId,
        topic: &str,
        sub_topic: &str,
        delta: f64,
    ) -> Result<CompetencyRecord> {
        let _guard = self.locks.acquire(&(user_id.clone(), topic.to_string())).await;
        let now = Utc::now();
        let mut record = self
            .store
            .get_competency(user_id, topic)
            .await?
            .unwrap_or_else(|| CompetencyRecord::new(now));

        let (from, to) = apply_sub_topic_change(&mut record, sub_topic, delta);
        record.push_history(
            HistoryEntry {
                timestamp: now,
                level: record.overall_level,
                event: CompetencyEvent::SubTopicAdjusted {
                    sub_topic: sub_topic.to_string(),
                    from,
                    to,
                },
            },
            self.config.history_limit,
        );

        self.store.put_competency(user_id, topic, &record).await?;
        debug!(sub_topic, from, to, "sub-topic level changed");
        Ok(record)
    }

    /// Nudge a sub-topic from a task outcome.
    ///
    /// Returns the applied delta, or `None` when the change is too small to
    /// record (nothing is written then).
    pub async fn adjust_sub_topic_from_performance(
        &self,
        user_id: &UserId,
        topic: &str,
        sub_topic: &str,
        outcome: &TaskOutcome,
    ) -> Result<Option<f64>> {
        let delta = sub_topic_delta(outcome);
        if delta.abs() < self.config.min_sub_topic_change {
            debug!(sub_topic, delta, "sub-topic change suppressed");
            return Ok(None);
        }

        self.update_sub_topic(user_id, topic, sub_topic, delta).await?;
        Ok(Some(delta))
    }

    /// Areas below the configured weak threshold.
    pub async fn get_weak_areas(&self, user_id: &UserId) -> Result<AreaReport> {
        self.weak_areas_below(user_id, self.config.weak_threshold).await
    }

    /// Areas at or above the configured strong threshold.
    pub async fn get_strong_areas(&self, user_id: &UserId) -> Result<AreaReport> {
        self.strong_areas_from(user_id, self.config.strong_threshold).await
    }

    /// Topics and sub-topics with a level strictly below `threshold`,
    /// weakest first.
    pub async fn weak_areas_below(&self, user_id: &UserId, threshold: u8) -> Result<AreaReport> {
        let records = self.store.get_competencies(user_id).await?;
        let limit = f64::from(threshold);
        let mut report = collect_areas(
            &records,
            |level| level < threshold,
            |level| level < limit,
        );

        report.topics.sort_by_key(|a| a.level);
        report
            .sub_topics
            .sort_by(|a, b| a.level.total_cmp(&b.level));
        Ok(report)
    }

    /// Topics and sub-topics with a level at or above `threshold`,
    /// strongest first.
    pub async fn strong_areas_from(&self, user_id: &UserId, threshold: u8) -> Result<AreaReport> {
        let records = self.store.get_competencies(user_id).await?;
        let limit = f64::from(threshold);
        let mut report = collect_areas(
            &records,
            |level| level >= threshold,
            |level| level >= limit,
        );

        report.topics.sort_by(|a, b| b.level.cmp(&a.level));
        report
            .sub_topics
            .sort_by(|a, b| b.level.total_cmp(&a.level));
        Ok(report)
    }

    /// Pick the next topic to practice.
    ///
    /// Prefers the lowest-level topic below the strong threshold (first in
    /// topic order on ties) and its weakest sub-topic. When every practiced
    /// topic is mastered, a random catalog topic is suggested at hard
    /// difficulty. `None` only when the catalog is empty as well.
    #[instrument(skip(self), fields(mentor.user_id = %user_id))]
    pub async fn recommend_next_practice(
        &self,
        user_id: &UserId,
    ) -> Result<Option<PracticeRecommendation>> {
        let records = self.store.get_competencies(user_id).await?;

        let weakest = records
            .iter()
            .filter(|(_, r)| r.overall_level < self.config.strong_threshold)
            .fold(None, |best: Option<(&String, &CompetencyRecord)>, (topic, record)| {
                match best {
                    Some((_, b)) if b.overall_level <= record.overall_level => best,
                    _ => Some((topic, record)),
                }
            });

        if let Some((topic, record)) = weakest {
            let suggested_difficulty = if record.overall_level <= 2 {
                Difficulty::Easy
            } else {
                Difficulty::Medium
            };
            return Ok(Some(PracticeRecommendation {
                topic: topic.clone(),
                sub_topic: record.weakest_sub_topic().map(|(name, _)| name.to_string()),
                current_level: record.overall_level,
                suggested_difficulty,
                reason: PracticeReason::Weakness,
            }));
        }

        let Some(topic) = self.config.topic_catalog.choose(&mut rand::thread_rng()) else {
            return Ok(None);
        };
        let current_level = records
            .get(topic)
            .map_or(crate::types::DEFAULT_LEVEL, |r| r.overall_level);

        Ok(Some(PracticeRecommendation {
            topic: topic.clone(),
            sub_topic: None,
            current_level,
            suggested_difficulty: Difficulty::Hard,
            reason: PracticeReason::Maintenance,
        }))
    }
}

/// Apply a relative or absolute sub-topic change, returning `(from, to)`.
fn apply_sub_topic_change(record: &mut CompetencyRecord, sub_topic: &str, delta: f64) -> (f64, f64) {
    let from = record.sub_topic_level(sub_topic);
    let target = if delta.abs() <= RELATIVE_DELTA_LIMIT {
        from + delta
    } else {
        delta
    };
    let to = clamp_level(target);
    record.sub_topics.insert(sub_topic.to_string(), to);
    (from, to)
}

fn collect_areas(
    records: &BTreeMap<String, CompetencyRecord>,
    topic_matches: impl Fn(u8) -> bool,
    sub_topic_matches: impl Fn(f64) -> bool,
) -> AreaReport {
    let mut report = AreaReport::default();
    for (topic, record) in records {
        if topic_matches(record.overall_level) {
            report.topics.push(TopicArea {
                topic: topic.clone(),
                level: record.overall_level,
            });
        }
        for (sub_topic, level) in &record.sub_topics {
            if sub_topic_matches(*level) {
                report.sub_topics.push(SubTopicArea {
                    topic: topic.clone(),
                    sub_topic: sub_topic.clone(),
                    level: *level,
                });
            }
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryLearnerStore;

    fn setup() -> (Arc<InMemoryLearnerStore>, CompetencyModel) {
        let store = Arc::new(InMemoryLearnerStore::new());
        let model = CompetencyModel::new(store.clone(), CompetencyConfig::default());
        (store, model)
    }

    fn user() -> UserId {
        UserId::from("learner-1")
    }

    async fn seed(store: &InMemoryLearnerStore, topic: &str, level: u8, subs: &[(&str, f64)]) {
        let mut record = CompetencyRecord::new(Utc::now());
        record.overall_level = level;
        for (name, l) in subs {
            record.sub_topics.insert((*name).to_string(), *l);
        }
        store.put_competency(&user(), topic, &record).await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_competency_is_none() {
        let (_, model) = setup();
        assert!(model.get_competency(&user(), "algebra").await.unwrap().is_none());
        assert!(model.get_competencies(&user()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_first_success_creates_record() {
        let (_, model) = setup();
        let record = model
            .update_after_task(&user(), "algebra", &TaskOutcome::new(true, 40.0))
            .await
            .unwrap();

        assert_eq!(record.tasks_completed, 1);
        assert_eq!(record.successful_tasks, 1);
        assert_eq!(record.success_rate, 100.0);
        assert_eq!(record.average_time, 40.0);
        // score 0.6 + 0.01 + 0.2 = 0.81 -> 5, stepped to 4
        assert_eq!(record.overall_level, 4);
        assert_eq!(record.history.len(), 1);
    }

    #[tokio::test]
    async fn test_level_moves_one_step_per_update() {
        let (_, model) = setup();
        let mut previous = crate::types::DEFAULT_LEVEL;

        for i in 0..12 {
            let outcome = TaskOutcome::new(i % 4 == 0, 10.0);
            let record = model.update_after_task(&user(), "geometry", &outcome).await.unwrap();
            assert!((1..=5).contains(&record.overall_level));
            assert!(record.overall_level.abs_diff(previous) <= 1);
            previous = record.overall_level;
        }
    }

    #[tokio::test]
    async fn test_running_stats() {
        let (_, model) = setup();
        model
            .update_after_task(&user(), "algebra", &TaskOutcome::new(true, 10.0))
            .await
            .unwrap();
        let record = model
            .update_after_task(&user(), "algebra", &TaskOutcome::new(false, 30.0))
            .await
            .unwrap();

        assert_eq!(record.success_rate, 50.0);
        assert_eq!(record.average_time, 20.0);
    }

    #[tokio::test]
    async fn test_negative_time_does_not_lower_average() {
        let (_, model) = setup();
        let outcome: TaskOutcome =
            serde_json::from_str(r#"{"success": true, "time_spent": -30.0}"#).unwrap();

        let record = model.update_after_task(&user(), "algebra", &outcome).await.unwrap();
        assert_eq!(record.average_time, 0.0);

        let record = model
            .update_after_task(&user(), "algebra", &TaskOutcome::new(true, 40.0))
            .await
            .unwrap();
        assert_eq!(record.average_time, 20.0);
    }

    #[tokio::test]
    async fn test_history_keeps_newest_fifty() {
        let (_, model) = setup();
        for i in 1..=55 {
            let outcome = match i {
                1..=5 => TaskOutcome::new(false, 30.0).with_difficulty(Difficulty::Easy),
                6 => TaskOutcome::new(true, 30.0).with_difficulty(Difficulty::Hard),
                _ => TaskOutcome::new(true, 30.0),
            };
            model.update_after_task(&user(), "algebra", &outcome).await.unwrap();
        }

        let record = model.get_competency(&user(), "algebra").await.unwrap().unwrap();
        assert_eq!(record.tasks_completed, 55);
        assert_eq!(record.history.len(), 50);
        assert_eq!(
            record.history.front().map(|e| &e.event),
            Some(&CompetencyEvent::TaskCompleted {
                success: true,
                difficulty: Difficulty::Hard,
            })
        );
        assert!(!record.history.iter().any(|e| matches!(
            e.event,
            CompetencyEvent::TaskCompleted {
                difficulty: Difficulty::Easy,
                ..
            }
        )));
    }

    #[tokio::test]
    async fn test_task_with_sub_topic_adjusts_it() {
        let (_, model) = setup();
        let outcome = TaskOutcome::new(true, 60.0)
            .with_difficulty(Difficulty::Hard)
            .with_sub_topic("factoring");

        let record = model.update_after_task(&user(), "algebra", &outcome).await.unwrap();
        assert_eq!(record.sub_topic_level("factoring"), 4.0);
        assert_eq!(record.history.len(), 1);
    }

    #[tokio::test]
    async fn test_hard_success_raises_sub_topic_by_one() {
        let (_, model) = setup();
        let outcome = TaskOutcome::new(true, 60.0).with_difficulty(Difficulty::Hard);

        let delta = model
            .adjust_sub_topic_from_performance(&user(), "algebra", "factoring", &outcome)
            .await
            .unwrap();
        assert_eq!(delta, Some(1.0));

        let record = model.get_competency(&user(), "algebra").await.unwrap().unwrap();
        assert_eq!(record.sub_topic_level("factoring"), 4.0);
    }

    #[tokio::test]
    async fn test_small_delta_is_suppressed() {
        let (store, model) = setup();
        // easy success with many hints: 0.25 / 2 = 0.125
        let outcome = TaskOutcome::new(true, 60.0)
            .with_difficulty(Difficulty::Easy)
            .with_hints(4);

        let delta = model
            .adjust_sub_topic_from_performance(&user(), "algebra", "factoring", &outcome)
            .await
            .unwrap();
        assert_eq!(delta, None);
        assert!(store.get_competency(&user(), "algebra").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_sub_topic_relative_and_absolute() {
        let (_, model) = setup();

        let record = model.update_sub_topic(&user(), "calculus", "limits", -0.5).await.unwrap();
        assert_eq!(record.sub_topic_level("limits"), 2.5);

        let record = model.update_sub_topic(&user(), "calculus", "limits", 4.5).await.unwrap();
        assert_eq!(record.sub_topic_level("limits"), 4.5);

        let record = model.update_sub_topic(&user(), "calculus", "limits", 9.0).await.unwrap();
        assert_eq!(record.sub_topic_level("limits"), 5.0);

        let record = model.update_sub_topic(&user(), "calculus", "limits", -1.0).await.unwrap();
        assert_eq!(record.sub_topic_level("limits"), 4.0);
        assert_eq!(record.history.len(), 4);
    }

    #[tokio::test]
    async fn test_weak_and_strong_areas() {
        let (store, model) = setup();
        seed(&store, "algebra", 2, &[("factoring", 1.5), ("equations", 4.5)]).await;
        seed(&store, "geometry", 1, &[]).await;
        seed(&store, "calculus", 5, &[("limits", 2.0)]).await;
        seed(&store, "statistics", 3, &[]).await;

        let weak = model.get_weak_areas(&user()).await.unwrap();
        assert_eq!(weak.topic_names(), vec!["geometry", "algebra"]);
        let weak_subs: Vec<_> = weak.sub_topics.iter().map(|a| a.sub_topic.as_str()).collect();
        assert_eq!(weak_subs, vec!["factoring", "limits"]);

        let strong = model.get_strong_areas(&user()).await.unwrap();
        assert_eq!(strong.topic_names(), vec!["calculus"]);
        assert_eq!(strong.sub_topics.len(), 1);
        assert_eq!(strong.sub_topics[0].sub_topic, "equations");
    }

    #[tokio::test]
    async fn test_recommend_lowest_topic_and_weakest_sub_topic() {
        let (store, model) = setup();
        seed(&store, "algebra", 2, &[("factoring", 2.5), ("equations", 1.5)]).await;
        seed(&store, "geometry", 2, &[]).await;
        seed(&store, "calculus", 3, &[]).await;

        let rec = model.recommend_next_practice(&user()).await.unwrap().unwrap();
        assert_eq!(rec.topic, "algebra");
        assert_eq!(rec.sub_topic.as_deref(), Some("equations"));
        assert_eq!(rec.suggested_difficulty, Difficulty::Easy);
        assert_eq!(rec.reason, PracticeReason::Weakness);
    }

    #[tokio::test]
    async fn test_recommend_medium_at_level_three() {
        let (store, model) = setup();
        seed(&store, "calculus", 3, &[]).await;
        seed(&store, "algebra", 4, &[]).await;

        let rec = model.recommend_next_practice(&user()).await.unwrap().unwrap();
        assert_eq!(rec.topic, "calculus");
        assert_eq!(rec.suggested_difficulty, Difficulty::Medium);
    }

    #[tokio::test]
    async fn test_recommend_maintenance_when_all_mastered() {
        let (store, model) = setup();
        seed(&store, "algebra", 5, &[]).await;

        let rec = model.recommend_next_practice(&user()).await.unwrap().unwrap();
        assert_eq!(rec.reason, PracticeReason::Maintenance);
        assert_eq!(rec.suggested_difficulty, Difficulty::Hard);
        assert!(model.config().topic_catalog.contains(&rec.topic));
    }

    #[tokio::test]
    async fn test_recommend_none_with_empty_catalog() {
        let store = Arc::new(InMemoryLearnerStore::new());
        let config = CompetencyConfig {
            topic_catalog: Vec::new(),
            ..CompetencyConfig::default()
        };
        let model = CompetencyModel::new(store, config);
        assert!(model.recommend_next_practice(&user()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_concurrent_updates_are_not_lost() {
        let (_, model) = setup();
        let model = Arc::new(model);

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let model = Arc::clone(&model);
                tokio::spawn(async move {
                    model
                        .update_after_task(&user(), "algebra", &TaskOutcome::new(true, 5.0))
                        .await
                        .unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        let record = model.get_competency(&user(), "algebra").await.unwrap().unwrap();
        assert_eq!(record.tasks_completed, 16);
    }

    #[tokio::test]
    async fn test_storage_failure_is_an_error() {
        let (store, model) = setup();
        store.set_unavailable(true);
        let err = model.get_competency(&user(), "algebra").await.unwrap_err();
        assert!(err.is_storage());
    }
}
