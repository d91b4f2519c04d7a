//! Competency records: per-topic mastery state.

use std::collections::{BTreeMap, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Difficulty;

/// Lowest competency level.
pub const MIN_LEVEL: u8 = 1;

/// Highest competency level.
pub const MAX_LEVEL: u8 = 5;

/// Level assigned to topics and sub-topics that have not been assessed yet.
pub const DEFAULT_LEVEL: u8 = 3;

/// Default number of history entries retained per record.
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// What caused a competency change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CompetencyEvent {
    /// A task for the topic was completed.
    TaskCompleted { success: bool, difficulty: Difficulty },
    /// A sub-topic level was changed.
    SubTopicAdjusted {
        sub_topic: String,
        from: f64,
        to: f64,
    },
}

/// One entry in a record's bounded change log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: DateTime<Utc>,
    /// Overall level after the change.
    pub level: u8,
    pub event: CompetencyEvent,
}

/// Mastery state for one learner and topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompetencyRecord {
    /// Integer level 1-5. Moves by at most one per task update.
    pub overall_level: u8,
    /// Sub-topic levels (1.0-5.0).
    #[serde(default)]
    pub sub_topics: BTreeMap<String, f64>,
    pub tasks_completed: u32,
    /// Running total of successful tasks.
    #[serde(default)]
    pub successful_tasks: u32,
    /// Percentage of successful tasks (0-100).
    pub success_rate: f64,
    /// Mean seconds per task.
    pub average_time: f64,
    pub last_practiced: DateTime<Utc>,
    #[serde(default)]
    pub history: VecDeque<HistoryEntry>,
}

impl CompetencyRecord {
    /// Fresh, unassessed record.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            overall_level: DEFAULT_LEVEL,
            sub_topics: BTreeMap::new(),
            tasks_completed: 0,
            successful_tasks: 0,
            success_rate: 0.0,
            average_time: 0.0,
            last_practiced: now,
            history: VecDeque::new(),
        }
    }

    /// Level of a sub-topic, or the default level if it was never touched.
    pub fn sub_topic_level(&self, sub_topic: &str) -> f64 {
        self.sub_topics
            .get(sub_topic)
            .copied()
            .unwrap_or(f64::from(DEFAULT_LEVEL))
    }

    /// Sub-topic with the lowest level (first in name order on ties).
    pub fn weakest_sub_topic(&self) -> Option<(&str, f64)> {
        self.sub_topics
            .iter()
            .fold(None, |best: Option<(&str, f64)>, (name, level)| match best {
                Some((_, best_level)) if best_level <= *level => best,
                _ => Some((name.as_str(), *level)),
            })
    }

    /// Append to the change log, evicting the oldest entries past `limit`.
    pub fn push_history(&mut self, entry: HistoryEntry, limit: usize) {
        self.history.push_back(entry);
        while self.history.len() > limit.max(1) {
            self.history.pop_front();
        }
    }
}

/// Clamp a level into the valid 1-5 range.
pub fn clamp_level(level: f64) -> f64 {
    level.clamp(f64::from(MIN_LEVEL), f64::from(MAX_LEVEL))
}
