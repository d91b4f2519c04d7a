//! Task attempt types: difficulty, outcomes, and performance events.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{EventId, ParseEnumError};

/// Difficulty of a practice task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        }
    }
}

impl FromStr for Difficulty {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "easy" => Ok(Self::Easy),
            "medium" => Ok(Self::Medium),
            "hard" => Ok(Self::Hard),
            _ => Err(ParseEnumError::new("difficulty", s)),
        }
    }
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a single task attempt, as reported by the tutoring surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskOutcome {
    pub success: bool,
    /// Seconds spent on the task.
    pub time_spent: f64,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default)]
    pub hints_used: u32,
    #[serde(default)]
    pub showed_solution: bool,
    /// Sub-topic the task exercised, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_topic: Option<String>,
}

impl TaskOutcome {
    /// Unassisted outcome at medium difficulty.
    pub fn new(success: bool, time_spent: f64) -> Self {
        Self {
            success,
            time_spent: time_spent.max(0.0),
            difficulty: Difficulty::Medium,
            hints_used: 0,
            showed_solution: false,
            sub_topic: None,
        }
    }

    /// Seconds spent, never negative.
    pub fn seconds_spent(&self) -> f64 {
        self.time_spent.max(0.0)
    }

    #[must_use]
    pub fn with_difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = difficulty;
        self
    }

    #[must_use]
    pub fn with_hints(mut self, hints_used: u32) -> Self {
        self.hints_used = hints_used;
        self
    }

    #[must_use]
    pub fn with_solution_shown(mut self) -> Self {
        self.showed_solution = true;
        self
    }

    #[must_use]
    pub fn with_sub_topic(mut self, sub_topic: impl Into<String>) -> Self {
        self.sub_topic = Some(sub_topic.into());
        self
    }
}

/// Immutable record of one task attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceEvent {
    pub event_id: EventId,
    pub topic: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_topic: Option<String>,
    pub difficulty: Difficulty,
    pub success: bool,
    pub time_spent: f64,
    pub hints_used: u32,
    pub showed_solution: bool,
    pub timestamp: DateTime<Utc>,
}

impl PerformanceEvent {
    /// Record an outcome for a topic, stamped now.
    pub fn from_outcome(topic: impl Into<String>, outcome: &TaskOutcome) -> Self {
        Self::from_outcome_at(topic, outcome, Utc::now())
    }

    /// Record an outcome for a topic at an explicit time.
    pub fn from_outcome_at(
        topic: impl Into<String>,
        outcome: &TaskOutcome,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            event_id: EventId::new(),
            topic: topic.into(),
            sub_topic: outcome.sub_topic.clone(),
            difficulty: outcome.difficulty,
            success: outcome.success,
            time_spent: outcome.seconds_spent(),
            hints_used: outcome.hints_used,
            showed_solution: outcome.showed_solution,
            timestamp,
        }
    }
}
