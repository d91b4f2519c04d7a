//! Learner behavior events.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{EventId, ParseEnumError, SessionId};

/// Kind of help-seeking or avoidance behavior observed during a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BehaviorType {
    /// Learner asked to see the full solution.
    SolutionRequest,
    /// Learner asked for a hint.
    HintRequest,
    /// Learner left a task unfinished.
    TaskAbandon,
    /// Learner revealed the solution shortly after the task was shown.
    QuickSolution,
    /// Learner submitted an answer without help.
    SelfSolveAttempt,
    /// Learner retried a task they had already seen.
    TaskRepeat,
}

impl BehaviorType {
    pub const ALL: [BehaviorType; 6] = [
        Self::SolutionRequest,
        Self::HintRequest,
        Self::TaskAbandon,
        Self::QuickSolution,
        Self::SelfSolveAttempt,
        Self::TaskRepeat,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SolutionRequest => "solution_request",
            Self::HintRequest => "hint_request",
            Self::TaskAbandon => "task_abandon",
            Self::QuickSolution => "quick_solution",
            Self::SelfSolveAttempt => "self_solve_attempt",
            Self::TaskRepeat => "task_repeat",
        }
    }

    /// Whether the behavior counts as asking for help.
    pub fn is_help_seeking(&self) -> bool {
        matches!(self, Self::SolutionRequest | Self::HintRequest)
    }
}

impl FromStr for BehaviorType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ParseEnumError::new("behavior type", s))
    }
}

impl std::fmt::Display for BehaviorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable record of one observed behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehaviorEvent {
    pub event_id: EventId,
    pub behavior_type: BehaviorType,
    /// Free-form context supplied by the caller (task id, topic, ...).
    #[serde(default)]
    pub context: serde_json::Value,
    /// How many occurrences this record stands for.
    #[serde(default = "default_frequency")]
    pub frequency: u32,
    pub session_id: SessionId,
    pub timestamp: DateTime<Utc>,
}

fn default_frequency() -> u32 {
    1
}

impl BehaviorEvent {
    /// Single occurrence stamped now.
    pub fn new(
        behavior_type: BehaviorType,
        context: serde_json::Value,
        session_id: SessionId,
    ) -> Self {
        Self::at(behavior_type, context, session_id, Utc::now())
    }

    /// Single occurrence at an explicit time.
    pub fn at(
        behavior_type: BehaviorType,
        context: serde_json::Value,
        session_id: SessionId,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            event_id: EventId::new(),
            behavior_type,
            context,
            frequency: default_frequency(),
            session_id,
            timestamp,
        }
    }

    #[must_use]
    pub fn with_frequency(mut self, frequency: u32) -> Self {
        self.frequency = frequency.max(1);
        self
    }

    /// Storage key in the `behaviorType#timestamp` form.
    pub fn storage_key(&self) -> String {
        format!(
            "{}#{}",
            self.behavior_type.as_str(),
            self.timestamp.timestamp_millis()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn behavior_type_round_trips_through_str() {
        for t in BehaviorType::ALL {
            assert_eq!(t.as_str().parse::<BehaviorType>().unwrap(), t);
        }
        assert!("daydreaming".parse::<BehaviorType>().is_err());
    }

    #[test]
    fn behavior_type_serializes_snake_case() {
        let json = serde_json::to_string(&BehaviorType::SelfSolveAttempt).unwrap();
        assert_eq!(json, r#""self_solve_attempt""#);
    }

    #[test]
    fn help_seeking_covers_hints_and_solutions() {
        assert!(BehaviorType::SolutionRequest.is_help_seeking());
        assert!(BehaviorType::HintRequest.is_help_seeking());
        assert!(!BehaviorType::SelfSolveAttempt.is_help_seeking());
        assert!(!BehaviorType::TaskAbandon.is_help_seeking());
    }

    #[test]
    fn frequency_defaults_to_one() {
        let raw = json!({
            "event_id": EventId::new(),
            "behavior_type": "hint_request",
            "session_id": "s-1",
            "timestamp": "2026-03-01T10:00:00Z"
        });
        let event: BehaviorEvent = serde_json::from_value(raw).unwrap();

        assert_eq!(event.frequency, 1);
        assert!(event.context.is_null());
    }

    #[test]
    fn storage_key_combines_type_and_millis() {
        let ts = DateTime::parse_from_rfc3339("2026-03-01T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let event = BehaviorEvent::at(BehaviorType::TaskAbandon, json!({}), "s".into(), ts);

        assert_eq!(
            event.storage_key(),
            format!("task_abandon#{}", ts.timestamp_millis())
        );
    }

    #[test]
    fn zero_frequency_is_raised_to_one() {
        let event = BehaviorEvent::new(BehaviorType::HintRequest, json!(null), "s".into())
            .with_frequency(0);
        assert_eq!(event.frequency, 1);
    }
}
