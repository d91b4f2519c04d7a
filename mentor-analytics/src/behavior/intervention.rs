//! Real-time intervention rules over a session window.
//!
//! Rules are checked in a fixed priority order and the first match wins:
//!
//! 1. repeated solution requests → [`SignalType::PromptAdvice`]
//! 2. repeated quick solutions → [`SignalType::Warning`]
//! 3. repeated task abandons → [`SignalType::Suggestion`]
//! 4. mostly help-seeking activity → [`SignalType::Encouragement`]
//!
//! There is no cooldown: a rule fires again on every event that still
//! satisfies it.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::InterventionConfig;
use crate::types::BehaviorType;

/// Kind of intervention surfaced to the prompt layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalType {
    PromptAdvice,
    Warning,
    Suggestion,
    Encouragement,
}

impl SignalType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PromptAdvice => "prompt_advice",
            Self::Warning => "warning",
            Self::Suggestion => "suggestion",
            Self::Encouragement => "encouragement",
        }
    }
}

/// Which rule produced a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterventionRule {
    SolutionRequests,
    QuickSolutions,
    TaskAbandons,
    HelpSeeking,
}

impl InterventionRule {
    /// Behavior type counted by the rule, `None` for ratio rules.
    pub fn behavior_type(&self) -> Option<BehaviorType> {
        match self {
            Self::SolutionRequests => Some(BehaviorType::SolutionRequest),
            Self::QuickSolutions => Some(BehaviorType::QuickSolution),
            Self::TaskAbandons => Some(BehaviorType::TaskAbandon),
            Self::HelpSeeking => None,
        }
    }
}

/// What fired, for explainability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalTrigger {
    pub rule: InterventionRule,
    pub behavior_type: Option<BehaviorType>,
    /// Matching events in the window (all window events for ratio rules).
    pub window_count: u32,
}

/// Ephemeral intervention decision. Never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterventionSignal {
    #[serde(rename = "type")]
    pub signal_type: SignalType,
    pub title: String,
    pub message: String,
    /// Ordered, most important first.
    pub suggested_actions: Vec<String>,
    pub timestamp: DateTime<Utc>,
    pub trigger: SignalTrigger,
}

/// Weighted behavior counts inside one window.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WindowCounts {
    counts: BTreeMap<BehaviorType, u32>,
}

impl WindowCounts {
    pub fn add(&mut self, behavior_type: BehaviorType, frequency: u32) {
        let slot = self.counts.entry(behavior_type).or_default();
        *slot = slot.saturating_add(frequency);
    }

    pub fn count(&self, behavior_type: BehaviorType) -> u32 {
        self.counts.get(&behavior_type).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u32 {
        self.counts.values().fold(0u32, |acc, c| acc.saturating_add(*c))
    }

    /// `(solution + hint) / (solution + hint + self_solve)`, 0 when none.
    pub fn help_seeking_ratio(&self) -> f64 {
        help_seeking_ratio(
            self.count(BehaviorType::SolutionRequest),
            self.count(BehaviorType::HintRequest),
            self.count(BehaviorType::SelfSolveAttempt),
        )
    }
}

pub(crate) fn help_seeking_ratio(solutions: u32, hints: u32, self_solves: u32) -> f64 {
    let help = f64::from(solutions) + f64::from(hints);
    let denominator = help + f64::from(self_solves);
    if denominator == 0.0 {
        0.0
    } else {
        help / denominator
    }
}

/// Check the rules against a window, first match wins.
pub fn evaluate(
    counts: &WindowCounts,
    config: &InterventionConfig,
    now: DateTime<Utc>,
) -> Option<InterventionSignal> {
    let solutions = counts.count(BehaviorType::SolutionRequest);
    if solutions >= config.solution_request_threshold {
        return Some(signal(
            SignalType::PromptAdvice,
            InterventionRule::SolutionRequests,
            solutions,
            "Try before revealing the solution",
            "Several solutions were requested in a short time. Guide the learner step by step instead of giving full answers.",
            &[
                "Offer a targeted hint for the next step",
                "Ask the learner to explain their current approach",
                "Break the task into smaller sub-problems",
            ],
            now,
        ));
    }

    let quick = counts.count(BehaviorType::QuickSolution);
    if quick >= config.quick_solution_threshold {
        return Some(signal(
            SignalType::Warning,
            InterventionRule::QuickSolutions,
            quick,
            "Solutions are coming very fast",
            "Tasks are being answered faster than they can be worked through. Check that the learner reads and reasons about each task.",
            &[
                "Ask for the reasoning behind the last answer",
                "Suggest double-checking results before submitting",
            ],
            now,
        ));
    }

    let abandons = counts.count(BehaviorType::TaskAbandon);
    if abandons >= config.task_abandon_threshold {
        return Some(signal(
            SignalType::Suggestion,
            InterventionRule::TaskAbandons,
            abandons,
            "Several tasks were abandoned",
            "The learner keeps leaving tasks unfinished. The current tasks may be too hard or too long.",
            &[
                "Offer an easier task on the same topic",
                "Suggest a short break",
                "Review the prerequisite concepts",
            ],
            now,
        ));
    }

    let total = counts.total();
    let ratio = counts.help_seeking_ratio();
    if total >= config.help_seeking_min_events && ratio > config.help_seeking_ratio {
        return Some(signal(
            SignalType::Encouragement,
            InterventionRule::HelpSeeking,
            total,
            "Trust your own attempts",
            "Most recent actions were requests for help. Encourage the learner to attempt the next step on their own first.",
            &[
                "Praise any independent attempt, even partial ones",
                "Ask what they would try first before giving a hint",
            ],
            now,
        ));
    }

    None
}

fn signal(
    signal_type: SignalType,
    rule: InterventionRule,
    window_count: u32,
    title: &str,
    message: &str,
    actions: &[&str],
    timestamp: DateTime<Utc>,
) -> InterventionSignal {
    InterventionSignal {
        signal_type,
        title: title.to_string(),
        message: message.to_string(),
        suggested_actions: actions.iter().map(|a| (*a).to_string()).collect(),
        timestamp,
        trigger: SignalTrigger {
            rule,
            behavior_type: rule.behavior_type(),
            window_count,
        },
    }
}
