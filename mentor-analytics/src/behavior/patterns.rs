//! Long-horizon behavior patterns.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::intervention::help_seeking_ratio;
use crate::config::PatternConfig;
use crate::performance::{Priority, Recommendation, RecommendationCategory};
use crate::types::{BehaviorEvent, BehaviorType};

/// Frequency-weighted behavior counts over a window.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BehaviorPatterns {
    pub counts: BTreeMap<BehaviorType, u32>,
    pub total: u32,
    /// `(solution + hint) / (solution + hint + self_solve)`.
    pub help_seeking_ratio: f64,
    /// Self-solve attempts as a share of all actions.
    pub self_solve_ratio: f64,
}

impl BehaviorPatterns {
    pub fn from_events(events: &[BehaviorEvent]) -> Self {
        let mut counts = BTreeMap::new();
        for event in events {
            let slot = counts.entry(event.behavior_type).or_insert(0u32);
            *slot = slot.saturating_add(event.frequency);
        }
        let total = counts.values().fold(0u32, |acc, c| acc.saturating_add(*c));

        let count = |t: BehaviorType| counts.get(&t).copied().unwrap_or(0);
        let self_solves = count(BehaviorType::SelfSolveAttempt);
        let help_seeking = help_seeking_ratio(
            count(BehaviorType::SolutionRequest),
            count(BehaviorType::HintRequest),
            self_solves,
        );
        let self_solve_ratio = if total == 0 {
            0.0
        } else {
            f64::from(self_solves) / f64::from(total)
        };

        Self {
            counts,
            total,
            help_seeking_ratio: help_seeking,
            self_solve_ratio,
        }
    }

    pub fn count(&self, behavior_type: BehaviorType) -> u32 {
        self.counts.get(&behavior_type).copied().unwrap_or(0)
    }
}

/// A recurring behavior worth addressing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    ExcessiveSolutionRequests,
    FrequentAbandons,
    LowSelfSolving,
}

/// One detected pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProblematicPattern {
    pub kind: PatternKind,
    pub severity: Priority,
    /// Count (or ratio, for self-solving) that crossed the threshold.
    pub observed: f64,
    pub description: String,
}

/// Check the long-horizon thresholds, highest severity first.
pub fn detect_problems(patterns: &BehaviorPatterns, config: &PatternConfig) -> Vec<ProblematicPattern> {
    let mut problems = Vec::new();

    let solutions = patterns.count(BehaviorType::SolutionRequest);
    if solutions > config.solution_requests {
        problems.push(ProblematicPattern {
            kind: PatternKind::ExcessiveSolutionRequests,
            severity: Priority::High,
            observed: f64::from(solutions),
            description: format!("{solutions} solution requests in the period"),
        });
    }

    let abandons = patterns.count(BehaviorType::TaskAbandon);
    if abandons > config.abandons {
        problems.push(ProblematicPattern {
            kind: PatternKind::FrequentAbandons,
            severity: Priority::Medium,
            observed: f64::from(abandons),
            description: format!("{abandons} tasks abandoned in the period"),
        });
    }

    if patterns.total > config.self_solve_min_actions
        && patterns.self_solve_ratio < config.self_solve_ratio
    {
        problems.push(ProblematicPattern {
            kind: PatternKind::LowSelfSolving,
            severity: Priority::Medium,
            observed: patterns.self_solve_ratio,
            description: format!(
                "only {:.0}% of actions were independent attempts",
                patterns.self_solve_ratio * 100.0
            ),
        });
    }

    problems.sort_by_key(|p| p.severity);
    problems
}

impl ProblematicPattern {
    /// Advice addressing this pattern.
    pub fn recommendation(&self) -> Recommendation {
        let (title, message) = match self.kind {
            PatternKind::ExcessiveSolutionRequests => (
                "Work towards solutions yourself",
                "Solutions are requested very often. Ask for a hint first and try the next step alone.",
            ),
            PatternKind::FrequentAbandons => (
                "Finish what you start",
                "Many tasks are left unfinished. Choose shorter or easier tasks and complete them.",
            ),
            PatternKind::LowSelfSolving => (
                "Attempt tasks independently",
                "Few tasks are attempted without help. Spend a few minutes on each task before asking.",
            ),
        };
        Recommendation::new(RecommendationCategory::Behavior, self.severity, title, message)
    }
}
