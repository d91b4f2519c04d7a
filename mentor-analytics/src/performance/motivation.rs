//! Motivation estimate from recent performance.

use serde::{Deserialize, Serialize};

use super::stats::PerformanceStats;

/// Level reported without evidence.
pub const NEUTRAL_MOTIVATION: u8 = 5;

const MIN_MOTIVATION: i32 = 1;
const MAX_MOTIVATION: i32 = 10;

/// Something that moved the estimate away from neutral.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotivationFactor {
    /// Success rate above 70%.
    HighSuccessRate,
    /// Success rate below 30%.
    LowSuccessRate,
    /// Solutions shown on more than half of the tasks.
    FrequentSolutionViewing,
    /// Fewer than one hint per task on average.
    LowHintUsage,
    /// Fluctuation score above 7.
    HighFluctuation,
    /// More than three tasks a day.
    HighActivity,
    /// Less than one task every two days.
    LowActivity,
}

impl MotivationFactor {
    /// Contribution to the level.
    pub fn weight(&self) -> i32 {
        match self {
            Self::HighSuccessRate => 2,
            Self::LowSuccessRate => -2,
            Self::FrequentSolutionViewing => -1,
            Self::LowHintUsage => 1,
            Self::HighFluctuation => -1,
            Self::HighActivity => 1,
            Self::LowActivity => -1,
        }
    }
}

/// Coarse reading of a motivation level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotivationLevel {
    VeryHigh,
    High,
    Moderate,
    Low,
    VeryLow,
}

impl MotivationLevel {
    pub fn from_level(level: u8) -> Self {
        match level {
            8.. => Self::VeryHigh,
            6..=7 => Self::High,
            4..=5 => Self::Moderate,
            2..=3 => Self::Low,
            _ => Self::VeryLow,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VeryHigh => "very_high",
            Self::High => "high",
            Self::Moderate => "moderate",
            Self::Low => "low",
            Self::VeryLow => "very_low",
        }
    }
}

/// Motivation on a 1-10 scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotivationEstimate {
    pub level: u8,
    pub factors: Vec<MotivationFactor>,
    pub interpretation: MotivationLevel,
}

impl MotivationEstimate {
    /// Estimate used when there is nothing to go on.
    pub fn neutral() -> Self {
        Self {
            level: NEUTRAL_MOTIVATION,
            factors: Vec::new(),
            interpretation: MotivationLevel::from_level(NEUTRAL_MOTIVATION),
        }
    }

    /// Apply the factor rules to stats gathered over `days`.
    pub fn from_stats(stats: &PerformanceStats, days: u32) -> Self {
        if stats.is_empty() {
            return Self::neutral();
        }

        let per_day = f64::from(stats.tasks_completed) / f64::from(days.max(1));
        let rules = [
            (stats.success_rate > 70.0, MotivationFactor::HighSuccessRate),
            (stats.success_rate < 30.0, MotivationFactor::LowSuccessRate),
            (
                stats.solution_shown_rate > 50.0,
                MotivationFactor::FrequentSolutionViewing,
            ),
            (stats.hints_used_avg < 1.0, MotivationFactor::LowHintUsage),
            (stats.fluctuation_score > 7, MotivationFactor::HighFluctuation),
            (per_day > 3.0, MotivationFactor::HighActivity),
            (per_day < 0.5, MotivationFactor::LowActivity),
        ];
        let factors: Vec<MotivationFactor> = rules
            .into_iter()
            .filter_map(|(fired, factor)| fired.then_some(factor))
            .collect();

        let raw = i32::from(NEUTRAL_MOTIVATION) + factors.iter().map(|f| f.weight()).sum::<i32>();
        let level = raw.clamp(MIN_MOTIVATION, MAX_MOTIVATION) as u8;

        Self {
            level,
            factors,
            interpretation: MotivationLevel::from_level(level),
        }
    }
}

impl Default for MotivationEstimate {
    fn default() -> Self {
        Self::neutral()
    }
}
