//! Aggregates over task attempts: summary stats, trend and fluctuation.

use serde::{Deserialize, Serialize};

use crate::types::PerformanceEvent;

/// Fluctuation score reported when there are too few events to judge.
pub const NEUTRAL_FLUCTUATION: u8 = 5;

/// Highest fluctuation score.
pub const MAX_FLUCTUATION: u8 = 10;

/// Scale from the std-dev of fractional window rates to the 0-10 score.
const FLUCTUATION_SCALE: f64 = 20.0;

/// Summary of task attempts in a window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceStats {
    pub tasks_completed: u32,
    /// Percentage 0-100.
    pub success_rate: f64,
    /// Mean seconds per task.
    pub average_time: f64,
    pub hints_used_avg: f64,
    /// Percentage 0-100 of tasks where the solution was shown.
    pub solution_shown_rate: f64,
    /// 0 (steady) to 10 (erratic).
    pub fluctuation_score: u8,
}

impl PerformanceStats {
    /// Stats for a window without events.
    pub fn empty() -> Self {
        Self {
            tasks_completed: 0,
            success_rate: 0.0,
            average_time: 0.0,
            hints_used_avg: 0.0,
            solution_shown_rate: 0.0,
            fluctuation_score: 0,
        }
    }

    /// Aggregate chronologically ordered events.
    pub fn from_events(events: &[PerformanceEvent], fluctuation_window: usize) -> Self {
        if events.is_empty() {
            return Self::empty();
        }

        let n = events.len() as f64;
        let successes = events.iter().filter(|e| e.success).count() as f64;
        let shown = events.iter().filter(|e| e.showed_solution).count() as f64;
        let time: f64 = events.iter().map(|e| e.time_spent).sum();
        let hints: f64 = events.iter().map(|e| f64::from(e.hints_used)).sum();

        Self {
            tasks_completed: events.len() as u32,
            success_rate: (successes / n * 100.0).clamp(0.0, 100.0),
            average_time: time / n,
            hints_used_avg: hints / n,
            solution_shown_rate: (shown / n * 100.0).clamp(0.0, 100.0),
            fluctuation_score: fluctuation_score(events, fluctuation_window),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tasks_completed == 0
    }
}

impl Default for PerformanceStats {
    fn default() -> Self {
        Self::empty()
    }
}

/// Direction of the success rate over a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Improving,
    Stable,
    Declining,
    InsufficientData,
}

impl TrendDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Improving => "improving",
            Self::Stable => "stable",
            Self::Declining => "declining",
            Self::InsufficientData => "insufficient_data",
        }
    }
}

impl std::fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Half-over-half comparison of success rates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendReport {
    pub direction: TrendDirection,
    /// Success percentage of the older half.
    pub first_half_rate: f64,
    /// Success percentage of the newer half.
    pub second_half_rate: f64,
    /// `second_half_rate - first_half_rate`, in percentage points.
    pub change: f64,
    pub event_count: usize,
}

impl TrendReport {
    pub fn insufficient(event_count: usize) -> Self {
        Self {
            direction: TrendDirection::InsufficientData,
            first_half_rate: 0.0,
            second_half_rate: 0.0,
            change: 0.0,
            event_count,
        }
    }

    /// Split chronologically ordered events at `⌊n/2⌋` and compare halves.
    pub fn from_events(events: &[PerformanceEvent], min_events: usize, threshold: f64) -> Self {
        if events.len() < min_events.max(2) {
            return Self::insufficient(events.len());
        }

        let (first, second) = split_rates(events);
        let change = second - first;
        let direction = if change > threshold {
            TrendDirection::Improving
        } else if change < -threshold {
            TrendDirection::Declining
        } else {
            TrendDirection::Stable
        };

        Self {
            direction,
            first_half_rate: first,
            second_half_rate: second,
            change,
            event_count: events.len(),
        }
    }
}

/// Success percentages of the first `⌊n/2⌋` events and the rest.
pub fn split_rates(events: &[PerformanceEvent]) -> (f64, f64) {
    let (first, second) = events.split_at(events.len() / 2);
    (success_percentage(first), success_percentage(second))
}

fn success_percentage(events: &[PerformanceEvent]) -> f64 {
    if events.is_empty() {
        return 0.0;
    }
    let successes = events.iter().filter(|e| e.success).count();
    successes as f64 / events.len() as f64 * 100.0
}

/// Population std-dev of sliding-window success rates, scaled to 0-10.
///
/// Neutral when there are fewer events than one window.
pub fn fluctuation_score(events: &[PerformanceEvent], window: usize) -> u8 {
    let window = window.max(1);
    if events.len() < window {
        return NEUTRAL_FLUCTUATION;
    }

    let rates: Vec<f64> = events
        .windows(window)
        .map(|w| w.iter().filter(|e| e.success).count() as f64 / window as f64)
        .collect();

    let n = rates.len() as f64;
    let mean = rates.iter().sum::<f64>() / n;
    let variance = rates.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;

    (variance.sqrt() * FLUCTUATION_SCALE)
        .round()
        .clamp(0.0, f64::from(MAX_FLUCTUATION)) as u8
}
