//! Rule-based study recommendations.
//!
//! Rules are independent and evaluated in a fixed order; every rule that
//! fires contributes one recommendation.

use serde::{Deserialize, Serialize};

use super::motivation::MotivationEstimate;
use super::stats::{PerformanceStats, TrendDirection, TrendReport};

/// Success rate under which tasks are too hard.
const STRUGGLING_SUCCESS_RATE: f64 = 40.0;
/// Success rate over which tasks are too easy.
const CRUISING_SUCCESS_RATE: f64 = 85.0;
/// Tasks needed before difficulty rules apply.
const DIFFICULTY_MIN_TASKS: u32 = 5;
/// Tasks per day under which engagement is low.
const LOW_ENGAGEMENT_PER_DAY: f64 = 0.5;
/// Motivation under which a motivation recommendation fires.
const LOW_MOTIVATION: u8 = 4;
/// Seconds per task over which sessions are too long.
const SLOW_TASK_SECS: f64 = 600.0;
/// Seconds per task under which tasks are rushed.
const RUSHED_TASK_SECS: f64 = 15.0;

/// How urgent a recommendation is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

/// What a recommendation is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationCategory {
    Difficulty,
    Engagement,
    Motivation,
    Trend,
    TimeManagement,
    Behavior,
}

/// One actionable piece of advice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub category: RecommendationCategory,
    pub priority: Priority,
    pub title: String,
    pub message: String,
}

impl Recommendation {
    pub fn new(
        category: RecommendationCategory,
        priority: Priority,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category,
            priority,
            title: title.into(),
            message: message.into(),
        }
    }
}

/// Inputs the rules look at.
#[derive(Debug, Clone)]
pub struct RecommendationInputs<'a> {
    pub stats: &'a PerformanceStats,
    pub trend: &'a TrendReport,
    pub motivation: &'a MotivationEstimate,
    pub days: u32,
}

/// Evaluate every rule in order: difficulty, engagement, motivation, trend,
/// time management.
pub fn recommend(inputs: &RecommendationInputs<'_>) -> Vec<Recommendation> {
    let mut out = Vec::new();
    difficulty_rule(inputs, &mut out);
    engagement_rule(inputs, &mut out);
    motivation_rule(inputs, &mut out);
    trend_rule(inputs, &mut out);
    time_rule(inputs, &mut out);
    out
}

fn difficulty_rule(inputs: &RecommendationInputs<'_>, out: &mut Vec<Recommendation>) {
    let stats = inputs.stats;
    if stats.tasks_completed < DIFFICULTY_MIN_TASKS {
        return;
    }
    if stats.success_rate < STRUGGLING_SUCCESS_RATE {
        out.push(Recommendation::new(
            RecommendationCategory::Difficulty,
            Priority::High,
            "Lower the difficulty",
            format!(
                "Only {:.0}% of recent tasks succeeded. Step back to easier tasks and rebuild the basics.",
                stats.success_rate
            ),
        ));
    } else if stats.success_rate > CRUISING_SUCCESS_RATE {
        out.push(Recommendation::new(
            RecommendationCategory::Difficulty,
            Priority::Medium,
            "Raise the difficulty",
            format!(
                "{:.0}% of recent tasks succeeded. Harder tasks will keep progress going.",
                stats.success_rate
            ),
        ));
    }
}

fn engagement_rule(inputs: &RecommendationInputs<'_>, out: &mut Vec<Recommendation>) {
    let per_day = f64::from(inputs.stats.tasks_completed) / f64::from(inputs.days.max(1));
    if per_day < LOW_ENGAGEMENT_PER_DAY {
        out.push(Recommendation::new(
            RecommendationCategory::Engagement,
            Priority::Medium,
            "Practice more regularly",
            format!(
                "{} tasks in the last {} days. Short daily sessions work better than occasional long ones.",
                inputs.stats.tasks_completed, inputs.days
            ),
        ));
    }
}

fn motivation_rule(inputs: &RecommendationInputs<'_>, out: &mut Vec<Recommendation>) {
    if inputs.motivation.level < LOW_MOTIVATION {
        out.push(Recommendation::new(
            RecommendationCategory::Motivation,
            Priority::High,
            "Rebuild momentum",
            "Motivation looks low. Pick a few tasks that are sure wins and celebrate finishing them.",
        ));
    }
}

fn trend_rule(inputs: &RecommendationInputs<'_>, out: &mut Vec<Recommendation>) {
    match inputs.trend.direction {
        TrendDirection::Declining => out.push(Recommendation::new(
            RecommendationCategory::Trend,
            Priority::High,
            "Performance is dropping",
            format!(
                "Success fell by {:.0} points. Revisit the topics from the last few sessions.",
                -inputs.trend.change
            ),
        )),
        TrendDirection::Improving => out.push(Recommendation::new(
            RecommendationCategory::Trend,
            Priority::Low,
            "Keep it up",
            format!(
                "Success rose by {:.0} points. The current routine is working.",
                inputs.trend.change
            ),
        )),
        TrendDirection::Stable | TrendDirection::InsufficientData => {}
    }
}

fn time_rule(inputs: &RecommendationInputs<'_>, out: &mut Vec<Recommendation>) {
    let stats = inputs.stats;
    if stats.is_empty() {
        return;
    }
    if stats.average_time > SLOW_TASK_SECS {
        out.push(Recommendation::new(
            RecommendationCategory::TimeManagement,
            Priority::Low,
            "Break tasks down",
            "Tasks take a long time on average. Split them into smaller steps and check each one.",
        ));
    } else if stats.average_time < RUSHED_TASK_SECS && stats.success_rate < 50.0 {
        out.push(Recommendation::new(
            RecommendationCategory::TimeManagement,
            Priority::Medium,
            "Slow down",
            "Tasks are answered very quickly but often wrong. Read each task twice before answering.",
        ));
    }
}
