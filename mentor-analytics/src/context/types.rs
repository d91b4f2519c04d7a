//! Snapshot types handed to the prompt layer.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::behavior::BehaviorPatterns;
use crate::competency::AreaReport;
use crate::performance::{
    MotivationEstimate, PerformanceStats, Priority, Recommendation, TrendDirection, TrendReport,
};
use crate::types::{CompetencyRecord, DEFAULT_LEVEL, PerformanceEvent, UserId};

/// Coarse health label of a learner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverallStatus {
    Excellent,
    Good,
    NeedsAttention,
    /// The snapshot could not be computed.
    Unknown,
}

impl OverallStatus {
    /// `needs_attention` wins over `excellent`; everything else is `good`.
    pub fn classify(success_rate: f64, motivation: u8, trend: TrendDirection) -> Self {
        if success_rate < 50.0 || motivation < 4 || trend == TrendDirection::Declining {
            Self::NeedsAttention
        } else if success_rate > 75.0 && motivation >= 7 && trend == TrendDirection::Improving {
            Self::Excellent
        } else {
            Self::Good
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Excellent => "excellent",
            Self::Good => "good",
            Self::NeedsAttention => "needs_attention",
            Self::Unknown => "unknown",
        }
    }
}

/// Headline numbers of a [`UserContext`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextSummary {
    pub overall_status: OverallStatus,
    pub topics_practiced: usize,
    pub weak_topic_count: usize,
    pub strong_topic_count: usize,
}

/// Everything known about a learner, computed fresh per request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserContext {
    pub user_id: UserId,
    pub current_topic: Option<String>,
    pub competencies: BTreeMap<String, CompetencyRecord>,
    /// Stats for the current topic (all topics when none).
    pub performance: PerformanceStats,
    pub behavior: BehaviorPatterns,
    pub weak_areas: AreaReport,
    pub strong_areas: AreaReport,
    pub motivation: MotivationEstimate,
    pub trend: TrendReport,
    pub summary: ContextSummary,
}

impl UserContext {
    /// Context returned when the snapshot cannot be computed.
    pub fn fallback(user_id: &UserId, current_topic: Option<&str>) -> Self {
        Self {
            user_id: user_id.clone(),
            current_topic: current_topic.map(str::to_string),
            competencies: BTreeMap::new(),
            performance: PerformanceStats::empty(),
            behavior: BehaviorPatterns::default(),
            weak_areas: AreaReport::default(),
            strong_areas: AreaReport::default(),
            motivation: MotivationEstimate::neutral(),
            trend: TrendReport::insufficient(0),
            summary: ContextSummary {
                overall_status: OverallStatus::Unknown,
                topics_practiced: 0,
                weak_topic_count: 0,
                strong_topic_count: 0,
            },
        }
    }

    pub fn status(&self) -> OverallStatus {
        self.summary.overall_status
    }

    /// Level of the current topic, if one is set and practiced.
    pub fn current_topic_level(&self) -> Option<u8> {
        let topic = self.current_topic.as_ref()?;
        self.competencies.get(topic).map(|r| r.overall_level)
    }
}

/// Derived reading of one topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicAnalysis {
    pub level: u8,
    pub trend: TrendDirection,
    pub next_step: String,
}

/// Everything known about one topic of a learner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicContext {
    pub topic: String,
    pub competency: Option<CompetencyRecord>,
    pub performance: PerformanceStats,
    /// Newest first.
    pub recent_history: Vec<PerformanceEvent>,
    pub analysis: TopicAnalysis,
}

impl TopicContext {
    pub fn fallback(topic: &str) -> Self {
        Self {
            topic: topic.to_string(),
            competency: None,
            performance: PerformanceStats::empty(),
            recent_history: Vec::new(),
            analysis: TopicAnalysis {
                level: DEFAULT_LEVEL,
                trend: TrendDirection::InsufficientData,
                next_step: next_step(topic, DEFAULT_LEVEL, TrendDirection::InsufficientData),
            },
        }
    }
}

/// Suggested next step for a topic at `level` moving in `trend`.
pub fn next_step(topic: &str, level: u8, trend: TrendDirection) -> String {
    if trend == TrendDirection::Declining {
        format!("Revisit recent {topic} tasks and find where mistakes started")
    } else if level <= 2 {
        format!("Review the fundamentals of {topic} with easier tasks")
    } else if level >= 4 {
        format!("Take on harder {topic} challenges")
    } else {
        format!("Keep practicing {topic} at medium difficulty")
    }
}

/// Area a tutor should focus on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FocusCategory {
    CriticalWeakness,
    Motivation,
    Behavior,
    NextPractice,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FocusArea {
    pub category: FocusCategory,
    pub priority: Priority,
    pub title: String,
    pub detail: String,
    pub topic: Option<String>,
}

/// What an insight talks about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightKind {
    Trend,
    Motivation,
    Strength,
    Weakness,
    Fluctuation,
    CurrentTopic,
}

/// Human-facing one-liner derived from a [`UserContext`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    pub kind: InsightKind,
    pub message: String,
}

/// Progress over a period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningProgress {
    pub period_days: u32,
    /// Mean topic level, 0 when nothing was practiced.
    pub overall_level: f64,
    /// Second-half minus first-half success rate, percentage points.
    pub improvement: f64,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    /// Performance recommendations followed by behavior recommendations.
    pub recommendations: Vec<Recommendation>,
}

impl LearningProgress {
    /// Zeroed progress for a period, used when the stores cannot be read.
    pub fn empty(period_days: u32) -> Self {
        Self {
            period_days,
            overall_level: 0.0,
            improvement: 0.0,
            strengths: Vec::new(),
            weaknesses: Vec::new(),
            recommendations: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        use TrendDirection::*;
        assert_eq!(OverallStatus::classify(40.0, 8, Improving), OverallStatus::NeedsAttention);
        assert_eq!(OverallStatus::classify(80.0, 3, Improving), OverallStatus::NeedsAttention);
        assert_eq!(OverallStatus::classify(90.0, 9, Declining), OverallStatus::NeedsAttention);
        assert_eq!(OverallStatus::classify(80.0, 7, Improving), OverallStatus::Excellent);
        assert_eq!(OverallStatus::classify(80.0, 7, Stable), OverallStatus::Good);
        assert_eq!(OverallStatus::classify(60.0, 5, InsufficientData), OverallStatus::Good);
    }

    #[test]
    fn test_fallback_context() {
        let ctx = UserContext::fallback(&UserId::from("u"), Some("algebra"));
        assert_eq!(ctx.status(), OverallStatus::Unknown);
        assert_eq!(ctx.motivation.level, 5);
        assert_eq!(ctx.performance.tasks_completed, 0);
        assert_eq!(ctx.current_topic.as_deref(), Some("algebra"));
        assert_eq!(ctx.current_topic_level(), None);
    }

    #[test]
    fn test_next_step_prefers_declining_trend() {
        let step = next_step("algebra", 5, TrendDirection::Declining);
        assert!(step.starts_with("Revisit"));
        assert!(next_step("algebra", 1, TrendDirection::Stable).contains("fundamentals"));
        assert!(next_step("algebra", 4, TrendDirection::Stable).contains("harder"));
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_value(OverallStatus::NeedsAttention).unwrap();
        assert_eq!(json, "needs_attention");
    }
}
