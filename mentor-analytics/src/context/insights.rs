//! Insight and focus-area derivation.

use super::types::{FocusArea, FocusCategory, Insight, InsightKind, UserContext};
use crate::behavior::ProblematicPattern;
use crate::competency::{AreaReport, PracticeReason, PracticeRecommendation};
use crate::performance::{MotivationEstimate, Priority, TrendDirection};

/// Motivation under which it becomes a focus area.
const LOW_MOTIVATION: u8 = 4;
/// Motivation at or above which it is called out as a strength.
const HIGH_MOTIVATION: u8 = 7;
/// Fluctuation above which results are called erratic.
const HIGH_FLUCTUATION: u8 = 7;
/// Areas named per insight.
const MAX_NAMED_AREAS: usize = 3;

/// Human-facing summaries of a context.
pub fn insights_from(ctx: &UserContext) -> Vec<Insight> {
    let mut insights = Vec::new();
    let mut push = |kind, message: String| insights.push(Insight { kind, message });

    match ctx.trend.direction {
        TrendDirection::Improving => push(
            InsightKind::Trend,
            format!("Success rate is improving (+{:.0} points)", ctx.trend.change),
        ),
        TrendDirection::Declining => push(
            InsightKind::Trend,
            format!("Success rate is declining ({:.0} points)", ctx.trend.change),
        ),
        TrendDirection::Stable => push(InsightKind::Trend, "Performance is steady".to_string()),
        TrendDirection::InsufficientData => {}
    }

    if ctx.motivation.level < LOW_MOTIVATION {
        push(
            InsightKind::Motivation,
            format!("Motivation is low ({}/10)", ctx.motivation.level),
        );
    } else if ctx.motivation.level >= HIGH_MOTIVATION {
        push(
            InsightKind::Motivation,
            format!("Motivation is high ({}/10)", ctx.motivation.level),
        );
    }

    if !ctx.strong_areas.topics.is_empty() {
        push(
            InsightKind::Strength,
            format!("Strong in {}", named_topics(&ctx.strong_areas)),
        );
    }
    if !ctx.weak_areas.topics.is_empty() {
        push(
            InsightKind::Weakness,
            format!("Needs work in {}", named_topics(&ctx.weak_areas)),
        );
    }

    if ctx.performance.tasks_completed > 0 && ctx.performance.fluctuation_score > HIGH_FLUCTUATION {
        push(
            InsightKind::Fluctuation,
            "Results vary a lot from task to task".to_string(),
        );
    }

    if let (Some(topic), Some(level)) = (&ctx.current_topic, ctx.current_topic_level()) {
        push(
            InsightKind::CurrentTopic,
            format!("Current topic {topic} is at level {level}/5"),
        );
    }

    insights
}

fn named_topics(report: &AreaReport) -> String {
    report
        .topics
        .iter()
        .take(MAX_NAMED_AREAS)
        .map(|a| a.topic.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// At most one focus area per category, in fixed order.
pub fn focus_areas_from(
    weak: &AreaReport,
    motivation: &MotivationEstimate,
    problems: &[ProblematicPattern],
    next: Option<&PracticeRecommendation>,
) -> Vec<FocusArea> {
    let mut areas = Vec::new();

    if let Some(weakest) = weak.topics.first() {
        areas.push(FocusArea {
            category: FocusCategory::CriticalWeakness,
            priority: Priority::High,
            title: format!("Strengthen {}", weakest.topic),
            detail: format!("{} is at level {}/5", weakest.topic, weakest.level),
            topic: Some(weakest.topic.clone()),
        });
    }

    if motivation.level < LOW_MOTIVATION {
        areas.push(FocusArea {
            category: FocusCategory::Motivation,
            priority: Priority::High,
            title: "Rebuild motivation".to_string(),
            detail: format!("Motivation is {}/10", motivation.level),
            topic: None,
        });
    }

    // problems arrive sorted by severity
    if let Some(problem) = problems.first() {
        areas.push(FocusArea {
            category: FocusCategory::Behavior,
            priority: problem.severity,
            title: problem.recommendation().title,
            detail: problem.description.clone(),
            topic: None,
        });
    }

    if let Some(next) = next {
        let detail = match (&next.sub_topic, next.reason) {
            (Some(sub), _) => format!("focus on {sub} at {} difficulty", next.suggested_difficulty),
            (None, PracticeReason::Maintenance) => {
                format!("keep it fresh at {} difficulty", next.suggested_difficulty)
            }
            (None, PracticeReason::Weakness) => {
                format!("practice at {} difficulty", next.suggested_difficulty)
            }
        };
        areas.push(FocusArea {
            category: FocusCategory::NextPractice,
            priority: Priority::Medium,
            title: format!("Practice {}", next.topic),
            detail,
            topic: Some(next.topic.clone()),
        });
    }

    areas
}
