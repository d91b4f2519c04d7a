//! Context aggregator: one learner snapshot from all components.
//!
//! Reads fan out concurrently and share no mutable state. The snapshot
//! carries no generation timestamp, so two reads without an intervening
//! write are identical.

mod aggregator;
mod insights;
mod types;

pub use aggregator::ContextAggregator;
pub use insights::{focus_areas_from, insights_from};
pub use types::{
    ContextSummary, FocusArea, FocusCategory, Insight, InsightKind, LearningProgress,
    OverallStatus, TopicAnalysis, TopicContext, UserContext, next_step,
};
