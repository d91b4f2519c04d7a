//! mentor-analytics - learner analytics and intervention engine
//!
//! Turns raw learning events (task attempts, hint and solution requests,
//! abandonments) into a per-learner competency model, derives trends and a
//! motivation estimate, and decides when to intervene. The output is a
//! [`UserContext`] snapshot consumed by a prompt-construction layer.
//!
//! ## Components
//!
//! - [`CompetencyModel`]: per-topic and sub-topic mastery
//! - [`PerformanceAnalyzer`]: stats, trend, fluctuation, motivation
//! - [`BehaviorMonitor`]: session windows and intervention signals
//! - [`ContextAggregator`]: concurrent composition of the three
//!
//! [`LearnerAnalytics`] wires them around one [`LearnerStore`].
//!
//! ```ignore
//! let analytics = LearnerAnalytics::open(AnalyticsConfig::load_default()?).await?;
//! analytics.record_task(&user, "algebra", &TaskOutcome::new(true, 42.0)).await?;
//! let context = analytics.context().get_user_context(&user, Some("algebra")).await;
//! ```

pub mod behavior;
pub mod competency;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod performance;
pub mod store;
pub mod types;

pub use behavior::{
    BehaviorLogOutcome, BehaviorMonitor, BehaviorPatterns, InterventionSignal, PatternKind,
    ProblematicPattern, SignalType,
};
pub use competency::{AreaReport, CompetencyModel, PracticeReason, PracticeRecommendation};
pub use config::{
    AnalyticsConfig, BehaviorConfig, CompetencyConfig, CozoEngine, PerformanceConfig,
    StorageBackend, StorageConfig,
};
pub use context::{
    ContextAggregator, FocusArea, FocusCategory, Insight, InsightKind, LearningProgress,
    OverallStatus, TopicContext, UserContext,
};
pub use engine::LearnerAnalytics;
pub use error::{AnalyticsError, Result};
pub use performance::{
    MotivationEstimate, MotivationLevel, PerformanceAnalyzer, PerformanceStats, Priority,
    Recommendation, RecommendationCategory, TrendDirection, TrendReport,
};
pub use store::{
    BehaviorQuery, CozoLearnerStore, InMemoryLearnerStore, LearnerStore, PerformanceQuery,
    open_store,
};
pub use types::*;
