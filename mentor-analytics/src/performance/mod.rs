//! Performance analyzer: statistics over task attempts.
//!
//! Everything is recomputed from the event log on each call. Windows are
//! trailing day counts; the `DEFAULT_*` constants are the windows the
//! context aggregator uses.

mod analyzer;
mod motivation;
mod recommendations;
mod stats;

pub use analyzer::PerformanceAnalyzer;
pub use motivation::{MotivationEstimate, MotivationFactor, MotivationLevel, NEUTRAL_MOTIVATION};
pub use recommendations::{
    Priority, Recommendation, RecommendationCategory, RecommendationInputs, recommend,
};
pub use stats::{
    MAX_FLUCTUATION, NEUTRAL_FLUCTUATION, PerformanceStats, TrendDirection, TrendReport,
    fluctuation_score, split_rates,
};

/// Window for summary stats in contexts.
pub const DEFAULT_STATS_DAYS: u32 = 30;

/// Window for trend calculation.
pub const DEFAULT_TREND_DAYS: u32 = 14;

/// Window for fluctuation and motivation.
pub const DEFAULT_MOTIVATION_DAYS: u32 = 7;

/// Window for recommendations.
pub const DEFAULT_RECOMMENDATION_DAYS: u32 = 14;
