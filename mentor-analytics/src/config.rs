//! Configuration for the analytics engine.
//!
//! Every section defaults independently, so a config file only needs the
//! keys it wants to change:
//!
//! ```toml
//! [storage]
//! backend = "cozo"
//! engine = "rocksdb"
//!
//! [behavior.intervention]
//! solution_request_threshold = 5
//! ```

use std::path::{Path, PathBuf};

use mentor_observe::TracingConfig;
use serde::{Deserialize, Serialize};

use crate::error::{AnalyticsError, Result};
use crate::types::{DEFAULT_HISTORY_LIMIT, MAX_LEVEL, MIN_LEVEL};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    pub storage: StorageConfig,
    pub competency: CompetencyConfig,
    pub performance: PerformanceConfig,
    pub behavior: BehaviorConfig,
    pub logging: TracingConfig,
}

impl AnalyticsConfig {
    /// Load and validate a TOML config file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml(&raw)
    }

    /// Load `~/.config/mentor/analytics.toml` when present, defaults otherwise.
    pub fn load_default() -> Result<Self> {
        let path = mentor_paths::analytics_config_file();
        if path.exists() {
            tracing::debug!(path = %path.display(), "loading analytics config");
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse and validate TOML text.
    pub fn from_toml(raw: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(raw).map_err(|e| AnalyticsError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the engine cannot work with.
    pub fn validate(&self) -> Result<()> {
        let levels = MIN_LEVEL..=MAX_LEVEL;
        let c = &self.competency;
        if !levels.contains(&c.weak_threshold) || !levels.contains(&c.strong_threshold) {
            return Err(AnalyticsError::Config(format!(
                "competency thresholds must be within {MIN_LEVEL}-{MAX_LEVEL}"
            )));
        }
        if c.weak_threshold > c.strong_threshold {
            return Err(AnalyticsError::Config(
                "weak_threshold must not exceed strong_threshold".into(),
            ));
        }
        if c.history_limit == 0 {
            return Err(AnalyticsError::Config("history_limit must be positive".into()));
        }
        if self.performance.fluctuation_window < 2 {
            return Err(AnalyticsError::Config(
                "fluctuation_window must be at least 2".into(),
            ));
        }
        if self.behavior.intervention.window_secs == 0 {
            return Err(AnalyticsError::Config("window_secs must be positive".into()));
        }
        let ratio = self.behavior.intervention.help_seeking_ratio;
        if !(0.0..=1.0).contains(&ratio) {
            return Err(AnalyticsError::Config(
                "help_seeking_ratio must be within 0.0-1.0".into(),
            ));
        }
        Ok(())
    }
}

/// Which `LearnerStore` implementation to open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    /// Process-local maps, lost on exit.
    #[default]
    Memory,
    /// Embedded CozoDB.
    Cozo,
}

/// CozoDB storage engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CozoEngine {
    Mem,
    #[default]
    Rocksdb,
}

impl CozoEngine {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mem => "mem",
            Self::Rocksdb => "rocksdb",
        }
    }
}

/// Storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub engine: CozoEngine,
    /// Database directory for on-disk engines.
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            engine: CozoEngine::Rocksdb,
            path: mentor_paths::data_dir().join("analytics"),
        }
    }
}

/// Competency model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompetencyConfig {
    /// History entries kept per record.
    pub history_limit: usize,
    /// Levels below this are weak areas.
    pub weak_threshold: u8,
    /// Levels at or above this are strong areas.
    pub strong_threshold: u8,
    /// Smallest sub-topic change applied from a single task.
    pub min_sub_topic_change: f64,
    /// Topics offered in mastery-maintenance mode.
    pub topic_catalog: Vec<String>,
}

impl Default for CompetencyConfig {
    fn default() -> Self {
        Self {
            history_limit: DEFAULT_HISTORY_LIMIT,
            weak_threshold: 3,
            strong_threshold: 4,
            min_sub_topic_change: 0.2,
            topic_catalog: [
                "arithmetic",
                "algebra",
                "geometry",
                "trigonometry",
                "calculus",
                "probability",
                "statistics",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

/// Performance analyzer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceConfig {
    /// Fewer events than this yield an insufficient-data trend.
    pub trend_min_events: usize,
    /// Percentage-point change that counts as a trend.
    pub trend_threshold: f64,
    /// Sliding window size for the fluctuation score.
    pub fluctuation_window: usize,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            trend_min_events: 5,
            trend_threshold: 10.0,
            fluctuation_window: 3,
        }
    }
}

/// Behavior monitor settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorConfig {
    pub intervention: InterventionConfig,
    pub session: SessionConfig,
    pub patterns: PatternConfig,
}

/// Real-time intervention rule thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InterventionConfig {
    /// Trailing session window in seconds.
    pub window_secs: u64,
    pub solution_request_threshold: u32,
    pub quick_solution_threshold: u32,
    pub task_abandon_threshold: u32,
    /// Help-seeking ratio that must be exceeded.
    pub help_seeking_ratio: f64,
    /// Window events required before the ratio rule applies.
    pub help_seeking_min_events: u32,
}

impl Default for InterventionConfig {
    fn default() -> Self {
        Self {
            window_secs: 600,
            solution_request_threshold: 4,
            quick_solution_threshold: 3,
            task_abandon_threshold: 3,
            help_seeking_ratio: 0.8,
            help_seeking_min_events: 5,
        }
    }
}

/// In-memory session registry limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Events kept per session (oldest evicted).
    pub max_events_per_session: usize,
    /// Learners tracked at once (least recently active evicted).
    pub max_sessions: usize,
    /// Sessions idle longer than this are dropped.
    pub idle_ttl_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_events_per_session: 200,
            max_sessions: 1000,
            idle_ttl_secs: 3600,
        }
    }
}

/// Long-horizon problematic pattern thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternConfig {
    /// Solution requests above this are a high-severity pattern.
    pub solution_requests: u32,
    /// Abandons above this are a medium-severity pattern.
    pub abandons: u32,
    /// Self-solve ratio below this is a medium-severity pattern...
    pub self_solve_ratio: f64,
    /// ...once more than this many actions were recorded.
    pub self_solve_min_actions: u32,
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            solution_requests: 15,
            abandons: 10,
            self_solve_ratio: 0.3,
            self_solve_min_actions: 10,
        }
    }
}
