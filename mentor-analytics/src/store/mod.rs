//! Storage collaborator interface and implementations.
//!
//! The engine never persists anything itself. Every component talks to a
//! [`LearnerStore`], a narrow keyed read/write interface with no
//! transactions:
//!
//! - competency records keyed by `(user, topic)`
//! - append-only performance events keyed by `(user, timestamp)`
//! - append-only behavior events keyed by `(user, type#timestamp)`
//!
//! Two implementations ship with the crate: [`InMemoryLearnerStore`] for
//! embedders and tests, and [`CozoLearnerStore`] backed by embedded CozoDB.

mod cozo;
mod memory;
mod schema;

pub use cozo::CozoLearnerStore;
pub use memory::InMemoryLearnerStore;
pub use schema::{CURRENT_SCHEMA_VERSION, MIGRATIONS, Migration};

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::config::{StorageBackend, StorageConfig};
use crate::error::Result;
use crate::types::{BehaviorEvent, BehaviorType, CompetencyRecord, PerformanceEvent, UserId};

/// Filter for performance event reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PerformanceQuery {
    /// Only events for this topic.
    pub topic: Option<String>,
    /// Trailing window in days.
    pub since_days: u32,
    /// Keep only the newest N events (still returned oldest first).
    pub limit: Option<usize>,
}

impl PerformanceQuery {
    pub fn last_days(since_days: u32) -> Self {
        Self {
            topic: None,
            since_days,
            limit: None,
        }
    }

    #[must_use]
    pub fn for_topic(mut self, topic: Option<&str>) -> Self {
        self.topic = topic.map(str::to_string);
        self
    }

    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Oldest timestamp included, relative to `now`.
    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - Duration::days(i64::from(self.since_days))
    }
}

/// Filter for behavior event reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BehaviorQuery {
    /// Only events of this type.
    pub behavior_type: Option<BehaviorType>,
    /// Trailing window in days.
    pub since_days: u32,
}

impl BehaviorQuery {
    pub fn last_days(since_days: u32) -> Self {
        Self {
            behavior_type: None,
            since_days,
        }
    }

    #[must_use]
    pub fn of_type(mut self, behavior_type: BehaviorType) -> Self {
        self.behavior_type = Some(behavior_type);
        self
    }

    /// Oldest timestamp included, relative to `now`.
    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - Duration::days(i64::from(self.since_days))
    }
}

/// Keyed storage used by every analytics component.
///
/// Implementations must:
/// - return `Ok(None)` / empty collections for absent data, never an error
/// - return events in chronological order (oldest first)
/// - treat events as immutable once logged
#[async_trait]
pub trait LearnerStore: Send + Sync {
    /// Read one competency record.
    async fn get_competency(
        &self,
        user_id: &UserId,
        topic: &str,
    ) -> Result<Option<CompetencyRecord>>;

    /// Read every competency record of a learner, ordered by topic.
    async fn get_competencies(&self, user_id: &UserId)
    -> Result<BTreeMap<String, CompetencyRecord>>;

    /// Insert or overwrite a competency record.
    async fn put_competency(
        &self,
        user_id: &UserId,
        topic: &str,
        record: &CompetencyRecord,
    ) -> Result<()>;

    /// Append a task attempt.
    async fn log_performance_event(&self, user_id: &UserId, event: &PerformanceEvent)
    -> Result<()>;

    /// Read task attempts in a trailing window.
    async fn query_performance_events(
        &self,
        user_id: &UserId,
        query: &PerformanceQuery,
    ) -> Result<Vec<PerformanceEvent>>;

    /// Append a behavior observation.
    async fn log_behavior_event(&self, user_id: &UserId, event: &BehaviorEvent) -> Result<()>;

    /// Read behavior observations in a trailing window.
    async fn query_behavior_events(
        &self,
        user_id: &UserId,
        query: &BehaviorQuery,
    ) -> Result<Vec<BehaviorEvent>>;
}

/// Open the store selected by the config.
pub async fn open_store(config: &StorageConfig) -> Result<Arc<dyn LearnerStore>> {
    match config.backend {
        StorageBackend::Memory => {
            tracing::debug!("using in-memory learner store");
            Ok(Arc::new(InMemoryLearnerStore::new()))
        }
        StorageBackend::Cozo => {
            tracing::debug!(
                engine = config.engine.as_str(),
                path = %config.path.display(),
                "opening cozo learner store"
            );
            let store = CozoLearnerStore::open(config.engine, &config.path).await?;
            Ok(Arc::new(store))
        }
    }
}

/// Sort oldest first and keep the newest `limit` events.
pub(crate) fn finish_performance(
    mut events: Vec<PerformanceEvent>,
    limit: Option<usize>,
) -> Vec<PerformanceEvent> {
    events.sort_by(|a, b| {
        a.timestamp
            .cmp(&b.timestamp)
            .then_with(|| a.event_id.cmp(&b.event_id))
    });
    if let Some(limit) = limit
        && events.len() > limit
    {
        events.drain(..events.len() - limit);
    }
    events
}

/// Sort behavior events oldest first.
pub(crate) fn finish_behavior(mut events: Vec<BehaviorEvent>) -> Vec<BehaviorEvent> {
    events.sort_by(|a, b| {
        a.timestamp
            .cmp(&b.timestamp)
            .then_with(|| a.event_id.cmp(&b.event_id))
    });
    events
}
