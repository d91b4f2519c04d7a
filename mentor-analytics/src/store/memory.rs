//! Process-local `LearnerStore`.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;

use super::{BehaviorQuery, LearnerStore, PerformanceQuery, finish_behavior, finish_performance};
use crate::error::{AnalyticsError, Result};
use crate::types::{BehaviorEvent, CompetencyRecord, PerformanceEvent, UserId};

#[derive(Debug, Default)]
struct Tables {
    competencies: HashMap<UserId, BTreeMap<String, CompetencyRecord>>,
    performance: HashMap<UserId, Vec<PerformanceEvent>>,
    behavior: HashMap<UserId, Vec<BehaviorEvent>>,
}

/// In-memory implementation, also used as the test double.
///
/// [`set_unavailable`](Self::set_unavailable) makes every call fail with
/// [`AnalyticsError::Storage`], which lets callers exercise their fallback
/// paths.
#[derive(Debug, Default)]
pub struct InMemoryLearnerStore {
    tables: RwLock<Tables>,
    unavailable: AtomicBool,
}

impl InMemoryLearnerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate a collaborator outage.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of performance events stored for a learner.
    pub fn performance_len(&self, user_id: &UserId) -> usize {
        self.tables
            .read()
            .map(|t| t.performance.get(user_id).map_or(0, Vec::len))
            .unwrap_or(0)
    }

    /// Number of behavior events stored for a learner.
    pub fn behavior_len(&self, user_id: &UserId) -> usize {
        self.tables
            .read()
            .map(|t| t.behavior.get(user_id).map_or(0, Vec::len))
            .unwrap_or(0)
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(AnalyticsError::Storage("store marked unavailable".into()))
        } else {
            Ok(())
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>> {
        self.check_available()?;
        self.tables
            .read()
            .map_err(|_| AnalyticsError::Storage("lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>> {
        self.check_available()?;
        self.tables
            .write()
            .map_err(|_| AnalyticsError::Storage("lock poisoned".into()))
    }
}

#[async_trait]
impl LearnerStore for InMemoryLearnerStore {
    async fn get_competency(
        &self,
        user_id: &UserId,
        topic: &str,
    ) -> Result<Option<CompetencyRecord>> {
        Ok(self
            .read()?
            .competencies
            .get(user_id)
            .and_then(|topics| topics.get(topic))
            .cloned())
    }

    async fn get_competencies(
        &self,
        user_id: &UserId,
    ) -> Result<BTreeMap<String, CompetencyRecord>> {
        Ok(self
            .read()?
            .competencies
            .get(user_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn put_competency(
        &self,
        user_id: &UserId,
        topic: &str,
        record: &CompetencyRecord,
    ) -> Result<()> {
        self.write()?
            .competencies
            .entry(user_id.clone())
            .or_default()
            .insert(topic.to_string(), record.clone());
        Ok(())
    }

    async fn log_performance_event(
        &self,
        user_id: &UserId,
        event: &PerformanceEvent,
    ) -> Result<()> {
        self.write()?
            .performance
            .entry(user_id.clone())
            .or_default()
            .push(event.clone());
        Ok(())
    }

    async fn query_performance_events(
        &self,
        user_id: &UserId,
        query: &PerformanceQuery,
    ) -> Result<Vec<PerformanceEvent>> {
        let cutoff = query.cutoff(Utc::now());
        let events = self
            .read()?
            .performance
            .get(user_id)
            .map(|events| {
                events
                    .iter()
                    .filter(|e| e.timestamp >= cutoff)
                    .filter(|e| query.topic.as_ref().is_none_or(|t| &e.topic == t))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(finish_performance(events, query.limit))
    }

    async fn log_behavior_event(&self, user_id: &UserId, event: &BehaviorEvent) -> Result<()> {
        self.write()?
            .behavior
            .entry(user_id.clone())
            .or_default()
            .push(event.clone());
        Ok(())
    }

    async fn query_behavior_events(
        &self,
        user_id: &UserId,
        query: &BehaviorQuery,
    ) -> Result<Vec<BehaviorEvent>> {
        let cutoff = query.cutoff(Utc::now());
        let events = self
            .read()?
            .behavior
            .get(user_id)
            .map(|events| {
                events
                    .iter()
                    .filter(|e| e.timestamp >= cutoff)
                    .filter(|e| query.behavior_type.is_none_or(|t| e.behavior_type == t))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(finish_behavior(events))
    }
}
