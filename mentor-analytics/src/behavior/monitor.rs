//! Behavior monitor: logging, real-time interventions, long-horizon patterns.

use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use super::intervention::{InterventionSignal, evaluate};
use super::patterns::{BehaviorPatterns, ProblematicPattern, detect_problems};
use super::session::SessionRegistry;
use crate::config::BehaviorConfig;
use crate::error::Result;
use crate::performance::Recommendation;
use crate::store::{BehaviorQuery, LearnerStore};
use crate::types::{BehaviorEvent, BehaviorType, SessionId, UserId};

/// Window for behavior patterns in contexts.
pub const DEFAULT_PATTERN_DAYS: u32 = 30;

/// Window for problematic pattern detection.
pub const DEFAULT_PROBLEM_DAYS: u32 = 14;

/// Longest trailing window the session rules look at.
const MAX_WINDOW_SECS: u64 = 24 * 60 * 60;

/// Result of logging one behavior event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehaviorLogOutcome {
    /// Intervention decided from the session window, if any.
    pub signal: Option<InterventionSignal>,
    /// Whether the event reached the persistent log.
    pub persisted: bool,
}

/// Tracks learner behavior and decides when to intervene.
pub struct BehaviorMonitor {
    store: Arc<dyn LearnerStore>,
    config: BehaviorConfig,
    sessions: Mutex<SessionRegistry>,
}

impl BehaviorMonitor {
    pub fn new(store: Arc<dyn LearnerStore>, config: BehaviorConfig) -> Self {
        let sessions = Mutex::new(SessionRegistry::new(config.session.clone()));
        Self {
            store,
            config,
            sessions,
        }
    }

    /// Log an observation stamped now and evaluate interventions.
    pub async fn log_behavior(
        &self,
        user_id: &UserId,
        behavior_type: BehaviorType,
        context: serde_json::Value,
        session_id: SessionId,
    ) -> BehaviorLogOutcome {
        self.record(user_id, BehaviorEvent::new(behavior_type, context, session_id))
            .await
    }

    /// Log a prepared event and evaluate interventions.
    ///
    /// The trailing window ends at the event's own timestamp. A storage
    /// failure is reported through `persisted` and never prevents the
    /// session evaluation.
    #[instrument(
        skip(self, event),
        fields(
            mentor.user_id = %user_id,
            mentor.behavior_type = %event.behavior_type,
            mentor.session_id = %event.session_id,
        )
    )]
    pub async fn record(&self, user_id: &UserId, event: BehaviorEvent) -> BehaviorLogOutcome {
        let persisted = match self.store.log_behavior_event(user_id, &event).await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "failed to persist behavior event");
                false
            }
        };

        let now = event.timestamp;
        let window = chrono::Duration::seconds(
            self.config.intervention.window_secs.min(MAX_WINDOW_SECS) as i64,
        );
        let counts = {
            let mut sessions = self.sessions();
            sessions.push(user_id, event);
            sessions.window_counts(user_id, now, window)
        };

        let signal = evaluate(&counts, &self.config.intervention, now);
        match &signal {
            Some(signal) => info!(
                mentor.signal_type = signal.signal_type.as_str(),
                window_count = signal.trigger.window_count,
                "intervention triggered"
            ),
            None => debug!(window_total = counts.total(), "no intervention"),
        }

        BehaviorLogOutcome { signal, persisted }
    }

    /// End a learner's session (logout). Returns whether one was tracked.
    pub fn end_session(&self, user_id: &UserId) -> bool {
        let ended = self.sessions().end(user_id);
        if let Some(events) = &ended {
            debug!(user_id = %user_id, events = events.len(), "session ended");
        }
        ended.is_some()
    }

    /// Session currently tracked for a learner.
    pub fn current_session(&self, user_id: &UserId) -> Option<SessionId> {
        self.sessions().session_id(user_id).cloned()
    }

    /// Number of learners with a live session.
    pub fn active_sessions(&self) -> usize {
        self.sessions().session_count()
    }

    /// Frequency-weighted behavior counts over the trailing `days`.
    pub async fn get_behavior_patterns(
        &self,
        user_id: &UserId,
        days: u32,
    ) -> Result<BehaviorPatterns> {
        let events = self
            .store
            .query_behavior_events(user_id, &BehaviorQuery::last_days(days))
            .await?;
        Ok(BehaviorPatterns::from_events(&events))
    }

    /// Recurring problems over the trailing `days`, highest severity first.
    #[instrument(skip(self), fields(mentor.user_id = %user_id, mentor.window_days = days))]
    pub async fn identify_problematic_patterns(
        &self,
        user_id: &UserId,
        days: u32,
    ) -> Result<Vec<ProblematicPattern>> {
        let patterns = self.get_behavior_patterns(user_id, days).await?;
        let problems = detect_problems(&patterns, &self.config.patterns);
        debug!(problems = problems.len(), "problematic patterns identified");
        Ok(problems)
    }

    /// One recommendation per problematic pattern.
    pub async fn get_behavior_recommendations(
        &self,
        user_id: &UserId,
        days: u32,
    ) -> Result<Vec<Recommendation>> {
        let problems = self.identify_problematic_patterns(user_id, days).await?;
        Ok(problems.iter().map(ProblematicPattern::recommendation).collect())
    }

    fn sessions(&self) -> MutexGuard<'_, SessionRegistry> {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl std::fmt::Debug for BehaviorMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BehaviorMonitor")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
