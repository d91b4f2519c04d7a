//! In-memory learner sessions for real-time rule evaluation.
//!
//! One session per learner, keyed by [`UserId`]:
//!
//! - `max_events_per_session`: ring buffer per session (old events evicted)
//! - `max_sessions`: learners tracked at once (LRU eviction)
//! - `idle_ttl_secs`: sessions idle longer than this are dropped
//!
//! An event carrying a different [`SessionId`] than the tracked one starts a
//! fresh session. Nothing here is persisted.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use super::intervention::WindowCounts;
use crate::config::SessionConfig;
use crate::types::{BehaviorEvent, SessionId, UserId};

#[derive(Debug)]
struct SessionEntry {
    session_id: SessionId,
    events: VecDeque<BehaviorEvent>,
    last_access: Instant,
}

impl SessionEntry {
    fn new(session_id: SessionId) -> Self {
        Self {
            session_id,
            events: VecDeque::new(),
            last_access: Instant::now(),
        }
    }

    fn touch(&mut self) {
        self.last_access = Instant::now();
    }
}

/// Bounded registry of live learner sessions.
pub struct SessionRegistry {
    config: SessionConfig,
    sessions: HashMap<UserId, SessionEntry>,
}

impl SessionRegistry {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            sessions: HashMap::new(),
        }
    }

    /// Record an event in the learner's session.
    ///
    /// Drops idle sessions first, then creates or resets the learner's
    /// session as needed, evicting the least recently used learner when the
    /// registry is full.
    pub fn push(&mut self, user_id: &UserId, event: BehaviorEvent) {
        self.evict_idle();

        let reset = self
            .sessions
            .get(user_id)
            .is_some_and(|entry| entry.session_id != event.session_id);
        if reset {
            tracing::debug!(user_id = %user_id, session_id = %event.session_id, "session changed, starting fresh");
            self.sessions.remove(user_id);
        }

        if !self.sessions.contains_key(user_id) && self.sessions.len() >= self.config.max_sessions.max(1)
        {
            self.evict_lru();
        }

        let entry = self
            .sessions
            .entry(user_id.clone())
            .or_insert_with(|| SessionEntry::new(event.session_id.clone()));
        entry.touch();

        // Ring buffer: remove oldest if at capacity
        if entry.events.len() >= self.config.max_events_per_session.max(1) {
            entry.events.pop_front();
        }

        entry.events.push_back(event);
    }

    /// Weighted counts of session events in `(until - window, until]`.
    pub fn window_counts(
        &self,
        user_id: &UserId,
        until: DateTime<Utc>,
        window: chrono::Duration,
    ) -> WindowCounts {
        let start = until - window;
        let mut counts = WindowCounts::default();
        if let Some(entry) = self.sessions.get(user_id) {
            entry
                .events
                .iter()
                .filter(|e| e.timestamp > start && e.timestamp <= until)
                .for_each(|e| counts.add(e.behavior_type, e.frequency));
        }
        counts
    }

    /// Session currently tracked for a learner.
    pub fn session_id(&self, user_id: &UserId) -> Option<&SessionId> {
        self.sessions.get(user_id).map(|e| &e.session_id)
    }

    /// Number of events buffered for a learner.
    pub fn len(&self, user_id: &UserId) -> usize {
        self.sessions.get(user_id).map_or(0, |e| e.events.len())
    }

    /// Number of learners being tracked.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// End a learner's session, returning its buffered events.
    pub fn end(&mut self, user_id: &UserId) -> Option<Vec<BehaviorEvent>> {
        self.sessions
            .remove(user_id)
            .map(|e| e.events.into_iter().collect())
    }

    fn evict_idle(&mut self) {
        let ttl = Duration::from_secs(self.config.idle_ttl_secs);
        self.sessions
            .retain(|_, entry| entry.last_access.elapsed() < ttl);
    }

    /// Evict the least recently used session.
    fn evict_lru(&mut self) {
        if let Some(lru) = self
            .sessions
            .iter()
            .min_by_key(|(_, entry)| entry.last_access)
            .map(|(user_id, _)| user_id.clone())
        {
            tracing::debug!(user_id = %lru, "evicting least recently used session");
            self.sessions.remove(&lru);
        }
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field(
                "max_events_per_session",
                &self.config.max_events_per_session,
            )
            .field("max_sessions", &self.config.max_sessions)
            .field("session_count", &self.sessions.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BehaviorType;
    use serde_json::json;

    fn event(session: &str, behavior_type: BehaviorType, at: DateTime<Utc>) -> BehaviorEvent {
        BehaviorEvent::at(behavior_type, json!({}), SessionId::from(session), at)
    }

    #[test]
    fn test_registry_collects_events() {
        let mut registry = SessionRegistry::default();
        let user = UserId::from("u1");
        let now = Utc::now();

        registry.push(&user, event("s1", BehaviorType::HintRequest, now));
        registry.push(&user, event("s1", BehaviorType::SolutionRequest, now));

        assert_eq!(registry.len(&user), 2);
        assert_eq!(registry.session_id(&user), Some(&SessionId::from("s1")));
    }

    #[test]
    fn test_per_session_limit() {
        let config = SessionConfig {
            max_events_per_session: 3,
            ..SessionConfig::default()
        };
        let mut registry = SessionRegistry::new(config);
        let user = UserId::from("u1");

        for _ in 0..5 {
            registry.push(&user, event("s1", BehaviorType::TaskRepeat, Utc::now()));
        }

        // Should only have the last 3 events
        assert_eq!(registry.len(&user), 3);
    }

    #[test]
    fn test_lru_eviction() {
        let config = SessionConfig {
            max_sessions: 2,
            ..SessionConfig::default()
        };
        let mut registry = SessionRegistry::new(config);
        let (a, b, c) = (UserId::from("a"), UserId::from("b"), UserId::from("c"));

        registry.push(&a, event("s", BehaviorType::HintRequest, Utc::now()));
        std::thread::sleep(Duration::from_millis(5));
        registry.push(&b, event("s", BehaviorType::HintRequest, Utc::now()));
        std::thread::sleep(Duration::from_millis(5));
        registry.push(&c, event("s", BehaviorType::HintRequest, Utc::now()));

        assert_eq!(registry.session_count(), 2);
        assert_eq!(registry.len(&a), 0);
        assert_eq!(registry.len(&c), 1);
    }

    #[test]
    fn test_new_session_id_starts_fresh() {
        let mut registry = SessionRegistry::default();
        let user = UserId::from("u1");

        registry.push(&user, event("s1", BehaviorType::SolutionRequest, Utc::now()));
        registry.push(&user, event("s1", BehaviorType::SolutionRequest, Utc::now()));
        registry.push(&user, event("s2", BehaviorType::SolutionRequest, Utc::now()));

        assert_eq!(registry.len(&user), 1);
        assert_eq!(registry.session_id(&user), Some(&SessionId::from("s2")));
    }

    #[test]
    fn test_idle_sessions_are_dropped() {
        let config = SessionConfig {
            idle_ttl_secs: 0,
            ..SessionConfig::default()
        };
        let mut registry = SessionRegistry::new(config);
        let (a, b) = (UserId::from("a"), UserId::from("b"));

        registry.push(&a, event("s", BehaviorType::HintRequest, Utc::now()));
        registry.push(&b, event("s", BehaviorType::HintRequest, Utc::now()));

        assert_eq!(registry.session_count(), 1);
        assert_eq!(registry.len(&a), 0);
    }

    #[test]
    fn test_window_counts_respect_bounds() {
        let mut registry = SessionRegistry::default();
        let user = UserId::from("u1");
        let now = Utc::now();
        let window = chrono::Duration::minutes(10);

        registry.push(&user, event("s1", BehaviorType::SolutionRequest, now - chrono::Duration::minutes(15)));
        registry.push(&user, event("s1", BehaviorType::SolutionRequest, now - chrono::Duration::minutes(5)));
        registry.push(
            &user,
            event("s1", BehaviorType::TaskAbandon, now).with_frequency(2),
        );

        let counts = registry.window_counts(&user, now, window);
        assert_eq!(counts.count(BehaviorType::SolutionRequest), 1);
        assert_eq!(counts.count(BehaviorType::TaskAbandon), 2);
        assert_eq!(counts.total(), 3);
    }

    #[test]
    fn test_end_session() {
        let mut registry = SessionRegistry::default();
        let user = UserId::from("u1");
        registry.push(&user, event("s1", BehaviorType::HintRequest, Utc::now()));

        let drained = registry.end(&user).unwrap();
        assert_eq!(drained.len(), 1);
        assert_eq!(registry.session_count(), 0);
        assert!(registry.end(&user).is_none());
    }
}
