//! CozoDB-backed learner store
//!
//! Wraps an embedded CozoDB instance (`mem` or `rocksdb` engine). The schema
//! is created on open and versioned through [`MIGRATIONS`].

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cozo::{DataValue, DbInstance, NamedRows, ScriptMutability};

use super::schema::{MIGRATIONS, Migration};
use super::{BehaviorQuery, LearnerStore, PerformanceQuery, finish_behavior, finish_performance};
use crate::config::CozoEngine;
use crate::error::{AnalyticsError, Result};
use crate::types::{BehaviorEvent, CompetencyRecord, PerformanceEvent, UserId};

/// CozoDB-backed learner store
pub struct CozoLearnerStore {
    db: Arc<DbInstance>,
}

impl CozoLearnerStore {
    /// Open or create a learner database.
    ///
    /// `path` is ignored by the `mem` engine.
    pub async fn open(engine: CozoEngine, path: &Path) -> Result<Self> {
        if engine == CozoEngine::Rocksdb {
            std::fs::create_dir_all(path).map_err(|e| {
                AnalyticsError::Storage(format!("Failed to create directory: {e}"))
            })?;
        }

        let db = DbInstance::new(engine.as_str(), path, "")
            .map_err(|e| AnalyticsError::Storage(format!("Failed to open database: {e}")))?;

        let store = Self { db: Arc::new(db) };
        store.ensure_schema().await?;
        Ok(store)
    }

    /// Fresh in-memory database.
    pub async fn in_memory() -> Result<Self> {
        Self::open(CozoEngine::Mem, Path::new("")).await
    }

    /// Get current schema version from database
    pub async fn get_schema_version(&self) -> Result<u32> {
        let query = "?[version] := *mentor_schema_version{version}";

        match self.run_query(query, BTreeMap::new()).await {
            Ok(rows) => Ok(rows
                .rows
                .iter()
                .filter_map(|row| row.first().and_then(DataValue::get_int))
                .max()
                .map_or(0, |v| v as u32)),
            Err(e) => {
                // Relation does not exist before the first migration
                let msg = e.to_string();
                if msg.contains("not found") || msg.contains("Cannot find") {
                    Ok(0)
                } else {
                    Err(e)
                }
            }
        }
    }

    async fn ensure_schema(&self) -> Result<()> {
        let current = self.get_schema_version().await?;

        for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
            self.apply_migration(migration).await?;
        }

        Ok(())
    }

    async fn apply_migration(&self, migration: &Migration) -> Result<()> {
        self.db
            .run_script(migration.script, BTreeMap::new(), ScriptMutability::Mutable)
            .map_err(|e| {
                AnalyticsError::Schema(format!("Migration {} failed: {e}", migration.version))
            })?;

        let params = BTreeMap::from([
            ("version".to_string(), DataValue::from(i64::from(migration.version))),
            ("applied_at".to_string(), DataValue::from(Utc::now().timestamp())),
            ("description".to_string(), DataValue::from(migration.description)),
        ]);
        self.db
            .run_script(
                "?[version, applied_at, description] <- [[$version, $applied_at, $description]]
                 :put mentor_schema_version {version => applied_at, description}",
                params,
                ScriptMutability::Mutable,
            )
            .map_err(|e| {
                AnalyticsError::Schema(format!(
                    "Failed to record migration {}: {e}",
                    migration.version
                ))
            })?;

        tracing::debug!(version = migration.version, "applied learner schema migration");
        Ok(())
    }

    /// Run a query and return results
    async fn run_query(
        &self,
        query: &str,
        params: BTreeMap<String, DataValue>,
    ) -> Result<NamedRows> {
        self.db
            .run_script(query, params, ScriptMutability::Immutable)
            .map_err(|e| AnalyticsError::Storage(format!("Query failed: {e}")))
    }

    /// Run a mutation query
    async fn run_mutation(
        &self,
        query: &str,
        params: BTreeMap<String, DataValue>,
    ) -> Result<NamedRows> {
        self.db
            .run_script(query, params, ScriptMutability::Mutable)
            .map_err(|e| AnalyticsError::Storage(format!("Mutation failed: {e}")))
    }
}

fn param(name: &str, value: impl Into<DataValue>) -> (String, DataValue) {
    (name.to_string(), value.into())
}

fn json_column<'a>(row: &'a [DataValue], idx: usize, name: &str) -> Result<&'a str> {
    row.get(idx)
        .and_then(DataValue::get_str)
        .ok_or_else(|| AnalyticsError::Storage(format!("Invalid {name}")))
}

fn millis(ts: DateTime<Utc>) -> i64 {
    ts.timestamp_millis()
}

#[async_trait]
impl LearnerStore for CozoLearnerStore {
    async fn get_competency(
        &self,
        user_id: &UserId,
        topic: &str,
    ) -> Result<Option<CompetencyRecord>> {
        let query = r#"
            ?[record_json] :=
            *competency{user_id, topic, record_json},
            user_id = $user_id,
            topic = $topic
        "#;
        let params = BTreeMap::from([
            param("user_id", user_id.as_str()),
            param("topic", topic),
        ]);

        let rows = self.run_query(query, params).await?;
        match rows.rows.first() {
            Some(row) => Ok(Some(serde_json::from_str(json_column(row, 0, "record_json")?)?)),
            None => Ok(None),
        }
    }

    async fn get_competencies(
        &self,
        user_id: &UserId,
    ) -> Result<BTreeMap<String, CompetencyRecord>> {
        let query = r#"
            ?[topic, record_json] :=
            *competency{user_id, topic, record_json},
            user_id = $user_id
        "#;
        let params = BTreeMap::from([param("user_id", user_id.as_str())]);

        let rows = self.run_query(query, params).await?;
        let mut records = BTreeMap::new();
        for row in &rows.rows {
            let topic = json_column(row, 0, "topic")?;
            let record = serde_json::from_str(json_column(row, 1, "record_json")?)?;
            records.insert(topic.to_string(), record);
        }
        Ok(records)
    }

    async fn put_competency(
        &self,
        user_id: &UserId,
        topic: &str,
        record: &CompetencyRecord,
    ) -> Result<()> {
        let query = r#"
            ?[user_id, topic, overall_level, record_json, updated_at] <- [[
                $user_id, $topic, $overall_level, $record_json, $updated_at
            ]]
            :put competency {
                user_id, topic =>
                overall_level, record_json, updated_at
            }
        "#;
        let params = BTreeMap::from([
            param("user_id", user_id.as_str()),
            param("topic", topic),
            param("overall_level", i64::from(record.overall_level)),
            param("record_json", serde_json::to_string(record)?.as_str()),
            param("updated_at", millis(record.last_practiced)),
        ]);

        self.run_mutation(query, params).await?;
        Ok(())
    }

    async fn log_performance_event(
        &self,
        user_id: &UserId,
        event: &PerformanceEvent,
    ) -> Result<()> {
        let query = r#"
            ?[user_id, event_id, topic, success, ts, event_json] <- [[
                $user_id, $event_id, $topic, $success, $ts, $event_json
            ]]
            :put performance_event {
                user_id, event_id =>
                topic, success, ts, event_json
            }
        "#;
        let params = BTreeMap::from([
            param("user_id", user_id.as_str()),
            param("event_id", event.event_id.to_string().as_str()),
            param("topic", event.topic.as_str()),
            (String::from("success"), DataValue::Bool(event.success)),
            param("ts", millis(event.timestamp)),
            param("event_json", serde_json::to_string(event)?.as_str()),
        ]);

        self.run_mutation(query, params).await?;
        Ok(())
    }

    async fn query_performance_events(
        &self,
        user_id: &UserId,
        query: &PerformanceQuery,
    ) -> Result<Vec<PerformanceEvent>> {
        let mut params = BTreeMap::from([
            param("user_id", user_id.as_str()),
            param("since", millis(query.cutoff(Utc::now()))),
        ]);
        let topic_filter = match &query.topic {
            Some(topic) => {
                params.insert("topic".to_string(), DataValue::from(topic.as_str()));
                ", topic = $topic"
            }
            None => "",
        };
        let script = format!(
            r#"
            ?[event_json] :=
            *performance_event{{user_id, topic, ts, event_json}},
            user_id = $user_id,
            ts >= $since{topic_filter}
            "#
        );

        let rows = self.run_query(&script, params).await?;
        let events = rows
            .rows
            .iter()
            .map(|row| Ok(serde_json::from_str(json_column(row, 0, "event_json")?)?))
            .collect::<Result<Vec<PerformanceEvent>>>()?;
        Ok(finish_performance(events, query.limit))
    }

    async fn log_behavior_event(&self, user_id: &UserId, event: &BehaviorEvent) -> Result<()> {
        let query = r#"
            ?[user_id, event_id, behavior_type, storage_key, ts, event_json] <- [[
                $user_id, $event_id, $behavior_type, $storage_key, $ts, $event_json
            ]]
            :put behavior_event {
                user_id, event_id =>
                behavior_type, storage_key, ts, event_json
            }
        "#;
        let params = BTreeMap::from([
            param("user_id", user_id.as_str()),
            param("event_id", event.event_id.to_string().as_str()),
            param("behavior_type", event.behavior_type.as_str()),
            param("storage_key", event.storage_key().as_str()),
            param("ts", millis(event.timestamp)),
            param("event_json", serde_json::to_string(event)?.as_str()),
        ]);

        self.run_mutation(query, params).await?;
        Ok(())
    }

    async fn query_behavior_events(
        &self,
        user_id: &UserId,
        query: &BehaviorQuery,
    ) -> Result<Vec<BehaviorEvent>> {
        let mut params = BTreeMap::from([
            param("user_id", user_id.as_str()),
            param("since", millis(query.cutoff(Utc::now()))),
        ]);
        let type_filter = match query.behavior_type {
            Some(behavior_type) => {
                params.insert(
                    "behavior_type".to_string(),
                    DataValue::from(behavior_type.as_str()),
                );
                ", behavior_type = $behavior_type"
            }
            None => "",
        };
        let script = format!(
            r#"
            ?[event_json] :=
            *behavior_event{{user_id, behavior_type, ts, event_json}},
            user_id = $user_id,
            ts >= $since{type_filter}
            "#
        );

        let rows = self.run_query(&script, params).await?;
        let events = rows
            .rows
            .iter()
            .map(|row| Ok(serde_json::from_str(json_column(row, 0, "event_json")?)?))
            .collect::<Result<Vec<BehaviorEvent>>>()?;
        Ok(finish_behavior(events))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BehaviorType, Difficulty, SessionId, TaskOutcome};
    use chrono::Duration;
    use serde_json::json;

    fn user() -> UserId {
        UserId::from("learner-1")
    }

    #[tokio::test]
    async fn test_schema_is_versioned() {
        let store = CozoLearnerStore::in_memory().await.unwrap();
        assert_eq!(
            store.get_schema_version().await.unwrap(),
            crate::store::CURRENT_SCHEMA_VERSION
        );
    }

    #[tokio::test]
    async fn test_competency_crud() {
        let store = CozoLearnerStore::in_memory().await.unwrap();
        assert!(store.get_competency(&user(), "algebra").await.unwrap().is_none());

        let mut record = CompetencyRecord::new(Utc::now());
        record.sub_topics.insert("it's quadratic".into(), 4.0);
        store.put_competency(&user(), "algebra", &record).await.unwrap();
        store.put_competency(&user(), "geometry", &record).await.unwrap();

        let stored = store.get_competency(&user(), "algebra").await.unwrap().unwrap();
        assert_eq!(stored, record);

        let all = store.get_competencies(&user()).await.unwrap();
        assert_eq!(all.keys().collect::<Vec<_>>(), vec!["algebra", "geometry"]);

        let other = store.get_competencies(&UserId::from("someone-else")).await.unwrap();
        assert!(other.is_empty());
    }

    #[tokio::test]
    async fn test_performance_events_window_and_topic() {
        let store = CozoLearnerStore::in_memory().await.unwrap();
        let now = Utc::now();
        let outcome = TaskOutcome::new(true, 12.0).with_difficulty(Difficulty::Hard);

        for (topic, age) in [("algebra", 3), ("algebra", 1), ("geometry", 2), ("algebra", 40)] {
            let event =
                PerformanceEvent::from_outcome_at(topic, &outcome, now - Duration::days(age));
            store.log_performance_event(&user(), &event).await.unwrap();
        }

        let algebra = store
            .query_performance_events(
                &user(),
                &PerformanceQuery::last_days(30).for_topic(Some("algebra")),
            )
            .await
            .unwrap();
        assert_eq!(algebra.len(), 2);
        assert!(algebra[0].timestamp < algebra[1].timestamp);
        assert_eq!(algebra[0].difficulty, Difficulty::Hard);

        let newest = store
            .query_performance_events(&user(), &PerformanceQuery::last_days(30).with_limit(1))
            .await
            .unwrap();
        assert_eq!(newest.len(), 1);
        assert_eq!(newest[0].topic, "algebra");
    }

    #[tokio::test]
    async fn test_behavior_events_by_type() {
        let store = CozoLearnerStore::in_memory().await.unwrap();
        let session = SessionId::from("s-1");

        for t in [
            BehaviorType::TaskAbandon,
            BehaviorType::HintRequest,
            BehaviorType::TaskAbandon,
        ] {
            let event = BehaviorEvent::new(t, json!({"task": "t-9"}), session.clone());
            store.log_behavior_event(&user(), &event).await.unwrap();
        }

        let abandons = store
            .query_behavior_events(
                &user(),
                &BehaviorQuery::last_days(1).of_type(BehaviorType::TaskAbandon),
            )
            .await
            .unwrap();
        assert_eq!(abandons.len(), 2);
        assert_eq!(abandons[0].context["task"], "t-9");

        let all = store
            .query_behavior_events(&user(), &BehaviorQuery::last_days(1))
            .await
            .unwrap();
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn test_reopen_rocksdb_keeps_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("learners");

        {
            let store = CozoLearnerStore::open(CozoEngine::Rocksdb, &path).await.unwrap();
            let record = CompetencyRecord::new(Utc::now());
            store.put_competency(&user(), "calculus", &record).await.unwrap();
        }

        let reopened = CozoLearnerStore::open(CozoEngine::Rocksdb, &path).await.unwrap();
        assert!(reopened.get_competency(&user(), "calculus").await.unwrap().is_some());
    }
}
