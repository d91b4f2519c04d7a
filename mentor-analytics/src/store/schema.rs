//! CozoDB schema definitions for the learner store.

/// Current schema version
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// Initial schema creation script (Datalog)
///
/// Records and events are stored as JSON next to the columns queries filter
/// on, so the Rust types stay the single source of truth for their shape.
pub const INITIAL_SCHEMA: &str = r#"
{
    :create mentor_schema_version {
        version: Int =>
        applied_at: Int,
        description: String
    }
}
{
    :create competency {
        user_id: String,
        topic: String =>
        overall_level: Int,
        record_json: String,
        updated_at: Int
    }
}
{
    :create performance_event {
        user_id: String,
        event_id: String =>
        topic: String,
        success: Bool,
        ts: Int,
        event_json: String
    }
}
{
    :create behavior_event {
        user_id: String,
        event_id: String =>
        behavior_type: String,
        storage_key: String,
        ts: Int,
        event_json: String
    }
}
{
    ::index create performance_event:by_time { user_id, ts }
}
{
    ::index create behavior_event:by_type { user_id, behavior_type }
}
"#;

/// Schema migration definition
#[derive(Debug, Clone)]
pub struct Migration {
    /// Version number for this migration
    pub version: u32,
    /// Human-readable description of what this migration does
    pub description: &'static str,
    /// The Datalog script to execute for this migration
    pub script: &'static str,
}

/// All migrations in order
pub static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    description: "Initial learner schema",
    script: INITIAL_SCHEMA,
}];
