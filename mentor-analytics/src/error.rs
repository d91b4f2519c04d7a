//! Error types for mentor-analytics

use thiserror::Error;

/// Error type for analytics operations.
///
/// "No data" is never an error: lookups return `Ok(None)`, an empty
/// collection, or an explicit insufficient-data value. Only collaborator
/// failures and configuration problems surface here.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// The storage collaborator failed to read or write.
    #[error("Storage unavailable: {0}")]
    Storage(String),

    /// Schema creation for an embedded store failed.
    #[error("Schema initialization failed: {0}")]
    Schema(String),

    /// A stored row or config value could not be decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration could not be loaded or is invalid.
    #[error("Config error: {0}")]
    Config(String),

    /// Tracing subscriber could not be installed.
    #[error("Logging setup failed: {0}")]
    Observe(#[from] mentor_observe::ObserveError),

    /// IO operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AnalyticsError {
    /// Whether the error came from the storage collaborator.
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Storage(_) | Self::Schema(_))
    }
}

impl From<serde_json::Error> for AnalyticsError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

/// Result type alias for analytics operations
pub type Result<T> = std::result::Result<T, AnalyticsError>;
