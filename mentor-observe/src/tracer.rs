//! Tracing setup and configuration.
//!
//! This module provides:
//! - Global subscriber initialization with an env filter
//! - Output format selection (pretty, compact, json)

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Registry;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Output format for log records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Multi-line human readable output.
    Pretty,
    /// Single-line human readable output.
    #[default]
    Compact,
    /// Newline-delimited JSON.
    Json,
}

/// Configuration for the global subscriber.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TracingConfig {
    /// Default filter directive, e.g. `info` or `mentor_analytics=debug`.
    pub level: String,
    /// Output format.
    pub format: LogFormat,
    /// Whether `RUST_LOG` overrides `level` when set.
    pub respect_env: bool,
    /// Include span close events (with timings) in the output.
    pub span_events: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
            respect_env: true,
            span_events: false,
        }
    }
}

/// Error type for tracer initialization.
#[derive(Debug, thiserror::Error)]
pub enum ObserveError {
    /// The filter directive could not be parsed.
    #[error("invalid log filter '{directive}': {reason}")]
    InvalidFilter { directive: String, reason: String },

    /// Failed to set global subscriber.
    #[error("failed to set global subscriber: {0}")]
    SetGlobalSubscriber(#[from] tracing_subscriber::util::TryInitError),
}

/// Build the env filter for a config.
///
/// `RUST_LOG` wins over the configured level when `respect_env` is set and
/// the variable is present.
pub fn build_filter(config: &TracingConfig) -> Result<EnvFilter, ObserveError> {
    if config.respect_env
        && let Ok(from_env) = EnvFilter::try_from_default_env()
    {
        return Ok(from_env);
    }

    EnvFilter::try_new(&config.level).map_err(|e| ObserveError::InvalidFilter {
        directive: config.level.clone(),
        reason: e.to_string(),
    })
}

/// Initialize the global tracing subscriber.
///
/// # Errors
///
/// Returns an error if the filter is invalid or a global subscriber has
/// already been set.
pub fn init_tracing(config: &TracingConfig) -> Result<(), ObserveError> {
    use tracing_subscriber::fmt::format::FmtSpan;

    let filter = build_filter(config)?;
    let span_events = if config.span_events {
        FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let registry = Registry::default().with(filter);

    match config.format {
        LogFormat::Pretty => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_span_events(span_events),
            )
            .try_init()?,
        LogFormat::Compact => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .compact()
                    .with_span_events(span_events),
            )
            .try_init()?,
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_events(span_events),
            )
            .try_init()?,
    }

    Ok(())
}
