//! Observability infrastructure for mentor.
//!
//! Global tracing subscriber setup driven by [`TracingConfig`].

pub mod tracer;

pub use tracer::{LogFormat, ObserveError, TracingConfig, build_filter, init_tracing};
