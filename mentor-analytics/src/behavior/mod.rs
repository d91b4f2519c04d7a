//! Behavior monitor: event logging and intervention decisions.
//!
//! Every behavior event goes to the persistent log and to the learner's
//! in-memory session. Interventions are decided from the session alone, over
//! a trailing window ending at the new event, so a storage outage never
//! silences them. Long-horizon patterns are read back from the log.

mod intervention;
mod monitor;
mod patterns;
mod session;

pub use intervention::{
    InterventionRule, InterventionSignal, SignalTrigger, SignalType, WindowCounts, evaluate,
};
pub use monitor::{BehaviorLogOutcome, BehaviorMonitor, DEFAULT_PATTERN_DAYS, DEFAULT_PROBLEM_DAYS};
pub use patterns::{BehaviorPatterns, PatternKind, ProblematicPattern, detect_problems};
pub use session::SessionRegistry;
