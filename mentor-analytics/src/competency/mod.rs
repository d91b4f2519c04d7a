//! Competency model: per-topic and per-sub-topic mastery.
//!
//! Records are created lazily on the first update for a topic, start at the
//! neutral level 3, and are only ever overwritten. The overall level moves
//! by at most one step per task.

mod locks;
mod model;
pub mod scoring;

pub use locks::KeyedLocks;
pub use model::{
    AreaReport, CompetencyModel, PracticeReason, PracticeRecommendation, SubTopicArea, TopicArea,
};
