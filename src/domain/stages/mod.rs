//! Stages: named conversation phases scored against metrics.

mod manager;
mod stage;

pub use manager::StageManager;
pub use stage::{ConditionRange, Stage, StageDefinition};
