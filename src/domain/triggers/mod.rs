//! Metric-threshold triggers that end or redirect a conversation.

mod condition;
mod trigger;

pub use condition::{ComparisonOp, TriggerCondition};
pub use trigger::{first_fired, Trigger};
