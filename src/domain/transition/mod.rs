//! Stage-transition state machine: learned, hysteretic stage changes.

mod context;
mod engine;
mod errors;
mod explanation;
mod matrix;

pub use context::{ConversationContext, Turn};
pub use engine::{StageTransitionEngine, TransitionOutcome, HISTORY_LIMIT, LEARNING_RATE};
pub use errors::EngineError;
pub use explanation::TransitionExplanation;
pub use matrix::{TransitionMatrix, REINFORCEMENT_INCREMENT};
