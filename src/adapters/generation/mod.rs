//! Response generator adapters.

mod llm;
mod scripted;

pub use llm::LlmResponseGenerator;
pub use scripted::{ScriptedCall, ScriptedGenerator};
