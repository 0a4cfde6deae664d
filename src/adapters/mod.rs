//! Adapters - Implementations of port interfaces.
//!
//! - `ai` - LLM providers (OpenAI-compatible, mock)
//! - `generation` - Response generators (scripted, LLM-backed)
//! - `analyzers` - Reference turn analyzers
//! - `knowledge` - Knowledge retrievers
//! - `observers` - Simulation event sinks

pub mod ai;
pub mod analyzers;
pub mod generation;
pub mod knowledge;
pub mod observers;
