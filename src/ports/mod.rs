//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the simulation core and the outside world. Adapters implement these ports.
//!
//! - `AIProvider` - LLM chat completions
//! - `ResponseGenerator` - The AI persona's reply for a turn
//! - `TurnAnalyzer` - Metric signals derived from a turn
//! - `KnowledgeRetriever` - Background passages for the prompt
//! - `SimulationObserver` - Sink for per-turn events

mod ai_provider;
mod knowledge_retriever;
mod response_generator;
mod simulation_observer;
mod turn_analyzer;

pub use ai_provider::{
    AIError, AIProvider, CompletionRequest, CompletionResponse, FinishReason, Message, MessageRole,
    ProviderInfo, RequestMetadata, TokenUsage,
};
pub use knowledge_retriever::{KnowledgeRetriever, RetrievalError};
pub use response_generator::{GenerationError, ResponseGenerator};
pub use simulation_observer::{EndReason, NullObserver, SimulationEvent, SimulationEventKind, SimulationObserver};
pub use turn_analyzer::{AnalysisInput, AnalyzerError, TurnAnalyzer};
