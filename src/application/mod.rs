//! Application layer - Turn orchestration and session wiring.
//!
//! The orchestrator sequences one turn across the ports: reply generation,
//! analysis, engine update, trigger and end-phrase checks. Session helpers
//! build orchestrators from a validated configuration, and the scenario
//! runner plays scripted conversations in parallel.

mod errors;
mod orchestrator;
mod record;
mod scenario;
mod session;

pub use errors::SimulationError;
pub use orchestrator::TurnOrchestrator;
pub use record::{TurnOutcome, TurnRecord, CONVERSATION_ENDED_MARKER, MAX_TURNS_MESSAGE};
pub use scenario::{Scenario, ScenarioReport, ScenarioRunner, ScriptedTurn};
pub use session::{build_analyzers, build_engine, llm_generator, SessionBuilder};
