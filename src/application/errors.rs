//! Errors raised while building or running a simulation.

use thiserror::Error;

use crate::config::ValidationError;
use crate::domain::foundation::DomainError;
use crate::domain::transition::EngineError;
use crate::ports::{AIError, GenerationError};

#[derive(Debug, Error)]
pub enum SimulationError {
    /// Reply generation failed or timed out. The session state is unchanged
    /// apart from the turn counter.
    #[error("Turn {turn}: response generation failed: {source}")]
    Generation {
        turn: u32,
        #[source]
        source: GenerationError,
    },

    #[error("Invalid configuration: {0}")]
    Config(#[from] ValidationError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("Provider setup failed: {0}")]
    Provider(#[from] AIError),

    #[error("Scenario task failed: {0}")]
    TaskFailed(String),
}

impl From<DomainError> for SimulationError {
    fn from(err: DomainError) -> Self {
        SimulationError::Engine(EngineError::Domain(err))
    }
}
