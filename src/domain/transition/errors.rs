//! Error types for the stage-transition engine.

use thiserror::Error;

use crate::domain::foundation::DomainError;

/// Errors raised while building or reconfiguring a [`StageTransitionEngine`](super::StageTransitionEngine).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Transition matrix must be {expected}x{expected}, got {rows} rows")]
    DimensionMismatch { expected: usize, rows: usize },

    #[error("Transition matrix row {row} is invalid: {reason}")]
    InvalidRow { row: usize, reason: String },
}

impl EngineError {
    /// Creates an invalid row error.
    pub fn invalid_row(row: usize, reason: impl Into<String>) -> Self {
        EngineError::InvalidRow {
            row,
            reason: reason.into(),
        }
    }
}
