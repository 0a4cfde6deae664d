//! Error types for the domain layer.

use thiserror::Error;

/// Errors raised while constructing or mutating domain objects.
///
/// Every variant is a construction-time problem: a session whose metrics or
/// stages fail these checks is never created.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DomainError {
    #[error("Field '{field}' cannot be empty")]
    EmptyField { field: String },

    #[error("Metric '{metric}' has min {min} which is not below max {max}")]
    InvalidBounds { metric: String, min: f64, max: f64 },

    #[error("Metric '{metric}' starts at {value}, outside [{min}, {max}]")]
    InitialOutOfRange {
        metric: String,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Metric '{metric}' has decay factor {value}; expected a value in (0, 1]")]
    InvalidDecayFactor { metric: String, value: f64 },

    #[error("Stage '{stage}' declares condition on '{metric}' with min {min} above max {max}")]
    InvalidCondition {
        stage: String,
        metric: String,
        min: f64,
        max: f64,
    },

    #[error("Duplicate metric id: {0}")]
    DuplicateMetric(String),

    #[error("Duplicate stage id: {0}")]
    DuplicateStage(String),

    #[error("At least one stage is required")]
    NoStages,

    #[error("Unknown stage: {0}")]
    UnknownStage(String),
}

impl DomainError {
    /// Creates an empty field error.
    pub fn empty_field(field: impl Into<String>) -> Self {
        DomainError::EmptyField {
            field: field.into(),
        }
    }

    /// Creates an invalid bounds error.
    pub fn invalid_bounds(metric: impl Into<String>, min: f64, max: f64) -> Self {
        DomainError::InvalidBounds {
            metric: metric.into(),
            min,
            max,
        }
    }

    /// Creates an invalid condition error.
    pub fn invalid_condition(
        stage: impl Into<String>,
        metric: impl Into<String>,
        min: f64,
        max: f64,
    ) -> Self {
        DomainError::InvalidCondition {
            stage: stage.into(),
            metric: metric.into(),
            min,
            max,
        }
    }
}
