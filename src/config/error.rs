//! Configuration error types

use thiserror::Error;

use crate::domain::foundation::DomainError;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Failed to read {path}: {source}")]
    ReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration parsing failed: {0}")]
    ParseError(#[from] serde_yaml::Error),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("At least one metric must be configured")]
    NoMetrics,

    #[error("At least one stage must be configured")]
    NoStages,

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Initial stage '{0}' is not a configured stage")]
    UnknownInitialStage(String),

    #[error("max_turns must be greater than zero")]
    InvalidMaxTurns,

    #[error("Invalid timeout: {0} must be greater than zero")]
    InvalidTimeout(&'static str),

    #[error("Custom metric '{0}' needs keywords or a regex")]
    CustomMetricWithoutMatcher(String),

    #[error("Custom metric '{metric}' has an invalid regex: {message}")]
    InvalidRegex { metric: String, message: String },

    #[error("Custom metric '{metric}' has invalid weight or max")]
    InvalidCustomMetricScale { metric: String },

    #[error("Long-term analyzer window must be at least 2")]
    InvalidTrendWindow,

    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Temperature must be between 0 and 2")]
    InvalidTemperature,

    #[error("knowledge.top_k must be greater than zero")]
    InvalidKnowledgeTopK,

    #[error("Knowledge entry {0} needs a topic and text")]
    IncompleteKnowledgeEntry(usize),
}
