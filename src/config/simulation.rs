//! Turn-loop policy

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Limits and termination rules for a session.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SimulationSettings {
    /// Turns allowed before the session ends itself
    #[serde(default = "default_max_turns")]
    pub max_turns: u32,

    /// Case-insensitive phrases that end the conversation when the AI says them
    #[serde(default)]
    pub end_phrases: Vec<String>,

    /// Budget for one response generation, in milliseconds
    #[serde(default = "default_turn_timeout_ms")]
    pub turn_timeout_ms: u64,

    /// Budget for one analyzer call, in milliseconds
    #[serde(default = "default_analyzer_timeout_ms")]
    pub analyzer_timeout_ms: u64,

    /// Fixed seed for stage transitions; entropy when absent
    #[serde(default)]
    pub seed: Option<u64>,
}

impl SimulationSettings {
    pub fn turn_timeout(&self) -> Duration {
        Duration::from_millis(self.turn_timeout_ms)
    }

    pub fn analyzer_timeout(&self) -> Duration {
        Duration::from_millis(self.analyzer_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_turns == 0 {
            return Err(ValidationError::InvalidMaxTurns);
        }
        if self.turn_timeout_ms == 0 {
            return Err(ValidationError::InvalidTimeout("simulation.turn_timeout_ms"));
        }
        if self.analyzer_timeout_ms == 0 {
            return Err(ValidationError::InvalidTimeout("simulation.analyzer_timeout_ms"));
        }
        Ok(())
    }
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            max_turns: default_max_turns(),
            end_phrases: Vec::new(),
            turn_timeout_ms: default_turn_timeout_ms(),
            analyzer_timeout_ms: default_analyzer_timeout_ms(),
            seed: None,
        }
    }
}

fn default_max_turns() -> u32 {
    20
}

fn default_turn_timeout_ms() -> u64 {
    120_000
}

fn default_analyzer_timeout_ms() -> u64 {
    5_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = SimulationSettings::default();
        assert_eq!(settings.max_turns, 20);
        assert!(settings.end_phrases.is_empty());
        assert_eq!(settings.turn_timeout(), Duration::from_secs(120));
        assert_eq!(settings.analyzer_timeout(), Duration::from_secs(5));
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_zero_max_turns_rejected() {
        let settings = SimulationSettings {
            max_turns: 0,
            ..Default::default()
        };
        assert_eq!(settings.validate(), Err(ValidationError::InvalidMaxTurns));
    }

    #[test]
    fn test_zero_timeouts_rejected() {
        let settings = SimulationSettings {
            analyzer_timeout_ms: 0,
            ..Default::default()
        };
        assert!(matches!(settings.validate(), Err(ValidationError::InvalidTimeout(_))));
    }
}
