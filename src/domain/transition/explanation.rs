//! Human-readable account of the current stage decision.

use serde::Serialize;
use std::fmt;

use crate::domain::metrics::MetricsSnapshot;

/// Why the engine sits in its current stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransitionExplanation {
    pub current_stage: String,
    /// Set when the most recent update committed a transition.
    pub transitioned_from: Option<String>,
    /// Fit of the current stage to the current metrics.
    pub stage_score: f64,
    pub metrics: MetricsSnapshot,
}

impl fmt::Display for TransitionExplanation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Current stage: {}", self.current_stage)?;
        if let Some(previous) = &self.transitioned_from {
            writeln!(f, "Transitioned from: {}", previous)?;
        }
        writeln!(f, "Stage fit: {:.2}", self.stage_score)?;
        writeln!(f, "Metrics influencing the decision:")?;
        for (id, value) in self.metrics.iter() {
            writeln!(f, "- {}: {:.2}", id, value)?;
        }
        Ok(())
    }
}
