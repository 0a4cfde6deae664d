//! Turn analyzer port: turns a completed exchange into metric signals.

use async_trait::async_trait;

use crate::domain::analysis::AnalyzerOutput;
use crate::domain::metrics::MetricsSnapshot;

/// Everything an analyzer may look at for one turn.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisInput {
    /// 1-based turn number.
    pub turn: u32,
    pub user_text: String,
    pub ai_text: String,
    /// Active stage before the turn is applied.
    pub stage_id: String,
    /// Metric values before the turn is applied.
    pub metrics: MetricsSnapshot,
}

/// Derives metric signals from a turn.
///
/// Analyzers may keep state across turns (`&mut self`). An error drops this
/// analyzer's contribution for the turn only.
#[async_trait]
pub trait TurnAnalyzer: Send {
    /// Stable name used in logs and observer events.
    fn name(&self) -> &str;

    async fn analyze(&mut self, input: &AnalysisInput) -> Result<AnalyzerOutput, AnalyzerError>;
}

/// Analyzer failures. Never fatal for a turn.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AnalyzerError {
    #[error("{analyzer}: {feature} is not implemented")]
    NotImplemented { analyzer: String, feature: String },

    #[error("{analyzer} failed: {message}")]
    Failed { analyzer: String, message: String },

    #[error("{analyzer} timed out after {timeout_ms}ms")]
    Timeout { analyzer: String, timeout_ms: u64 },
}

impl AnalyzerError {
    pub fn not_implemented(analyzer: impl Into<String>, feature: impl Into<String>) -> Self {
        Self::NotImplemented {
            analyzer: analyzer.into(),
            feature: feature.into(),
        }
    }

    pub fn failed(analyzer: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Failed {
            analyzer: analyzer.into(),
            message: message.into(),
        }
    }

    pub fn timeout(analyzer: impl Into<String>, timeout_ms: u64) -> Self {
        Self::Timeout {
            analyzer: analyzer.into(),
            timeout_ms,
        }
    }
}
