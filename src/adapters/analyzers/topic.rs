//! Turn-to-turn topic coherence.

use async_trait::async_trait;

use crate::domain::analysis::AnalyzerOutput;
use crate::ports::{AnalysisInput, AnalyzerError, TurnAnalyzer};

use super::text::{cosine_similarity, term_frequencies, tokenize};

/// Metric this analyzer writes.
pub const TOPIC_COHERENCE: &str = "topic_coherence";

/// Cosine similarity between this turn's words and the previous turn's.
///
/// Sets `topic_coherence` as an absolute value: 1.0 on the first turn.
#[derive(Debug, Clone, Default)]
pub struct TopicCoherenceAnalyzer {
    previous: Option<Vec<String>>,
}

impl TopicCoherenceAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TurnAnalyzer for TopicCoherenceAnalyzer {
    fn name(&self) -> &str {
        "topic_coherence"
    }

    async fn analyze(&mut self, input: &AnalysisInput) -> Result<AnalyzerOutput, AnalyzerError> {
        let current = tokenize(&format!("{} {}", input.user_text, input.ai_text));

        let coherence = match &self.previous {
            Some(previous) => cosine_similarity(&term_frequencies(previous), &term_frequencies(&current)),
            None => 1.0,
        };
        self.previous = Some(current);

        Ok(AnalyzerOutput::new().with_absolute(TOPIC_COHERENCE, coherence))
    }
}
