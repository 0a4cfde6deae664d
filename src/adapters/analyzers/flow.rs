//! Conversation-flow scoring against an ideal sales sequence.
//!
//! Classifying a reply into a flow element needs a real classifier. None is
//! shipped: the default [`UnimplementedClassifier`] reports
//! [`AnalyzerError::NotImplemented`], so the analyzer contributes nothing
//! until a classifier is supplied.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::analysis::AnalyzerOutput;
use crate::ports::{AnalysisInput, AnalyzerError, TurnAnalyzer};

/// Metric this analyzer writes.
pub const CONVERSATION_FLOW_SCORE: &str = "conversation_flow_score";

const ANALYZER_NAME: &str = "conversation_flow";

/// Elements of a conversation, in their ideal order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationElement {
    Greeting,
    ProblemIdentification,
    SolutionPresentation,
    ObjectionHandling,
    Closing,
    FollowUp,
}

impl ConversationElement {
    pub const IDEAL_FLOW: [ConversationElement; 6] = [
        ConversationElement::Greeting,
        ConversationElement::ProblemIdentification,
        ConversationElement::SolutionPresentation,
        ConversationElement::ObjectionHandling,
        ConversationElement::Closing,
        ConversationElement::FollowUp,
    ];
}

/// Maps an AI reply to the conversation element it performs.
pub trait ElementClassifier: Send {
    fn classify(&self, ai_text: &str) -> Result<ConversationElement, AnalyzerError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct UnimplementedClassifier;

impl ElementClassifier for UnimplementedClassifier {
    fn classify(&self, _ai_text: &str) -> Result<ConversationElement, AnalyzerError> {
        Err(AnalyzerError::not_implemented(ANALYZER_NAME, "conversation element classification"))
    }
}

/// Fraction of turns whose element matches the ideal flow at that position.
///
/// Sets `conversation_flow_score` as an absolute value; 1.0 until two turns
/// have been classified.
pub struct ConversationFlowAnalyzer<C: ElementClassifier = UnimplementedClassifier> {
    classifier: C,
    elements: Vec<ConversationElement>,
}

impl Default for ConversationFlowAnalyzer {
    fn default() -> Self {
        Self::new(UnimplementedClassifier)
    }
}

impl<C: ElementClassifier> ConversationFlowAnalyzer<C> {
    pub fn new(classifier: C) -> Self {
        Self {
            classifier,
            elements: Vec::new(),
        }
    }

    pub fn elements(&self) -> &[ConversationElement] {
        &self.elements
    }

    fn flow_score(&self) -> f64 {
        if self.elements.len() < 2 {
            return 1.0;
        }
        let matches = self
            .elements
            .iter()
            .zip(ConversationElement::IDEAL_FLOW.iter())
            .filter(|(actual, ideal)| actual == ideal)
            .count();
        matches as f64 / self.elements.len() as f64
    }
}

#[async_trait]
impl<C: ElementClassifier> TurnAnalyzer for ConversationFlowAnalyzer<C> {
    fn name(&self) -> &str {
        ANALYZER_NAME
    }

    async fn analyze(&mut self, input: &AnalysisInput) -> Result<AnalyzerOutput, AnalyzerError> {
        let element = self.classifier.classify(&input.ai_text)?;
        self.elements.push(element);
        Ok(AnalyzerOutput::new().with_absolute(CONVERSATION_FLOW_SCORE, self.flow_score()))
    }
}
