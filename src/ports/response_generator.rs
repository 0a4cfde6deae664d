//! Response generator port: produces the AI persona's reply for a turn.

use async_trait::async_trait;

use crate::domain::transition::ConversationContext;

use super::AIError;

/// Produces the AI reply to an operator utterance.
///
/// Failure is fatal for the turn: the orchestrator propagates it and leaves
/// the session untouched.
#[async_trait]
pub trait ResponseGenerator: Send + Sync {
    async fn generate(&self, context: &ConversationContext, user_text: &str) -> Result<String, GenerationError>;
}

/// Errors from reply generation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GenerationError {
    #[error(transparent)]
    Provider(#[from] AIError),

    /// A scripted generator ran out of replies.
    #[error("no scripted reply left for turn")]
    Exhausted,

    #[error("generation timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("generation failed: {0}")]
    Failed(String),
}

impl GenerationError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}
