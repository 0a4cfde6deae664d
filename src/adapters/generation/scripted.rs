//! Replies read from a fixed script.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::domain::transition::ConversationContext;
use crate::ports::{GenerationError, ResponseGenerator};

/// [`ResponseGenerator`] that hands out queued replies in order.
///
/// Every call is recorded with the stage that was active and the knowledge
/// that was retrieved, so tests can check
/// what context the orchestrator passed. An empty queue yields
/// [`GenerationError::Exhausted`].
#[derive(Debug, Clone, Default)]
pub struct ScriptedGenerator {
    replies: Arc<Mutex<VecDeque<Result<String, GenerationError>>>>,
    calls: Arc<Mutex<Vec<ScriptedCall>>>,
}

/// One recorded call.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptedCall {
    pub stage_id: String,
    pub user_text: String,
    pub knowledge: Vec<String>,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_replies<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Arc::new(Mutex::new(replies.into_iter().map(|r| Ok(r.into())).collect())),
            calls: Arc::default(),
        }
    }

    pub async fn push_reply(&self, reply: impl Into<String>) {
        self.replies.lock().await.push_back(Ok(reply.into()));
    }

    pub async fn push_error(&self, error: GenerationError) {
        self.replies.lock().await.push_back(Err(error));
    }

    pub async fn call_count(&self) -> usize {
        self.calls.lock().await.len()
    }

    pub async fn calls(&self) -> Vec<ScriptedCall> {
        self.calls.lock().await.clone()
    }
}

#[async_trait]
impl ResponseGenerator for ScriptedGenerator {
    async fn generate(&self, context: &ConversationContext, user_text: &str) -> Result<String, GenerationError> {
        self.calls.lock().await.push(ScriptedCall {
            stage_id: context.current_stage_id.clone(),
            user_text: user_text.to_string(),
            knowledge: context.knowledge.clone(),
        });

        self.replies
            .lock()
            .await
            .pop_front()
            .unwrap_or(Err(GenerationError::Exhausted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::metrics::MetricsSnapshot;

    fn context() -> ConversationContext {
        ConversationContext {
            current_stage_id: "greeting".into(),
            instructions: "Say hello".into(),
            metrics: MetricsSnapshot::new(),
            history: Vec::new(),
            knowledge: Vec::new(),
        }
    }

    #[tokio::test]
    async fn replies_in_order_then_exhausts() {
        let generator = ScriptedGenerator::from_replies(["one", "two"]);

        assert_eq!(generator.generate(&context(), "a").await.unwrap(), "one");
        assert_eq!(generator.generate(&context(), "b").await.unwrap(), "two");
        assert_eq!(generator.generate(&context(), "c").await, Err(GenerationError::Exhausted));
        assert_eq!(generator.call_count().await, 3);
    }

    #[tokio::test]
    async fn injected_errors_are_returned() {
        let generator = ScriptedGenerator::new();
        generator.push_error(GenerationError::failed("backend down")).await;
        generator.push_reply("recovered").await;

        assert!(generator.generate(&context(), "a").await.is_err());
        assert_eq!(generator.generate(&context(), "b").await.unwrap(), "recovered");
    }

    #[tokio::test]
    async fn records_stage_and_user_text() {
        let generator = ScriptedGenerator::from_replies(["hi"]);
        generator.generate(&context(), "hello there").await.unwrap();

        assert_eq!(
            generator.calls().await,
            vec![ScriptedCall {
                stage_id: "greeting".into(),
                user_text: "hello there".into(),
                knowledge: Vec::new(),
            }]
        );
    }
}
