//! LLM-backed persona replies.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::domain::foundation::SessionId;
use crate::domain::transition::ConversationContext;
use crate::ports::{
    AIProvider, CompletionRequest, GenerationError, MessageRole, RequestMetadata, ResponseGenerator,
};

/// Builds a prompt from the conversation context and asks an [`AIProvider`].
///
/// The system prompt carries the global persona instructions, the active
/// stage's instructions, the current metric values and any retrieved
/// knowledge. Recent turns are sent
/// as alternating user/assistant messages.
pub struct LlmResponseGenerator<P: AIProvider> {
    provider: P,
    global_instructions: String,
    session_id: SessionId,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
    turn: AtomicU32,
}

impl<P: AIProvider> LlmResponseGenerator<P> {
    pub fn new(provider: P, global_instructions: impl Into<String>) -> Self {
        Self {
            provider,
            global_instructions: global_instructions.into(),
            session_id: SessionId::new(),
            max_tokens: None,
            temperature: None,
            turn: AtomicU32::new(0),
        }
    }

    pub fn with_session_id(mut self, session_id: SessionId) -> Self {
        self.session_id = session_id;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// System prompt for the given context.
    pub fn system_prompt(&self, context: &ConversationContext) -> String {
        let mut prompt = String::new();
        if !self.global_instructions.is_empty() {
            prompt.push_str(self.global_instructions.trim_end());
            prompt.push_str("\n\n");
        }
        prompt.push_str(&format!("Current interaction stage: {}\n", context.current_stage_id));
        prompt.push_str(&format!("Stage-specific instructions: {}\n", context.instructions));
        prompt.push_str(&format!("Current metrics state: {}", context.format_metrics()));
        if !context.knowledge.is_empty() {
            prompt.push_str("\n\nRelevant knowledge:");
            for passage in &context.knowledge {
                prompt.push_str("\n- ");
                prompt.push_str(passage);
            }
        }
        prompt
    }

    fn build_request(&self, context: &ConversationContext, user_text: &str) -> CompletionRequest {
        let turn = self.turn.fetch_add(1, Ordering::Relaxed) + 1;
        let mut request = CompletionRequest::new(RequestMetadata::new(self.session_id, turn))
            .with_system_prompt(self.system_prompt(context));

        for past in &context.history {
            request = request
                .with_message(MessageRole::User, past.user_text.as_str())
                .with_message(MessageRole::Assistant, past.ai_text.as_str());
        }
        request = request.with_message(MessageRole::User, user_text);

        if let Some(max) = self.max_tokens {
            request = request.with_max_tokens(max);
        }
        if let Some(temp) = self.temperature {
            request = request.with_temperature(temp);
        }
        request
    }
}

#[async_trait]
impl<P: AIProvider> ResponseGenerator for LlmResponseGenerator<P> {
    async fn generate(&self, context: &ConversationContext, user_text: &str) -> Result<String, GenerationError> {
        let request = self.build_request(context, user_text);
        let response = self.provider.complete(request).await?;
        Ok(response.content.trim().to_string())
    }
}
