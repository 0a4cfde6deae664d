//! OpenAI-compatible chat completions provider.
//!
//! Talks to any endpoint that speaks the `/chat/completions` protocol:
//! OpenAI itself, or a local Ollama server via its OpenAI-compatible API.
//!
//! # Configuration
//!
//! ```ignore
//! let config = OpenAIConfig::new("llama3")
//!     .with_base_url("http://localhost:11434/v1");
//!
//! let provider = OpenAIProvider::new(config)?;
//! ```

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{Client, Response};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::sleep;

use crate::ports::{
    AIError, AIProvider, CompletionRequest, CompletionResponse, FinishReason, MessageRole,
    ProviderInfo, TokenUsage,
};

/// Retry delay used when a 429 body carries no hint.
const DEFAULT_RETRY_AFTER_SECS: u32 = 30;

static RETRY_AFTER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"try again in (\d+)").expect("static regex is valid"));

/// Connection settings for [`OpenAIProvider`].
#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    /// Bearer token. Local servers usually need none.
    api_key: Option<Secret<String>>,
    pub provider_name: String,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
    /// Retries on transient failures.
    pub max_retries: u32,
    /// First backoff delay; doubles on each retry.
    pub retry_backoff: Duration,
}

impl OpenAIConfig {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            api_key: None,
            provider_name: "openai".to_string(),
            model: model.into(),
            base_url: "https://api.openai.com/v1".to_string(),
            timeout: Duration::from_secs(60),
            max_retries: 3,
            retry_backoff: Duration::from_secs(1),
        }
    }

    pub fn with_api_key(mut self, api_key: Secret<String>) -> Self {
        self.api_key = Some(api_key);
        self
    }

    /// Name reported in [`ProviderInfo`] (e.g. "ollama").
    pub fn with_provider_name(mut self, name: impl Into<String>) -> Self {
        self.provider_name = name.into();
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    fn api_key(&self) -> Option<&str> {
        self.api_key.as_ref().map(|key| key.expose_secret().as_str())
    }
}

/// [`AIProvider`] over an OpenAI-compatible HTTP API.
pub struct OpenAIProvider {
    config: OpenAIConfig,
    client: Client,
}

impl OpenAIProvider {
    pub fn new(config: OpenAIConfig) -> Result<Self, AIError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AIError::InvalidRequest(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    fn to_wire_request(&self, request: &CompletionRequest) -> ChatRequest {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);

        if let Some(ref prompt) = request.system_prompt {
            messages.push(ChatMessage {
                role: "system".to_string(),
                content: prompt.clone(),
            });
        }

        for msg in &request.messages {
            messages.push(ChatMessage {
                role: match msg.role {
                    MessageRole::System => "system",
                    MessageRole::User => "user",
                    MessageRole::Assistant => "assistant",
                }
                .to_string(),
                content: msg.content.clone(),
            });
        }

        ChatRequest {
            model: self.config.model.clone(),
            messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            stream: false,
        }
    }

    async fn send_request(&self, request: &CompletionRequest) -> Result<Response, AIError> {
        let mut builder = self
            .client
            .post(self.completions_url())
            .header("Content-Type", "application/json")
            .json(&self.to_wire_request(request));

        if let Some(key) = self.config.api_key() {
            builder = builder.header("Authorization", format!("Bearer {}", key));
        }

        builder.send().await.map_err(|e| {
            if e.is_timeout() {
                AIError::Timeout {
                    timeout_secs: self.config.timeout.as_secs() as u32,
                }
            } else if e.is_connect() {
                AIError::network(format!("Connection failed: {}", e))
            } else {
                AIError::network(e.to_string())
            }
        })
    }

    async fn parse_response(&self, response: Response) -> Result<CompletionResponse, AIError> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AIError::network(format!("Failed to read response body: {}", e)))?;

        if !status.is_success() {
            return Err(error_for_status(status.as_u16(), &body));
        }

        parse_completion_body(&body)
    }

    async fn attempt(&self, request: &CompletionRequest) -> Result<CompletionResponse, AIError> {
        let response = self.send_request(request).await?;
        self.parse_response(response).await
    }
}

#[async_trait]
impl AIProvider for OpenAIProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, AIError> {
        let mut retry_count = 0;

        loop {
            match self.attempt(&request).await {
                Ok(completion) => return Ok(completion),
                Err(err) if !err.is_retryable() || retry_count >= self.config.max_retries => {
                    return Err(err);
                }
                Err(err) => {
                    let delay = self.config.retry_backoff * (1 << retry_count);
                    tracing::warn!(
                        provider = %self.config.provider_name,
                        session_id = %request.metadata.session_id,
                        turn = request.metadata.turn,
                        attempt = retry_count + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Retrying completion"
                    );
                    sleep(delay).await;
                    retry_count += 1;
                }
            }
        }
    }

    fn provider_info(&self) -> ProviderInfo {
        ProviderInfo::new(&self.config.provider_name, &self.config.model)
    }
}

/// Maps a non-success HTTP status to an [`AIError`].
fn error_for_status(status: u16, body: &str) -> AIError {
    match status {
        401 | 403 => AIError::AuthenticationFailed,
        429 => AIError::rate_limited(parse_retry_after(body)),
        400 if body.contains("maximum context length") || body.contains("context_length_exceeded") => {
            AIError::ContextTooLong(body.to_string())
        }
        400 | 404 | 422 => AIError::InvalidRequest(body.to_string()),
        500..=599 => AIError::unavailable(format!("Server error {}: {}", status, body)),
        _ => AIError::network(format!("Unexpected status {}: {}", status, body)),
    }
}

/// Extracts "try again in Ns" from a rate-limit body.
fn parse_retry_after(body: &str) -> u32 {
    RETRY_AFTER
        .captures(body)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(DEFAULT_RETRY_AFTER_SECS)
}

fn parse_completion_body(body: &str) -> Result<CompletionResponse, AIError> {
    let response: ChatResponse = serde_json::from_str(body)
        .map_err(|e| AIError::parse(format!("Failed to parse response: {}", e)))?;

    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| AIError::parse("No choices in response"))?;

    let usage = response
        .usage
        .map(|u| TokenUsage::new(u.prompt_tokens, u.completion_tokens))
        .unwrap_or_default();

    Ok(CompletionResponse {
        content: choice.message.content,
        usage,
        model: response.model,
        finish_reason: FinishReason::from_wire(choice.finish_reason.as_deref()),
    })
}

// ----- Wire types -----

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    stream: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: String,
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::SessionId;
    use crate::ports::RequestMetadata;

    fn provider() -> OpenAIProvider {
        OpenAIProvider::new(
            OpenAIConfig::new("llama3")
                .with_provider_name("ollama")
                .with_base_url("http://localhost:11434/v1/"),
        )
        .unwrap()
    }

    #[test]
    fn config_builder_works() {
        let config = OpenAIConfig::new("gpt-4o")
            .with_api_key(Secret::new("test-key".to_string()))
            .with_base_url("https://custom.api.com")
            .with_timeout(Duration::from_secs(30))
            .with_max_retries(5)
            .with_retry_backoff(Duration::from_millis(10));

        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.base_url, "https://custom.api.com");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.retry_backoff, Duration::from_millis(10));
        assert_eq!(config.api_key(), Some("test-key"));
    }

    #[test]
    fn completions_url_ignores_trailing_slash() {
        assert_eq!(provider().completions_url(), "http://localhost:11434/v1/chat/completions");
    }

    #[test]
    fn system_prompt_leads_wire_messages() {
        let request = CompletionRequest::new(RequestMetadata::new(SessionId::new(), 1))
            .with_system_prompt("Be brief")
            .with_message(MessageRole::User, "Hi")
            .with_message(MessageRole::Assistant, "Hello");

        let wire = provider().to_wire_request(&request);
        let roles: Vec<&str> = wire.messages.iter().map(|m| m.role.as_str()).collect();
        assert_eq!(roles, vec!["system", "user", "assistant"]);
        assert_eq!(wire.model, "llama3");
        assert!(!wire.stream);
    }

    #[test]
    fn provider_info_uses_configured_name() {
        let info = provider().provider_info();
        assert_eq!(info, ProviderInfo::new("ollama", "llama3"));
    }

    #[test]
    fn parses_completion_body() {
        let body = r#"{"model":"llama3","choices":[{"message":{"role":"assistant","content":"Sure."},"finish_reason":"length"}],"usage":{"prompt_tokens":12,"completion_tokens":3}}"#;
        let response = parse_completion_body(body).unwrap();
        assert_eq!(response.content, "Sure.");
        assert_eq!(response.finish_reason, FinishReason::Length);
        assert_eq!(response.usage.total_tokens, 15);
    }

    #[test]
    fn empty_choices_is_a_parse_error() {
        let err = parse_completion_body(r#"{"model":"x","choices":[]}"#).unwrap_err();
        assert!(matches!(err, AIError::Parse(_)));
    }

    #[test]
    fn maps_status_codes() {
        assert_eq!(error_for_status(401, ""), AIError::AuthenticationFailed);
        assert!(matches!(error_for_status(503, "busy"), AIError::Unavailable { .. }));
        assert!(matches!(
            error_for_status(400, "context_length_exceeded"),
            AIError::ContextTooLong(_)
        ));
        assert!(matches!(error_for_status(400, "bad field"), AIError::InvalidRequest(_)));
    }

    #[test]
    fn parses_retry_after_hint() {
        let body = r#"{"error":{"message":"Rate limit exceeded. Please try again in 12 seconds."}}"#;
        assert_eq!(error_for_status(429, body), AIError::rate_limited(12));
        assert_eq!(parse_retry_after("slow down"), DEFAULT_RETRY_AFTER_SECS);
    }
}
