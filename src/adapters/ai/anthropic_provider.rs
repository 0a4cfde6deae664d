//! Anthropic Messages API provider.
//!
//! # Configuration
//!
//! ```ignore
//! let config = AnthropicConfig::new(Secret::new(api_key))
//!     .with_model("claude-3-5-haiku-latest");
//!
//! let provider = AnthropicProvider::new(config)?;
//! ```

use async_trait::async_trait;
use reqwest::{Client, Response};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::sleep;

use crate::ports::{
    AIError, AIProvider, CompletionRequest, CompletionResponse, FinishReason, MessageRole,
    ProviderInfo, TokenUsage,
};

/// Anthropic API version header value.
const ANTHROPIC_API_VERSION: &str = "2023-06-01";

/// The Messages API requires `max_tokens`; persona replies are short.
const DEFAULT_MAX_TOKENS: u32 = 1024;

/// Retry delay used when a 429 body carries no hint.
const DEFAULT_RETRY_AFTER_SECS: u32 = 60;

/// Connection settings for [`AnthropicProvider`].
#[derive(Debug, Clone)]
pub struct AnthropicConfig {
    api_key: Secret<String>,
    pub model: String,
    /// Host only; `/v1/messages` is appended.
    pub base_url: String,
    pub timeout: Duration,
    pub max_retries: u32,
    /// First backoff delay; doubles on each retry.
    pub retry_backoff: Duration,
}

impl AnthropicConfig {
    pub fn new(api_key: Secret<String>) -> Self {
        Self {
            api_key,
            model: "claude-3-5-haiku-latest".to_string(),
            base_url: "https://api.anthropic.com".to_string(),
            timeout: Duration::from_secs(60),
            max_retries: 3,
            retry_backoff: Duration::from_secs(1),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
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

    fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }
}

/// [`AIProvider`] over Anthropic's `/v1/messages` endpoint.
pub struct AnthropicProvider {
    config: AnthropicConfig,
    client: Client,
}

impl AnthropicProvider {
    pub fn new(config: AnthropicConfig) -> Result<Self, AIError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AIError::InvalidRequest(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.config.base_url.trim_end_matches('/'))
    }

    /// System-role messages join the top-level `system` field; the API only
    /// accepts user and assistant turns in `messages`.
    fn to_wire_request(&self, request: &CompletionRequest) -> MessagesRequest {
        let mut system: Vec<&str> = request.system_prompt.iter().map(String::as_str).collect();
        let mut messages = Vec::with_capacity(request.messages.len());

        for msg in &request.messages {
            let role = match msg.role {
                MessageRole::System => {
                    system.push(msg.content.as_str());
                    continue;
                }
                MessageRole::User => "user",
                MessageRole::Assistant => "assistant",
            };
            messages.push(WireMessage {
                role: role.to_string(),
                content: msg.content.clone(),
            });
        }

        MessagesRequest {
            model: self.config.model.clone(),
            messages,
            system: if system.is_empty() { None } else { Some(system.join("\n\n")) },
            max_tokens: request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            temperature: request.temperature,
        }
    }

    async fn send_request(&self, request: &CompletionRequest) -> Result<Response, AIError> {
        self.client
            .post(self.messages_url())
            .header("x-api-key", self.config.api_key())
            .header("anthropic-version", ANTHROPIC_API_VERSION)
            .header("Content-Type", "application/json")
            .json(&self.to_wire_request(request))
            .send()
            .await
            .map_err(|e| {
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

        parse_messages_body(&body)
    }

    async fn attempt(&self, request: &CompletionRequest) -> Result<CompletionResponse, AIError> {
        let response = self.send_request(request).await?;
        self.parse_response(response).await
    }
}

#[async_trait]
impl AIProvider for AnthropicProvider {
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
                        provider = "anthropic",
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
        ProviderInfo::new("anthropic", &self.config.model)
    }
}

/// Maps a non-success HTTP status to an [`AIError`].
fn error_for_status(status: u16, body: &str) -> AIError {
    match status {
        401 | 403 => AIError::AuthenticationFailed,
        429 => AIError::rate_limited(parse_retry_after(body)),
        400 if body.contains("prompt is too long") => AIError::ContextTooLong(body.to_string()),
        400 | 404 | 413 | 422 => AIError::InvalidRequest(body.to_string()),
        // 529: overloaded
        500..=599 => AIError::unavailable(format!("Server error {}: {}", status, body)),
        _ => AIError::network(format!("Unexpected status {}: {}", status, body)),
    }
}

/// Reads "try again in Ns" from the error message, if present.
fn parse_retry_after(body: &str) -> u32 {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|parsed| {
            let message = parsed.error.message;
            let rest = &message[message.find("try again in ")? + "try again in ".len()..];
            let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
            digits.parse().ok()
        })
        .unwrap_or(DEFAULT_RETRY_AFTER_SECS)
}

fn parse_messages_body(body: &str) -> Result<CompletionResponse, AIError> {
    let response: MessagesResponse = serde_json::from_str(body)
        .map_err(|e| AIError::parse(format!("Failed to parse response: {}", e)))?;

    let content = response
        .content
        .into_iter()
        .filter(|block| block.block_type == "text")
        .filter_map(|block| block.text)
        .collect::<Vec<_>>()
        .join("");

    let finish_reason = match response.stop_reason.as_deref() {
        Some("end_turn") | Some("stop_sequence") | None => FinishReason::Stop,
        Some("max_tokens") => FinishReason::Length,
        Some(_) => FinishReason::Error,
    };

    Ok(CompletionResponse {
        content,
        usage: TokenUsage::new(response.usage.input_tokens, response.usage.output_tokens),
        model: response.model,
        finish_reason,
    })
}

// ----- Wire types -----

#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    model: String,
    content: Vec<ContentBlock>,
    stop_reason: Option<String>,
    #[serde(default)]
    usage: WireUsage,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct WireUsage {
    input_tokens: u32,
    output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::SessionId;
    use crate::ports::RequestMetadata;

    fn provider() -> AnthropicProvider {
        AnthropicProvider::new(
            AnthropicConfig::new(Secret::new("sk-ant-test".to_string()))
                .with_model("claude-3-5-haiku-latest")
                .with_base_url("https://api.anthropic.com/"),
        )
        .unwrap()
    }

    fn request() -> CompletionRequest {
        CompletionRequest::new(RequestMetadata::new(SessionId::new(), 1))
            .with_system_prompt("You are a buyer.")
            .with_message(MessageRole::User, "Hi")
            .with_message(MessageRole::Assistant, "Hello")
            .with_message(MessageRole::System, "Stay brief.")
            .with_message(MessageRole::User, "Pricing?")
    }

    #[test]
    fn config_builder_works() {
        let config = AnthropicConfig::new(Secret::new("key".to_string()))
            .with_model("claude-3-opus-20240229")
            .with_timeout(Duration::from_secs(30))
            .with_max_retries(1)
            .with_retry_backoff(Duration::from_millis(5));

        assert_eq!(config.model, "claude-3-opus-20240229");
        assert_eq!(config.base_url, "https://api.anthropic.com");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.max_retries, 1);
        assert_eq!(config.api_key(), "key");
    }

    #[test]
    fn messages_url_ignores_trailing_slash() {
        assert_eq!(provider().messages_url(), "https://api.anthropic.com/v1/messages");
    }

    mod wire_request {
        use super::*;

        #[test]
        fn system_messages_move_to_system_field() {
            let wire = provider().to_wire_request(&request());

            assert_eq!(wire.system.as_deref(), Some("You are a buyer.\n\nStay brief."));
            let roles: Vec<&str> = wire.messages.iter().map(|m| m.role.as_str()).collect();
            assert_eq!(roles, vec!["user", "assistant", "user"]);
        }

        #[test]
        fn max_tokens_always_set() {
            let wire = provider().to_wire_request(&request());
            assert_eq!(wire.max_tokens, DEFAULT_MAX_TOKENS);

            let wire = provider().to_wire_request(&request().with_max_tokens(200));
            assert_eq!(wire.max_tokens, 200);
        }

        #[test]
        fn omits_empty_system() {
            let request = CompletionRequest::new(RequestMetadata::new(SessionId::new(), 1))
                .with_message(MessageRole::User, "Hi");
            let json = serde_json::to_value(provider().to_wire_request(&request)).unwrap();
            assert!(json.get("system").is_none());
            assert!(json.get("temperature").is_none());
        }
    }

    mod responses {
        use super::*;

        #[test]
        fn joins_text_blocks() {
            let body = r#"{"model":"claude-3-5-haiku-latest","content":[{"type":"text","text":"Sounds "},{"type":"tool_use","id":"x"},{"type":"text","text":"good."}],"stop_reason":"max_tokens","usage":{"input_tokens":20,"output_tokens":4}}"#;
            let response = parse_messages_body(body).unwrap();

            assert_eq!(response.content, "Sounds good.");
            assert_eq!(response.finish_reason, FinishReason::Length);
            assert_eq!(response.usage.total_tokens, 24);
            assert_eq!(response.model, "claude-3-5-haiku-latest");
        }

        #[test]
        fn malformed_body_is_a_parse_error() {
            assert!(matches!(parse_messages_body("not json"), Err(AIError::Parse(_))));
        }

        #[test]
        fn maps_status_codes() {
            assert_eq!(error_for_status(401, ""), AIError::AuthenticationFailed);
            assert!(matches!(error_for_status(529, "overloaded"), AIError::Unavailable { .. }));
            assert!(matches!(
                error_for_status(400, r#"{"error":{"message":"prompt is too long: 210000 tokens"}}"#),
                AIError::ContextTooLong(_)
            ));
            assert!(matches!(error_for_status(400, "bad field"), AIError::InvalidRequest(_)));
        }

        #[test]
        fn parses_retry_after_hint() {
            let body = r#"{"type":"error","error":{"type":"rate_limit_error","message":"Rate limited, try again in 7s"}}"#;
            assert_eq!(error_for_status(429, body), AIError::rate_limited(7));
            assert_eq!(parse_retry_after("{}"), DEFAULT_RETRY_AFTER_SECS);
        }
    }

    #[test]
    fn provider_info_reports_anthropic() {
        assert_eq!(
            provider().provider_info(),
            ProviderInfo::new("anthropic", "claude-3-5-haiku-latest")
        );
    }
}
