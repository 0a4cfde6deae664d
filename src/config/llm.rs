//! LLM provider configuration

use secrecy::Secret;
use serde::Deserialize;
use std::time::Duration;

use crate::adapters::ai::{AnthropicConfig, OpenAIConfig};

use super::error::ValidationError;

/// LLM backend used by the CLI when no script is given
#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub provider: LlmProvider,

    #[serde(default = "default_model")]
    pub model: String,

    /// Overrides the provider's default endpoint
    #[serde(default)]
    pub base_url: Option<String>,

    /// API key; required for OpenAI and Anthropic
    #[serde(default)]
    pub api_key: Option<Secret<String>>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Maximum retries on failure
    #[serde(default = "default_retries")]
    pub max_retries: u32,

    #[serde(default)]
    pub temperature: Option<f32>,

    #[serde(default)]
    pub max_tokens: Option<u32>,
}

/// LLM provider type
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    #[default]
    OpenAI,
    Anthropic,
    Ollama,
    Mock,
}

impl LlmProvider {
    pub fn name(self) -> &'static str {
        match self {
            LlmProvider::OpenAI => "openai",
            LlmProvider::Anthropic => "anthropic",
            LlmProvider::Ollama => "ollama",
            LlmProvider::Mock => "mock",
        }
    }

    fn default_base_url(self) -> &'static str {
        match self {
            LlmProvider::OpenAI | LlmProvider::Mock => "https://api.openai.com/v1",
            LlmProvider::Anthropic => "https://api.anthropic.com",
            LlmProvider::Ollama => "http://localhost:11434/v1",
        }
    }

    fn requires_api_key(self) -> bool {
        matches!(self, LlmProvider::OpenAI | LlmProvider::Anthropic)
    }
}

impl LlmConfig {
    /// Get timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| self.provider.default_base_url())
    }

    /// Settings for [`OpenAIProvider`](crate::adapters::ai::OpenAIProvider).
    pub fn to_openai_config(&self) -> OpenAIConfig {
        let config = OpenAIConfig::new(self.model.as_str())
            .with_provider_name(self.provider.name())
            .with_base_url(self.base_url())
            .with_timeout(self.timeout())
            .with_max_retries(self.max_retries);
        match &self.api_key {
            Some(key) => config.with_api_key(key.clone()),
            None => config,
        }
    }

    /// Settings for [`AnthropicProvider`](crate::adapters::ai::AnthropicProvider).
    pub fn to_anthropic_config(&self) -> Result<AnthropicConfig, ValidationError> {
        let key = self
            .api_key
            .clone()
            .ok_or(ValidationError::MissingRequired("llm.api_key"))?;
        Ok(AnthropicConfig::new(key)
            .with_model(self.model.as_str())
            .with_base_url(self.base_url())
            .with_timeout(self.timeout())
            .with_max_retries(self.max_retries))
    }

    /// Validate LLM configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout("llm.timeout_secs"));
        }
        if self.provider.requires_api_key() && self.api_key.is_none() {
            return Err(ValidationError::MissingRequired("llm.api_key"));
        }
        if matches!(self.temperature, Some(t) if !(0.0..=2.0).contains(&t)) {
            return Err(ValidationError::InvalidTemperature);
        }
        Ok(())
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::default(),
            model: default_model(),
            base_url: None,
            api_key: None,
            timeout_secs: default_timeout(),
            max_retries: default_retries(),
            temperature: None,
            max_tokens: None,
        }
    }
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_timeout() -> u64 {
    60
}

fn default_retries() -> u32 {
    3
}
