//! AI provider adapters.
//!
//! - `AnthropicProvider` - Anthropic Messages API
//! - `MockAIProvider` - Queue-driven mock for testing
//! - `OpenAIProvider` - OpenAI-compatible chat completions (OpenAI, Ollama)

mod anthropic_provider;
mod mock_provider;
mod openai_provider;

pub use anthropic_provider::{AnthropicConfig, AnthropicProvider};
pub use mock_provider::{MockAIProvider, DEFAULT_MOCK_REPLY};
pub use openai_provider::{OpenAIConfig, OpenAIProvider};
