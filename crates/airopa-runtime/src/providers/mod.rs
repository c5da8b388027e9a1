//! LLM provider abstractions.
//!
//! The [`LlmProvider`] trait is the only seam through which text leaves the
//! process. The [`LlmGateway`](crate::gateway::LlmGateway) wraps it and turns
//! every [`ProviderError`] into a status value.
//!
//! ## Security
//!
//! API keys are held in [`ApiCredential`] and never appear in Debug/Display
//! output.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

mod chat_completions;
mod factory;
pub mod secrets;

pub use chat_completions::{api_key_env, ChatCompletionsProvider, ChatCompletionsProviderFactory};
pub use factory::{ProviderFactory, ProviderRegistry};
pub use secrets::{ApiCredential, CredentialSource};

/// Errors from LLM providers.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    #[error("Rate limit exceeded, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    ParseError(String),

    #[error("Authentication failed")]
    AuthError,

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    /// No credential available
    #[error("{0}")]
    NotConfigured(String),

    /// Client support was not compiled in
    #[error("{0}")]
    Unavailable(String),
}

/// Configuration for a completion request.
#[derive(Debug, Clone)]
pub struct CompletionConfig {
    pub model: String,

    /// Maximum tokens to generate
    pub max_tokens: u32,

    pub temperature: f32,

    /// Request timeout
    pub timeout: Duration,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            model: airopa_core::ProviderKind::Groq.default_model().to_string(),
            max_tokens: 1024,
            temperature: 0.3,
            timeout: Duration::from_secs(30),
        }
    }
}

impl CompletionConfig {
    /// Request settings from the `ai` config section.
    pub fn from_ai_config(ai: &airopa_core::AiConfig) -> Self {
        Self {
            model: ai.model_name().to_string(),
            max_tokens: ai.max_tokens,
            temperature: ai.temperature,
            timeout: ai.timeout_duration(),
        }
    }
}

/// A chat message for LLM completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// "system", "user" or "assistant"
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Response from an LLM completion.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    /// Generated content
    pub content: String,

    pub usage: TokenUsage,

    /// Model that served the request
    pub model: String,

    pub stop_reason: Option<String>,
}

/// Token usage from a completion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

/// A chat-completion backend.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Execute a chat completion.
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        config: &CompletionConfig,
    ) -> Result<CompletionResponse, ProviderError>;

    /// Whether the provider looks usable (credential present).
    async fn health_check(&self) -> bool;

    /// Provider name for telemetry.
    fn name(&self) -> &str;
}
