//! OpenAI-compatible chat-completions provider for Groq and Mistral.
//!
//! Both services accept the same `/chat/completions` request and return the
//! same `choices[].message.content` / `usage` shape, so one client covers
//! both. A missing API key is not a construction error: the provider is
//! built anyway and every call fails with [`ProviderError::NotConfigured`],
//! which the gateway reports as `no_api_key`.

use super::{
    factory::ProviderFactory,
    secrets::{ApiCredential, CredentialSource},
    ChatMessage, CompletionConfig, CompletionResponse, LlmProvider, ProviderError,
};
use airopa_core::ProviderKind;
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::sync::Arc;

#[cfg(feature = "http")]
use super::TokenUsage;
#[cfg(feature = "http")]
use serde::{Deserialize, Serialize};
#[cfg(feature = "http")]
use std::time::Duration;

/// Environment variable holding the API key for `kind`.
pub fn api_key_env(kind: ProviderKind) -> &'static str {
    match kind {
        ProviderKind::Groq => "GROQ_API_KEY",
        ProviderKind::Mistral => "MISTRAL_API_KEY",
    }
}

/// Public API root for `kind`.
pub fn default_base_url(kind: ProviderKind) -> &'static str {
    match kind {
        ProviderKind::Groq => "https://api.groq.com/openai/v1",
        ProviderKind::Mistral => "https://api.mistral.ai/v1",
    }
}

fn credential_name(kind: ProviderKind) -> &'static str {
    match kind {
        ProviderKind::Groq => "Groq API key",
        ProviderKind::Mistral => "Mistral API key",
    }
}

/// Chat-completions client for one hosted provider.
pub struct ChatCompletionsProvider {
    kind: ProviderKind,
    credential: Option<ApiCredential>,
    base_url: String,
    #[cfg(feature = "http")]
    client: reqwest::Client,
}

impl std::fmt::Debug for ChatCompletionsProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatCompletionsProvider")
            .field("kind", &self.kind)
            .field("credential", &self.credential)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl ChatCompletionsProvider {
    fn with_credential(kind: ProviderKind, credential: Option<ApiCredential>) -> Self {
        Self {
            kind,
            credential: credential.filter(|c| !c.is_empty()),
            base_url: default_base_url(kind).to_string(),
            #[cfg(feature = "http")]
            client: reqwest::Client::new(),
        }
    }

    /// Provider with an explicit key.
    pub fn new(kind: ProviderKind, api_key: impl Into<String>) -> Self {
        Self::with_credential(
            kind,
            Some(ApiCredential::new(
                api_key,
                CredentialSource::Programmatic,
                credential_name(kind),
            )),
        )
    }

    /// Provider from JSON configuration (`api_key`, `base_url`), falling back
    /// to the environment for the key.
    pub fn from_config(kind: ProviderKind, config: &JsonValue) -> Self {
        let credential = ApiCredential::from_config_or_env(
            config,
            "api_key",
            api_key_env(kind),
            credential_name(kind),
        )
        .ok();

        let provider = Self::with_credential(kind, credential);
        match config["base_url"].as_str() {
            Some(url) => provider.with_base_url(url),
            None => provider,
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn kind(&self) -> ProviderKind {
        self.kind
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn has_credential(&self) -> bool {
        self.credential.is_some()
    }
}

#[cfg(feature = "http")]
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
}

#[cfg(feature = "http")]
#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[cfg(feature = "http")]
#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[cfg(feature = "http")]
#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[cfg(feature = "http")]
#[derive(Debug, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

/// Pull a readable message out of an error body.
///
/// Groq nests it under `error.message`, Mistral puts it at `message`.
#[cfg(feature = "http")]
fn error_message(body: &str) -> String {
    serde_json::from_str::<JsonValue>(body)
        .ok()
        .and_then(|v| {
            v["error"]["message"]
                .as_str()
                .or_else(|| v["message"].as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.chars().take(200).collect())
}

#[async_trait]
impl LlmProvider for ChatCompletionsProvider {
    #[cfg(feature = "http")]
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        config: &CompletionConfig,
    ) -> Result<CompletionResponse, ProviderError> {
        let Some(credential) = self.credential.as_ref() else {
            return Err(ProviderError::NotConfigured(format!(
                "No API key configured for provider '{}'",
                self.kind
            )));
        };

        let request = ChatRequest {
            model: &config.model,
            messages: &messages,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        };

        // Only place the key leaves the wrapper
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(credential.expose())
            .timeout(config.timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(config.timeout)
                } else {
                    ProviderError::HttpError(e.to_string())
                }
            })?;

        let status = response.status();

        if status == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_secs);
            return Err(ProviderError::RateLimited { retry_after });
        }

        if status == 401 || status == 403 {
            return Err(ProviderError::AuthError);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::ApiError {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        let usage = body
            .usage
            .map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
            })
            .unwrap_or_default();

        let (content, stop_reason) = match body.choices.into_iter().next() {
            Some(choice) => (choice.message.content.unwrap_or_default(), choice.finish_reason),
            None => (String::new(), None),
        };

        Ok(CompletionResponse {
            content,
            usage,
            model: body.model.unwrap_or_else(|| config.model.clone()),
            stop_reason,
        })
    }

    #[cfg(not(feature = "http"))]
    async fn complete(
        &self,
        _messages: Vec<ChatMessage>,
        _config: &CompletionConfig,
    ) -> Result<CompletionResponse, ProviderError> {
        if self.credential.is_none() {
            return Err(ProviderError::NotConfigured(format!(
                "No API key configured for provider '{}'",
                self.kind
            )));
        }
        Err(ProviderError::Unavailable(format!(
            "{} client not available: build with the 'http' feature",
            self.kind
        )))
    }

    async fn health_check(&self) -> bool {
        self.credential.is_some()
    }

    fn name(&self) -> &str {
        self.kind.as_str()
    }
}

/// Factory for [`ChatCompletionsProvider`].
///
/// ## Configuration Format
/// ```json
/// {
///   "api_key": "...",                 // Optional, falls back to GROQ_API_KEY / MISTRAL_API_KEY
///   "base_url": "https://..."         // Optional, custom API endpoint
/// }
/// ```
pub struct ChatCompletionsProviderFactory {
    kind: ProviderKind,
}

impl ChatCompletionsProviderFactory {
    pub fn new(kind: ProviderKind) -> Self {
        Self { kind }
    }
}

impl ProviderFactory for ChatCompletionsProviderFactory {
    fn provider_type(&self) -> &'static str {
        self.kind.as_str()
    }

    fn create(&self, config: &JsonValue) -> Result<Arc<dyn LlmProvider>, ProviderError> {
        self.validate_config(config)?;
        Ok(Arc::new(ChatCompletionsProvider::from_config(self.kind, config)))
    }

    fn validate_config(&self, config: &JsonValue) -> Result<(), ProviderError> {
        if let Some(url) = config["base_url"].as_str() {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ProviderError::NotConfigured(
                    "base_url must start with http:// or https://".to_string(),
                ));
            }
        }
        if !config["api_key"].is_null() && !config["api_key"].is_string() {
            return Err(ProviderError::NotConfigured(
                "api_key must be a string".to_string(),
            ));
        }
        Ok(())
    }
}
