//! Uniform completion call over any [`LlmProvider`].
//!
//! [`LlmGateway::complete`] never returns an error. Transport failures,
//! missing keys and timeouts all come back as a [`CallOutcome::Failed`]
//! carrying an [`LlmStatus`], so callers branch on data instead of
//! unwinding.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use crate::providers::{ChatMessage, CompletionConfig, LlmProvider, ProviderError};

/// Status vocabulary shared by gateway responses and telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmStatus {
    Ok,
    NoApiKey,
    ApiError,
    Timeout,
    ImportError,
    /// Call succeeded but the output failed validation. Telemetry only.
    ParseError,
}

impl LlmStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LlmStatus::Ok => "ok",
            LlmStatus::NoApiKey => "no_api_key",
            LlmStatus::ApiError => "api_error",
            LlmStatus::Timeout => "timeout",
            LlmStatus::ImportError => "import_error",
            LlmStatus::ParseError => "parse_error",
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, LlmStatus::Ok)
    }
}

impl fmt::Display for LlmStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&ProviderError> for LlmStatus {
    fn from(err: &ProviderError) -> Self {
        match err {
            ProviderError::NotConfigured(_) => LlmStatus::NoApiKey,
            ProviderError::Timeout(_) => LlmStatus::Timeout,
            ProviderError::Unavailable(_) => LlmStatus::ImportError,
            ProviderError::HttpError(_)
            | ProviderError::RateLimited { .. }
            | ProviderError::ApiError { .. }
            | ProviderError::ParseError(_)
            | ProviderError::AuthError => LlmStatus::ApiError,
        }
    }
}

/// What came back from one completion attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum CallOutcome {
    Completed { text: String },
    Failed { status: LlmStatus, error: String },
}

/// Result of [`LlmGateway::complete`].
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayResponse {
    pub outcome: CallOutcome,
    pub provider: String,
    pub model: String,
    pub latency_ms: u64,
    pub tokens_in: u32,
    pub tokens_out: u32,
}

impl GatewayResponse {
    pub fn status(&self) -> LlmStatus {
        match &self.outcome {
            CallOutcome::Completed { .. } => LlmStatus::Ok,
            CallOutcome::Failed { status, .. } => *status,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match &self.outcome {
            CallOutcome::Completed { text } => Some(text),
            CallOutcome::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            CallOutcome::Completed { .. } => None,
            CallOutcome::Failed { error, .. } => Some(error),
        }
    }
}

/// Single-message completion front end for the agents.
#[derive(Clone)]
pub struct LlmGateway {
    provider: Arc<dyn LlmProvider>,
    config: CompletionConfig,
}

impl fmt::Debug for LlmGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmGateway")
            .field("provider", &self.provider.name())
            .field("config", &self.config)
            .finish()
    }
}

impl LlmGateway {
    pub fn new(provider: Arc<dyn LlmProvider>, config: CompletionConfig) -> Self {
        Self { provider, config }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn default_model(&self) -> &str {
        &self.config.model
    }

    /// Whether the provider has a credential to call with.
    pub async fn health_check(&self) -> bool {
        self.provider.health_check().await
    }

    /// Send `prompt` as a single user message.
    ///
    /// `model` and `temperature` override the configured defaults for this
    /// call only.
    pub async fn complete(
        &self,
        prompt: &str,
        model: Option<&str>,
        temperature: Option<f32>,
    ) -> GatewayResponse {
        let mut config = self.config.clone();
        if let Some(model) = model {
            config.model = model.to_string();
        }
        if let Some(temperature) = temperature {
            config.temperature = temperature;
        }

        let started = Instant::now();
        let result = tokio::time::timeout(
            config.timeout,
            self.provider
                .complete(vec![ChatMessage::user(prompt)], &config),
        )
        .await;
        let latency_ms = started.elapsed().as_millis() as u64;

        let mut response = GatewayResponse {
            outcome: CallOutcome::Failed {
                status: LlmStatus::Timeout,
                error: format!("no response within {:?}", config.timeout),
            },
            provider: self.provider.name().to_string(),
            model: config.model.clone(),
            latency_ms,
            tokens_in: 0,
            tokens_out: 0,
        };

        match result {
            Ok(Ok(completion)) => {
                response.outcome = CallOutcome::Completed {
                    text: completion.content,
                };
                response.model = completion.model;
                response.tokens_in = completion.usage.prompt_tokens;
                response.tokens_out = completion.usage.completion_tokens;
            }
            Ok(Err(err)) => {
                let status = LlmStatus::from(&err);
                tracing::warn!(
                    provider = %response.provider,
                    model = %response.model,
                    status = %status,
                    error = %err,
                    "LLM call failed"
                );
                response.outcome = CallOutcome::Failed {
                    status,
                    error: err.to_string(),
                };
            }
            Err(_) => {
                tracing::warn!(
                    provider = %response.provider,
                    model = %response.model,
                    timeout = ?config.timeout,
                    "LLM call timed out"
                );
            }
        }

        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{CompletionResponse, TokenUsage};
    use async_trait::async_trait;
    use std::time::Duration;

    enum Behavior {
        Reply(&'static str),
        Fail(fn() -> ProviderError),
        Hang,
    }

    struct ScriptedProvider {
        behavior: Behavior,
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        async fn complete(
            &self,
            messages: Vec<ChatMessage>,
            config: &CompletionConfig,
        ) -> Result<CompletionResponse, ProviderError> {
            assert_eq!(messages.len(), 1);
            assert_eq!(messages[0].role, "user");
            match &self.behavior {
                Behavior::Reply(text) => Ok(CompletionResponse {
                    content: text.to_string(),
                    usage: TokenUsage {
                        prompt_tokens: 120,
                        completion_tokens: 30,
                    },
                    model: config.model.clone(),
                    stop_reason: Some("stop".to_string()),
                }),
                Behavior::Fail(make) => Err(make()),
                Behavior::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    unreachable!()
                }
            }
        }

        async fn health_check(&self) -> bool {
            true
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    fn gateway(behavior: Behavior) -> LlmGateway {
        LlmGateway::new(
            Arc::new(ScriptedProvider { behavior }),
            CompletionConfig {
                timeout: Duration::from_secs(5),
                ..CompletionConfig::default()
            },
        )
    }

    #[tokio::test]
    async fn test_completed_call() {
        let response = gateway(Behavior::Reply("hello"))
            .complete("prompt", None, None)
            .await;
        assert_eq!(response.status(), LlmStatus::Ok);
        assert_eq!(response.text(), Some("hello"));
        assert_eq!(response.error(), None);
        assert_eq!(response.provider, "scripted");
        assert_eq!(response.model, "llama-3.3-70b-versatile");
        assert_eq!(response.tokens_in, 120);
        assert_eq!(response.tokens_out, 30);
    }

    #[tokio::test]
    async fn test_health_check_reflects_credential() {
        use crate::providers::ChatCompletionsProvider;
        use airopa_core::ProviderKind;

        let keyed = LlmGateway::new(
            Arc::new(ChatCompletionsProvider::new(ProviderKind::Groq, "gsk-test")),
            CompletionConfig::default(),
        );
        let unkeyed = LlmGateway::new(
            Arc::new(ChatCompletionsProvider::new(ProviderKind::Groq, "")),
            CompletionConfig::default(),
        );
        assert!(keyed.health_check().await);
        assert!(!unkeyed.health_check().await);
    }

    #[tokio::test]
    async fn test_model_override() {
        let response = gateway(Behavior::Reply("x"))
            .complete("prompt", Some("mixtral-8x7b"), Some(0.0))
            .await;
        assert_eq!(response.model, "mixtral-8x7b");
    }

    #[tokio::test]
    async fn test_error_statuses() {
        let cases: [(fn() -> ProviderError, LlmStatus); 5] = [
            (
                || ProviderError::NotConfigured("No API key configured for provider 'groq'".into()),
                LlmStatus::NoApiKey,
            ),
            (
                || ProviderError::Timeout(Duration::from_secs(1)),
                LlmStatus::Timeout,
            ),
            (
                || ProviderError::Unavailable("no http".into()),
                LlmStatus::ImportError,
            ),
            (
                || ProviderError::RateLimited { retry_after: None },
                LlmStatus::ApiError,
            ),
            (
                || ProviderError::ApiError {
                    status: 500,
                    message: "boom".into(),
                },
                LlmStatus::ApiError,
            ),
        ];

        for (make, expected) in cases {
            let response = gateway(Behavior::Fail(make)).complete("p", None, None).await;
            assert_eq!(response.status(), expected);
            assert!(response.text().is_none());
            assert_eq!(response.tokens_in, 0);
        }
    }

    #[tokio::test]
    async fn test_no_api_key_message_preserved() {
        let response = gateway(Behavior::Fail(|| {
            ProviderError::NotConfigured("No API key configured for provider 'groq'".into())
        }))
        .complete("p", None, None)
        .await;
        assert_eq!(
            response.error(),
            Some("No API key configured for provider 'groq'")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_provider_times_out() {
        let response = gateway(Behavior::Hang).complete("p", None, None).await;
        assert_eq!(response.status(), LlmStatus::Timeout);
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(
            serde_json::to_string(&LlmStatus::NoApiKey).unwrap(),
            "\"no_api_key\""
        );
        assert_eq!(LlmStatus::ParseError.to_string(), "parse_error");
    }
}
