//! LLM-backed agents with a deterministic fallback.
//!
//! Each agent runs in one of three [`FeatureMode`](airopa_core::FeatureMode)s:
//! - `Disabled`: no LLM call, no telemetry
//! - `Shadow`: call the LLM and log what it said, keep the deterministic result
//! - `Live`: apply a valid LLM result, fall back otherwise
//!
//! Every attempted call yields a [`TelemetryRecord`](crate::TelemetryRecord),
//! success or not.

mod classifier;
mod summarizer;

pub use classifier::{Classified, LlmClassifier};
pub use summarizer::{Summarized, Summarizer};

/// Characters of the title used in log lines.
const LOG_TITLE_CHARS: usize = 60;

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted provider shared by agent and orchestrator tests.

    use crate::providers::{
        ChatMessage, CompletionConfig, CompletionResponse, LlmProvider, ProviderError, TokenUsage,
    };
    use crate::LlmGateway;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Clone)]
    pub enum Reply {
        Text(String),
        NoApiKey,
        ServerError,
    }

    impl Reply {
        pub fn text(s: &str) -> Self {
            Reply::Text(s.to_string())
        }
    }

    /// Answers classification prompts and summary prompts with fixed replies.
    pub struct MockProvider {
        classification: Reply,
        summary: Reply,
        usage: TokenUsage,
        calls: AtomicUsize,
    }

    impl MockProvider {
        pub fn new(classification: Reply, summary: Reply) -> Self {
            Self {
                classification,
                summary,
                usage: TokenUsage {
                    prompt_tokens: 100,
                    completion_tokens: 20,
                },
                calls: AtomicUsize::new(0),
            }
        }

        pub fn with_usage(mut self, prompt_tokens: u32, completion_tokens: u32) -> Self {
            self.usage = TokenUsage {
                prompt_tokens,
                completion_tokens,
            };
            self
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LlmProvider for MockProvider {
        async fn complete(
            &self,
            messages: Vec<ChatMessage>,
            config: &CompletionConfig,
        ) -> Result<CompletionResponse, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let prompt = messages
                .last()
                .map(|m| m.content.as_str())
                .unwrap_or_default();
            let reply = if prompt.starts_with("You are an editorial classifier") {
                &self.classification
            } else {
                &self.summary
            };

            match reply {
                Reply::Text(text) => Ok(CompletionResponse {
                    content: text.clone(),
                    usage: self.usage,
                    model: config.model.clone(),
                    stop_reason: Some("stop".to_string()),
                }),
                Reply::NoApiKey => Err(ProviderError::NotConfigured(
                    "No API key configured for provider 'groq'".to_string(),
                )),
                Reply::ServerError => Err(ProviderError::ApiError {
                    status: 503,
                    message: "overloaded".to_string(),
                }),
            }
        }

        async fn health_check(&self) -> bool {
            true
        }

        fn name(&self) -> &str {
            "mock"
        }
    }

    pub fn gateway(provider: &Arc<MockProvider>) -> LlmGateway {
        LlmGateway::new(provider.clone(), CompletionConfig::default())
    }

    /// Long enough to pass the summary content gate.
    pub fn long_content() -> String {
        "Mistral AI, the Paris-based startup, closed a new funding round to expand \
         its research team and open-weight model work across Europe. "
            .repeat(3)
    }
}
