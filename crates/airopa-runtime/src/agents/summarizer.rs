//! News-card summaries.

use airopa_core::{
    content::prompt_excerpt, excerpt, parse_summary, AiConfig, Article, FeatureMode, SummaryResult,
};

use super::LOG_TITLE_CHARS;
use crate::gateway::LlmGateway;
use crate::prompts::{summary_prompt, PromptFields, SUMMARY_PROMPT_VERSION};
use crate::telemetry::TelemetryRecord;

/// An article after summarization and the telemetry of its LLM call, if any.
#[derive(Debug, Clone)]
pub struct Summarized {
    pub article: Article,
    pub telemetry: Option<TelemetryRecord>,
}

impl Summarized {
    fn unchanged(article: Article) -> Self {
        Self {
            article,
            telemetry: None,
        }
    }
}

/// LLM summarizer. There is no deterministic fallback: on failure the
/// article keeps whatever summary it had.
#[derive(Debug, Clone)]
pub struct Summarizer {
    gateway: LlmGateway,
    mode: FeatureMode,
    content_chars: usize,
    min_content_chars: usize,
}

impl Summarizer {
    pub fn new(gateway: LlmGateway, mode: FeatureMode) -> Self {
        Self {
            gateway,
            mode,
            content_chars: 2000,
            min_content_chars: 200,
        }
    }

    pub fn from_config(gateway: LlmGateway, ai: &AiConfig) -> Self {
        Self::new(gateway, ai.summary_mode())
            .with_content_chars(ai.summary_content_chars)
            .with_min_content_chars(ai.summary_min_content_chars)
    }

    pub fn with_content_chars(mut self, chars: usize) -> Self {
        self.content_chars = chars;
        self
    }

    pub fn with_min_content_chars(mut self, chars: usize) -> Self {
        self.min_content_chars = chars;
        self
    }

    pub fn mode(&self) -> FeatureMode {
        self.mode
    }

    pub async fn summarize(&self, mut article: Article) -> Summarized {
        if !self.mode.is_enabled() {
            return Summarized::unchanged(article);
        }

        let content_len = article.content.chars().count();
        if content_len < self.min_content_chars {
            tracing::info!(
                title = %article.short_title(LOG_TITLE_CHARS),
                chars = content_len,
                "Skipping summary, content too short"
            );
            return Summarized::unchanged(article);
        }

        let (summary, telemetry) = self.summarize_with_llm(&article).await;
        let telemetry = Some(telemetry);

        let Some(summary) = summary else {
            return Summarized { article, telemetry };
        };

        match self.mode {
            FeatureMode::Shadow => {
                tracing::info!(
                    title = %article.short_title(LOG_TITLE_CHARS),
                    summary = %excerpt(&summary, 80),
                    "Shadow summary"
                );
            }
            _ if summary == SummaryResult::NOT_RELEVANT => {
                tracing::info!(
                    title = %article.short_title(LOG_TITLE_CHARS),
                    "Summarizer flagged article as not relevant"
                );
            }
            _ => article.summary = summary,
        }

        Summarized { article, telemetry }
    }

    async fn summarize_with_llm(&self, article: &Article) -> (Option<String>, TelemetryRecord) {
        let content = prompt_excerpt(&article.content, self.content_chars);
        let prompt = summary_prompt(PromptFields {
            source: &article.source,
            title: &article.title,
            content: &content,
        });

        let response = self.gateway.complete(&prompt, None, None).await;
        let telemetry =
            TelemetryRecord::from_response(&article.url, SUMMARY_PROMPT_VERSION, &response);

        let Some(text) = response.text() else {
            return (None, telemetry);
        };

        let parsed = parse_summary(text);
        if !parsed.valid {
            tracing::warn!(
                title = %article.short_title(LOG_TITLE_CHARS),
                reason = %parsed.fallback_reason,
                "Summary validation failed"
            );
            let telemetry = telemetry.parse_failed(&parsed.fallback_reason);
            return (None, telemetry);
        }

        (Some(parsed.text), telemetry)
    }
}
