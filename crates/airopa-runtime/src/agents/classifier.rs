//! Category, country and EU-relevance assignment.

use airopa_core::{
    content::prompt_excerpt, parse_classification, validate_classification, AiConfig, Article,
    ClassificationResult, FeatureMode, KeywordClassifier,
};

use super::LOG_TITLE_CHARS;
use crate::gateway::LlmGateway;
use crate::prompts::{classification_prompt, PromptFields, CLASSIFICATION_PROMPT_VERSION};
use crate::telemetry::TelemetryRecord;

/// A classified article and the telemetry of its LLM call, if one was made.
#[derive(Debug, Clone)]
pub struct Classified {
    pub article: Article,
    pub telemetry: Option<TelemetryRecord>,
}

/// LLM classifier with keyword fallback.
#[derive(Debug, Clone)]
pub struct LlmClassifier {
    gateway: LlmGateway,
    mode: FeatureMode,
    content_chars: usize,
    keywords: KeywordClassifier,
}

impl LlmClassifier {
    pub fn new(gateway: LlmGateway, mode: FeatureMode) -> Self {
        Self {
            gateway,
            mode,
            content_chars: 1500,
            keywords: KeywordClassifier::new(),
        }
    }

    /// Mode and excerpt length from the `ai` config section.
    pub fn from_config(gateway: LlmGateway, ai: &AiConfig) -> Self {
        Self::new(gateway, ai.classification_mode())
            .with_content_chars(ai.classification_content_chars)
    }

    pub fn with_content_chars(mut self, chars: usize) -> Self {
        self.content_chars = chars;
        self
    }

    pub fn mode(&self) -> FeatureMode {
        self.mode
    }

    /// Classify according to the configured mode.
    pub async fn classify(&self, article: Article) -> Classified {
        if !self.mode.is_enabled() {
            return self.keyword_fallback(article);
        }

        let (result, telemetry) = self.classify_with_llm(&article).await;
        let telemetry = Some(telemetry);

        if self.mode == FeatureMode::Shadow {
            if let Some(result) = &result {
                tracing::info!(
                    title = %article.short_title(LOG_TITLE_CHARS),
                    llm_category = %result.category,
                    llm_country = %result.country,
                    llm_eu_relevance = result.eu_relevance,
                    "Shadow classification, using keywords instead"
                );
            }
            return Classified {
                article: self.keywords.classify(article),
                telemetry,
            };
        }

        match result {
            Some(result) if result.valid => Classified {
                article: apply(article, result),
                telemetry,
            },
            _ => {
                tracing::warn!(
                    title = %article.short_title(LOG_TITLE_CHARS),
                    "LLM classification failed, falling back to keywords"
                );
                Classified {
                    article: self.keywords.classify(article),
                    telemetry,
                }
            }
        }
    }

    /// Deterministic path with no LLM call and no telemetry.
    pub fn keyword_fallback(&self, article: Article) -> Classified {
        Classified {
            article: self.keywords.classify(article),
            telemetry: None,
        }
    }

    /// One LLM attempt whatever the mode, with the demotion rules applied.
    /// The result is None when the call or the parse failed.
    pub async fn classify_with_llm(
        &self,
        article: &Article,
    ) -> (Option<ClassificationResult>, TelemetryRecord) {
        let content = prompt_excerpt(&article.content, self.content_chars);
        let prompt = classification_prompt(PromptFields {
            source: &article.source,
            title: &article.title,
            content: &content,
        });

        let response = self.gateway.complete(&prompt, None, None).await;
        let telemetry =
            TelemetryRecord::from_response(&article.url, CLASSIFICATION_PROMPT_VERSION, &response);

        let Some(text) = response.text() else {
            return (None, telemetry);
        };

        let parsed = parse_classification(text);
        if !parsed.valid {
            tracing::warn!(
                title = %article.short_title(LOG_TITLE_CHARS),
                reason = %parsed.fallback_reason,
                "LLM response validation failed"
            );
            let telemetry = telemetry.parse_failed(&parsed.fallback_reason);
            return (None, telemetry);
        }

        (Some(validate_classification(parsed, &article.title)), telemetry)
    }
}

fn apply(mut article: Article, result: ClassificationResult) -> Article {
    article.category = Some(result.category);
    article.country = result.country;
    article.eu_relevance = result.eu_relevance;
    article.confidence = result.confidence;
    article
}
