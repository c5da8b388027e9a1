//! One pipeline run, start to finish.
//!
//! Steps, in order:
//! 1. Fetch every source; a failing source is logged and skipped
//! 2. Normalize source names, drop stale articles, dedupe
//! 3. Classify, going straight to keywords once the token budget is spent
//! 4. Summarize, under the same budget check
//! 5. Quality-score and store articles at or above the publish threshold
//! 6. Hand telemetry and per-source metrics to the sink
//!
//! Articles are processed sequentially. A run never fails once built:
//! collaborator errors are logged and counted, not propagated.
//!
//! The per-article stages ([`Pipeline::classify_article`],
//! [`Pipeline::summarize_article`], [`Pipeline::process`] and
//! [`Pipeline::compare`]) apply the same budget check outside a full run.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

use airopa_core::{
    dedupe, source_metrics, Article, Category, ClassificationResult, ConfigError, PipelineConfig,
    QualityScorer, ScraperConfig, SourceMetric,
};

use crate::agents::{LlmClassifier, Summarizer};
use crate::budget::TokenBudget;
use crate::gateway::{LlmGateway, LlmStatus};
use crate::providers::{CompletionConfig, LlmProvider, ProviderError, ProviderRegistry};
use crate::sink::{ArticleSink, ArticleSource};
use crate::telemetry::TelemetryRecord;

/// Errors building a pipeline.
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Counts and outputs of one run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    /// Raw articles returned by all sources
    pub fetched: usize,
    pub stale: usize,
    /// Articles left after stale filtering and dedupe
    pub unique: usize,
    pub classified: usize,
    pub llm_ok: usize,
    pub llm_failed: usize,
    pub budget_skipped: usize,
    pub keyword_only: usize,
    /// Articles carrying a summary after the summary step
    pub summarized: usize,
    /// Summaries skipped because the budget was spent
    pub summary_skipped: usize,
    pub high_quality: usize,
    pub stored: usize,
    pub failed_sources: usize,
    pub tokens_used: u64,
    pub telemetry: Vec<TelemetryRecord>,
    pub source_metrics: Vec<SourceMetric>,
    /// Every scored article, stored or not
    pub articles: Vec<Article>,
}

/// An article after one LLM stage.
#[derive(Debug, Clone)]
pub struct StageOutput {
    pub article: Article,
    /// The token budget was spent, so the LLM was not called
    pub budget_skipped: bool,
}

/// Keyword and LLM classification of the same article, side by side.
#[derive(Debug, Clone, Serialize)]
pub struct Comparison {
    pub title: String,
    pub source: String,
    pub url: String,
    pub keyword_category: Option<Category>,
    pub keyword_country: String,
    /// None when the call failed, did not parse, or the budget was spent
    pub llm: Option<ClassificationResult>,
    /// None when the budget was spent before the call
    pub telemetry: Option<TelemetryRecord>,
}

impl Comparison {
    /// The LLM produced a category and it agrees with the keywords.
    pub fn category_match(&self) -> bool {
        self.llm
            .as_ref()
            .is_some_and(|r| Some(r.category) == self.keyword_category)
    }
}

/// The classification and scoring pipeline.
#[derive(Debug, Clone)]
pub struct Pipeline {
    gateway: LlmGateway,
    classifier: LlmClassifier,
    summarizer: Summarizer,
    scorer: QualityScorer,
    scraper: ScraperConfig,
    publish_threshold: f64,
    budget_max_tokens: u64,
}

impl Pipeline {
    /// Build from configuration with the default provider registry.
    pub fn from_config(config: PipelineConfig) -> Result<Self, RuntimeError> {
        PipelineBuilder::new().config(config).build()
    }

    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// A fresh budget sized by `ai.budget_max_tokens_per_run`.
    pub fn new_budget(&self) -> TokenBudget {
        TokenBudget::new(self.budget_max_tokens)
    }

    /// Whether the configured provider has an API key.
    pub async fn provider_ready(&self) -> bool {
        self.gateway.health_check().await
    }

    /// Classify one article, going straight to keywords once `budget` is spent.
    pub async fn classify_article(
        &self,
        article: Article,
        budget: &TokenBudget,
        telemetry: &mut Vec<TelemetryRecord>,
    ) -> StageOutput {
        if self.classifier.mode().is_enabled() && budget.exceeded() {
            return StageOutput {
                article: self.classifier.keyword_fallback(article).article,
                budget_skipped: true,
            };
        }

        let out = self.classifier.classify(article).await;
        track(budget, telemetry, out.telemetry);
        StageOutput {
            article: out.article,
            budget_skipped: false,
        }
    }

    /// Summarize one article. Once `budget` is spent the article passes
    /// through untouched.
    pub async fn summarize_article(
        &self,
        article: Article,
        budget: &TokenBudget,
        telemetry: &mut Vec<TelemetryRecord>,
    ) -> StageOutput {
        if self.summarizer.mode().is_enabled() && budget.exceeded() {
            return StageOutput {
                article,
                budget_skipped: true,
            };
        }

        let out = self.summarizer.summarize(article).await;
        track(budget, telemetry, out.telemetry);
        StageOutput {
            article: out.article,
            budget_skipped: false,
        }
    }

    /// Classify, summarize and score one article without storing it.
    pub async fn process(
        &self,
        article: Article,
        budget: &TokenBudget,
        telemetry: &mut Vec<TelemetryRecord>,
    ) -> Article {
        let classified = self.classify_article(article, budget, telemetry).await;
        let summarized = self
            .summarize_article(classified.article, budget, telemetry)
            .await;
        self.scorer.assess(summarized.article)
    }

    /// Classify with keywords and with the LLM, whatever the configured mode.
    /// The LLM call still counts against `budget` and is skipped once it is
    /// spent.
    pub async fn compare(&self, article: Article, budget: &TokenBudget) -> Comparison {
        let keyword = self.classifier.keyword_fallback(article.clone()).article;

        let (llm, record) = if budget.exceeded() {
            (None, None)
        } else {
            let (result, record) = self.classifier.classify_with_llm(&article).await;
            budget.record(record.tokens_in, record.tokens_out);
            (result, Some(record))
        };

        Comparison {
            title: article.title,
            source: article.source,
            url: article.url,
            keyword_category: keyword.category,
            keyword_country: keyword.country,
            llm,
            telemetry: record,
        }
    }

    pub async fn run(
        &self,
        sources: &[Arc<dyn ArticleSource>],
        sink: &dyn ArticleSink,
    ) -> RunReport {
        self.run_at(sources, sink, Utc::now()).await
    }

    /// Run with an explicit clock for the staleness check.
    pub async fn run_at(
        &self,
        sources: &[Arc<dyn ArticleSource>],
        sink: &dyn ArticleSink,
        now: DateTime<Utc>,
    ) -> RunReport {
        let mut report = RunReport::default();

        let llm_enabled =
            self.classifier.mode().is_enabled() || self.summarizer.mode().is_enabled();
        if llm_enabled && !self.provider_ready().await {
            tracing::warn!(
                provider = %self.gateway.provider_name(),
                "No API key configured, LLM calls will fail and fall back"
            );
        }

        let mut articles = Vec::new();
        for source in sources {
            match source.fetch().await {
                Ok(raw) => {
                    report.fetched += raw.len();
                    articles.extend(
                        raw.into_iter()
                            .map(|r| Article::from_raw(r, &self.scraper.source_name_map)),
                    );
                }
                Err(e) => {
                    tracing::warn!(source = %source.name(), error = %e, "Source fetch failed, skipping");
                    report.failed_sources += 1;
                }
            }
        }

        let max_age = self.scraper.max_article_age_days;
        let before = articles.len();
        articles.retain(|a| !a.is_stale(max_age, now));
        report.stale = before - articles.len();

        let mut fetched_by_source: BTreeMap<String, usize> = BTreeMap::new();
        for article in &articles {
            *fetched_by_source.entry(article.source.clone()).or_insert(0) += 1;
        }

        let articles = dedupe(articles);
        report.unique = articles.len();
        tracing::info!(
            fetched = report.fetched,
            stale = report.stale,
            unique = report.unique,
            "Fetched articles"
        );

        let budget = self.new_budget();
        let mut telemetry = Vec::new();

        let classified = self
            .classify_all(articles, &budget, &mut telemetry, &mut report)
            .await;
        let summarized = self
            .summarize_all(classified, &budget, &mut telemetry, &mut report)
            .await;

        if let Err(e) = sink.record_telemetry(&telemetry).await {
            tracing::warn!(error = %e, records = telemetry.len(), "Failed to record telemetry");
        }

        let scored: Vec<Article> = summarized
            .into_iter()
            .map(|a| self.scorer.assess(a))
            .collect();

        let mut stored_by_source: BTreeMap<String, usize> = BTreeMap::new();
        for article in scored
            .iter()
            .filter(|a| a.quality_score >= self.publish_threshold)
        {
            report.high_quality += 1;
            match sink.store_article(article).await {
                Ok(true) => {
                    report.stored += 1;
                    *stored_by_source.entry(article.source.clone()).or_insert(0) += 1;
                }
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(title = %article.short_title(60), error = %e, "Failed to store article");
                }
            }
        }
        tracing::info!(
            high_quality = report.high_quality,
            stored = report.stored,
            "Stored articles"
        );

        let metrics = source_metrics(
            &fetched_by_source,
            &stored_by_source,
            &scored,
            self.scraper.eu_relevance_threshold,
        );
        if let Err(e) = sink.record_source_metrics(&metrics).await {
            tracing::warn!(error = %e, "Failed to record source metrics");
        }

        report.tokens_used = budget.used();
        report.telemetry = telemetry;
        report.source_metrics = metrics;
        report.articles = scored;
        report
    }

    async fn classify_all(
        &self,
        articles: Vec<Article>,
        budget: &TokenBudget,
        telemetry: &mut Vec<TelemetryRecord>,
        report: &mut RunReport,
    ) -> Vec<Article> {
        let mut classified = Vec::with_capacity(articles.len());

        for article in articles {
            let out = self.classify_article(article, budget, telemetry).await;
            if out.budget_skipped {
                if report.budget_skipped == 0 {
                    tracing::warn!(
                        used = budget.used(),
                        max = budget.max_tokens(),
                        "Token budget exceeded, using keywords for remaining articles"
                    );
                }
                report.budget_skipped += 1;
            }
            classified.push(out.article);
        }

        report.classified = classified.len();
        for record in telemetry.iter().filter(|t| t.is_classification()) {
            if record.status == LlmStatus::Ok {
                report.llm_ok += 1;
            } else {
                report.llm_failed += 1;
            }
        }
        report.keyword_only = report
            .classified
            .saturating_sub(report.llm_ok + report.llm_failed + report.budget_skipped);

        tracing::info!(
            classified = report.classified,
            llm_ok = report.llm_ok,
            llm_failed = report.llm_failed,
            budget_skipped = report.budget_skipped,
            keyword_only = report.keyword_only,
            tokens_used = budget.used(),
            "Classified articles"
        );
        classified
    }

    async fn summarize_all(
        &self,
        articles: Vec<Article>,
        budget: &TokenBudget,
        telemetry: &mut Vec<TelemetryRecord>,
        report: &mut RunReport,
    ) -> Vec<Article> {
        let llm_enabled = self.summarizer.mode().is_enabled();
        let mut summarized = Vec::with_capacity(articles.len());

        for article in articles {
            let out = self.summarize_article(article, budget, telemetry).await;
            if out.budget_skipped {
                if report.summary_skipped == 0 {
                    tracing::warn!(
                        used = budget.used(),
                        max = budget.max_tokens(),
                        "Token budget exceeded, skipping summaries for remaining articles"
                    );
                }
                report.summary_skipped += 1;
            }
            summarized.push(out.article);
        }

        report.summarized = summarized.iter().filter(|a| !a.summary.is_empty()).count();
        if llm_enabled {
            tracing::info!(
                summarized = report.summarized,
                total = summarized.len(),
                skipped = report.summary_skipped,
                tokens_used = budget.used(),
                "Summarized articles"
            );
        }
        summarized
    }
}

fn track(
    budget: &TokenBudget,
    telemetry: &mut Vec<TelemetryRecord>,
    record: Option<TelemetryRecord>,
) {
    if let Some(record) = record {
        budget.record(record.tokens_in, record.tokens_out);
        telemetry.push(record);
    }
}

/// Builder for [`Pipeline`].
#[derive(Default)]
pub struct PipelineBuilder {
    config: PipelineConfig,
    provider: Option<Arc<dyn LlmProvider>>,
    registry: Option<ProviderRegistry>,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Use this provider instead of looking one up by `ai.provider`.
    pub fn provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Registry used to resolve `ai.provider`. Defaults to Groq and Mistral.
    pub fn registry(mut self, registry: ProviderRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn build(self) -> Result<Pipeline, RuntimeError> {
        let PipelineConfig {
            ai,
            scraper,
            quality,
        } = self.config;

        let provider = match self.provider {
            Some(provider) => provider,
            None => self
                .registry
                .unwrap_or_else(ProviderRegistry::with_defaults)
                .for_ai_config(&ai)?,
        };

        let gateway = LlmGateway::new(provider, CompletionConfig::from_ai_config(&ai));
        tracing::debug!(
            provider = %gateway.provider_name(),
            model = %gateway.default_model(),
            classification = %ai.classification_mode(),
            summary = %ai.summary_mode(),
            "Pipeline configured"
        );

        Ok(Pipeline {
            classifier: LlmClassifier::from_config(gateway.clone(), &ai),
            summarizer: Summarizer::from_config(gateway.clone(), &ai),
            gateway,
            scorer: QualityScorer::from_config(&quality),
            scraper,
            publish_threshold: quality.publish_threshold,
            budget_max_tokens: ai.budget_max_tokens_per_run,
        })
    }
}

impl std::fmt::Debug for PipelineBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineBuilder")
            .field("config", &self.config)
            .field("provider", &self.provider.as_ref().map(|p| p.name().to_string()))
            .field("registry", &self.registry)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::testing::{MockProvider, Reply};
    use crate::sink::{CollaboratorError, MemorySink, StaticSource};
    use airopa_core::{Category, RawArticle};
    use async_trait::async_trait;
    use chrono::TimeZone;

    const POLICY_REPLY: &str =
        r#"{"category": "policy", "country": "Europe", "eu_relevance": 9, "confidence": 0.9}"#;
    const SUMMARY: &str = "Mistral AI raised a new round in Paris. The deal expands its European research team.";

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap()
    }

    /// ~900 words, tier-1 source, 7-word title: scores above 0.6 on keywords alone.
    fn strong(url: &str) -> RawArticle {
        RawArticle {
            title: "Paris startup raises fresh funding round today".to_string(),
            url: url.to_string(),
            source: "https://sifted.eu".to_string(),
            content: "startup funding news ".repeat(300),
            published_date: Some(Utc.with_ymd_and_hms(2026, 10, 15, 9, 0, 0).unwrap()),
            ..RawArticle::default()
        }
    }

    fn weak(url: &str) -> RawArticle {
        RawArticle {
            title: "Quarterly results".to_string(),
            url: url.to_string(),
            source: "Some Blog".to_string(),
            content: "Short piece.".to_string(),
            ..RawArticle::default()
        }
    }

    fn stale(url: &str) -> RawArticle {
        RawArticle {
            published_date: Some(Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()),
            ..strong(url)
        }
    }

    struct BrokenSource;

    #[async_trait]
    impl ArticleSource for BrokenSource {
        fn name(&self) -> &str {
            "broken"
        }

        async fn fetch(&self) -> Result<Vec<RawArticle>, CollaboratorError> {
            Err(CollaboratorError::Fetch {
                name: "broken".to_string(),
                message: "connection refused".to_string(),
            })
        }
    }

    fn pipeline(config: PipelineConfig, provider: &Arc<MockProvider>) -> Pipeline {
        Pipeline::builder()
            .config(config)
            .provider(provider.clone())
            .build()
            .unwrap()
    }

    fn sources(raw: Vec<RawArticle>) -> Vec<Arc<dyn ArticleSource>> {
        vec![Arc::new(StaticSource::new("fixture", raw))]
    }

    #[tokio::test]
    async fn test_keyword_only_run() {
        let provider = Arc::new(MockProvider::new(Reply::text(POLICY_REPLY), Reply::text(SUMMARY)));
        let pipeline = pipeline(PipelineConfig::default(), &provider);
        let sink = MemorySink::new();

        let raw = vec![
            strong("https://sifted.eu/a"),
            strong("https://sifted.eu/a"),
            weak("https://blog.example/b"),
            stale("https://sifted.eu/old"),
        ];
        let report = pipeline.run_at(&sources(raw), &sink, now()).await;

        assert_eq!(provider.calls(), 0);
        assert_eq!(report.fetched, 4);
        assert_eq!(report.stale, 1);
        assert_eq!(report.unique, 2);
        assert_eq!(report.classified, 2);
        assert_eq!(report.keyword_only, 2);
        assert_eq!(report.llm_ok + report.llm_failed + report.budget_skipped, 0);
        assert_eq!(report.high_quality, 1);
        assert_eq!(report.stored, 1);
        assert!(report.telemetry.is_empty());

        let stored = sink.articles();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].source, "Sifted");
        assert_eq!(stored[0].category, Some(Category::Startups));
        assert!(stored[0].quality_score >= 0.6);

        let sifted = report
            .source_metrics
            .iter()
            .find(|m| m.source_name == "Sifted")
            .unwrap();
        assert_eq!(sifted.articles_fetched, 2);
        assert_eq!(sifted.articles_stored, 1);
        assert_eq!(sink.source_metrics().len(), 2);
    }

    #[tokio::test]
    async fn test_live_classification_and_summary() {
        let provider = Arc::new(MockProvider::new(Reply::text(POLICY_REPLY), Reply::text(SUMMARY)));
        let mut config = PipelineConfig::default();
        config.ai.classification_enabled = true;
        config.ai.summary_enabled = true;
        config.ai.shadow_mode = false;
        let pipeline = pipeline(config, &provider);
        let sink = MemorySink::new();

        let report = pipeline
            .run_at(&sources(vec![strong("https://sifted.eu/a")]), &sink, now())
            .await;

        assert_eq!(provider.calls(), 2);
        assert_eq!(report.llm_ok, 1);
        assert_eq!(report.keyword_only, 0);
        assert_eq!(report.summarized, 1);
        assert_eq!(report.tokens_used, 240);
        assert_eq!(report.telemetry.len(), 2);
        assert_eq!(sink.telemetry().len(), 2);

        let article = &report.articles[0];
        assert_eq!(article.category, Some(Category::Policy));
        assert_eq!(article.eu_relevance, 9.0);
        assert_eq!(article.summary, SUMMARY);
        assert!((article.quality_score - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_budget_exhaustion_falls_back() {
        let provider = Arc::new(
            MockProvider::new(Reply::text(POLICY_REPLY), Reply::text(SUMMARY)).with_usage(80, 40),
        );
        let mut config = PipelineConfig::default();
        config.ai.classification_enabled = true;
        config.ai.summary_enabled = true;
        config.ai.shadow_mode = false;
        config.ai.budget_max_tokens_per_run = 100;
        let pipeline = pipeline(config, &provider);
        let sink = MemorySink::new();

        let raw = vec![
            strong("https://sifted.eu/a"),
            strong("https://sifted.eu/b"),
            strong("https://sifted.eu/c"),
        ];
        let report = pipeline.run_at(&sources(raw), &sink, now()).await;

        assert_eq!(provider.calls(), 1);
        assert_eq!(report.llm_ok, 1);
        assert_eq!(report.budget_skipped, 2);
        assert_eq!(report.keyword_only, 0);
        assert_eq!(report.summary_skipped, 3);
        assert_eq!(report.summarized, 0);
        assert_eq!(report.tokens_used, 120);
        assert_eq!(report.articles[0].category, Some(Category::Policy));
        assert_eq!(report.articles[1].category, Some(Category::Startups));
    }

    #[tokio::test]
    async fn test_llm_failures_counted() {
        let provider = Arc::new(MockProvider::new(Reply::NoApiKey, Reply::NoApiKey));
        let mut config = PipelineConfig::default();
        config.ai.classification_enabled = true;
        config.ai.summary_enabled = true;
        let pipeline = pipeline(config, &provider);
        let sink = MemorySink::new();

        let report = pipeline
            .run_at(&sources(vec![strong("https://sifted.eu/a")]), &sink, now())
            .await;

        assert_eq!(report.llm_failed, 1);
        assert_eq!(report.llm_ok, 0);
        assert_eq!(report.telemetry.len(), 2);
        assert!(report
            .telemetry
            .iter()
            .all(|t| t.status == LlmStatus::NoApiKey));
        assert_eq!(report.articles[0].category, Some(Category::Startups));
        assert_eq!(report.stored, 1);
    }

    #[tokio::test]
    async fn test_failing_source_is_skipped() {
        let provider = Arc::new(MockProvider::new(Reply::text(""), Reply::text("")));
        let pipeline = pipeline(PipelineConfig::default(), &provider);
        let sink = MemorySink::new();

        let sources: Vec<Arc<dyn ArticleSource>> = vec![
            Arc::new(BrokenSource),
            Arc::new(StaticSource::new("fixture", vec![strong("https://sifted.eu/a")])),
        ];
        let report = pipeline.run_at(&sources, &sink, now()).await;

        assert_eq!(report.failed_sources, 1);
        assert_eq!(report.fetched, 1);
        assert_eq!(report.stored, 1);
    }

    #[tokio::test]
    async fn test_already_stored_articles_not_counted() {
        let provider = Arc::new(MockProvider::new(Reply::text(""), Reply::text("")));
        let pipeline = pipeline(PipelineConfig::default(), &provider);
        let sink = MemorySink::new();

        let first = pipeline
            .run_at(&sources(vec![strong("https://sifted.eu/a")]), &sink, now())
            .await;
        let second = pipeline
            .run_at(&sources(vec![strong("https://sifted.eu/a")]), &sink, now())
            .await;

        assert_eq!(first.stored, 1);
        assert_eq!(second.high_quality, 1);
        assert_eq!(second.stored, 0);
        assert_eq!(sink.articles().len(), 1);
    }

    fn live_config(budget: u64) -> PipelineConfig {
        let mut config = PipelineConfig::default();
        config.ai.classification_enabled = true;
        config.ai.summary_enabled = true;
        config.ai.shadow_mode = false;
        config.ai.budget_max_tokens_per_run = budget;
        config
    }

    fn article(url: &str) -> Article {
        Article::from_raw(strong(url), &BTreeMap::new())
    }

    #[tokio::test]
    async fn test_process_applies_budget() {
        let provider = Arc::new(
            MockProvider::new(Reply::text(POLICY_REPLY), Reply::text(SUMMARY)).with_usage(80, 40),
        );
        let pipeline = pipeline(live_config(100), &provider);
        let budget = pipeline.new_budget();
        let mut telemetry = Vec::new();

        let first = pipeline
            .process(article("https://sifted.eu/a"), &budget, &mut telemetry)
            .await;
        let second = pipeline
            .process(article("https://sifted.eu/b"), &budget, &mut telemetry)
            .await;

        assert_eq!(provider.calls(), 1);
        assert_eq!(budget.used(), 120);
        assert_eq!(telemetry.len(), 1);
        assert_eq!(first.category, Some(Category::Policy));
        assert!(first.summary.is_empty());
        assert_eq!(second.category, Some(Category::Startups));
        assert!(second.quality_score > 0.0);
    }

    #[tokio::test]
    async fn test_stage_reports_budget_skip() {
        let provider = Arc::new(
            MockProvider::new(Reply::text(POLICY_REPLY), Reply::text(SUMMARY)).with_usage(80, 40),
        );
        let pipeline = pipeline(live_config(100), &provider);
        let budget = pipeline.new_budget();
        budget.record(100, 0);
        let mut telemetry = Vec::new();

        let classified = pipeline
            .classify_article(article("https://sifted.eu/a"), &budget, &mut telemetry)
            .await;
        let summarized = pipeline
            .summarize_article(classified.article, &budget, &mut telemetry)
            .await;

        assert!(classified.budget_skipped);
        assert!(summarized.budget_skipped);
        assert_eq!(provider.calls(), 0);
        assert!(telemetry.is_empty());
    }

    #[tokio::test]
    async fn test_compare_side_by_side() {
        let provider = Arc::new(MockProvider::new(Reply::text(POLICY_REPLY), Reply::text(SUMMARY)));
        // LLM classification is disabled by default; comparison calls it anyway
        let pipeline = pipeline(PipelineConfig::default(), &provider);
        let budget = pipeline.new_budget();

        let cmp = pipeline.compare(article("https://sifted.eu/a"), &budget).await;

        assert_eq!(provider.calls(), 1);
        assert_eq!(cmp.keyword_category, Some(Category::Startups));
        assert_eq!(cmp.keyword_country, "");
        let llm = cmp.llm.as_ref().unwrap();
        assert_eq!(llm.category, Category::Policy);
        assert_eq!(llm.country, "Europe");
        assert!(!cmp.category_match());
        assert_eq!(cmp.telemetry.unwrap().status, LlmStatus::Ok);
        assert_eq!(budget.used(), 120);
    }

    #[tokio::test]
    async fn test_compare_failures_and_spent_budget() {
        let provider = Arc::new(
            MockProvider::new(Reply::ServerError, Reply::text(SUMMARY)).with_usage(80, 40),
        );
        let pipeline = pipeline(live_config(100), &provider);
        let budget = pipeline.new_budget();

        let failed = pipeline.compare(article("https://sifted.eu/a"), &budget).await;
        assert!(failed.llm.is_none());
        assert!(!failed.category_match());
        assert_eq!(failed.telemetry.unwrap().status, LlmStatus::ApiError);

        budget.record(100, 0);
        let skipped = pipeline.compare(article("https://sifted.eu/b"), &budget).await;
        assert_eq!(provider.calls(), 1);
        assert!(skipped.llm.is_none());
        assert!(skipped.telemetry.is_none());
        assert_eq!(skipped.keyword_category, Some(Category::Startups));
    }

    #[tokio::test]
    async fn test_provider_ready() {
        let provider = Arc::new(MockProvider::new(Reply::text(""), Reply::text("")));
        assert!(pipeline(PipelineConfig::default(), &provider).provider_ready().await);
    }

    #[test]
    fn test_build_from_registry() {
        let mut config = PipelineConfig::default();
        config.ai.provider = airopa_core::ProviderKind::Mistral;
        let pipeline = Pipeline::from_config(config).unwrap();
        assert_eq!(pipeline.gateway.provider_name(), "mistral");
        assert_eq!(pipeline.gateway.default_model(), "mistral-small-latest");
        assert_eq!(
            pipeline.classifier.mode(),
            airopa_core::FeatureMode::Disabled
        );
    }

    #[test]
    fn test_build_rejects_unknown_provider() {
        let err = Pipeline::builder()
            .registry(ProviderRegistry::new())
            .build()
            .unwrap_err();
        assert!(matches!(err, RuntimeError::Provider(ProviderError::NotConfigured(_))));
    }
}
