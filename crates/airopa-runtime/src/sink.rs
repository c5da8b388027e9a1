//! Collaborators at the edges of a run: where articles come from and where
//! finished articles, telemetry and metrics go.
//!
//! Fetching and persistence mechanics live outside this crate. The in-memory
//! [`StaticSource`] and [`MemorySink`] back the CLI and the tests.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

use airopa_core::{Article, RawArticle, SourceMetric};

use crate::telemetry::TelemetryRecord;

/// Errors from sources and sinks. The orchestrator logs them and moves on.
#[derive(Error, Debug)]
pub enum CollaboratorError {
    #[error("Source '{name}' failed: {message}")]
    Fetch { name: String, message: String },

    #[error("Storage failed: {0}")]
    Storage(String),

    #[error("Failed to read articles: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid article JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Yields raw articles for one run.
#[async_trait]
pub trait ArticleSource: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch(&self) -> Result<Vec<RawArticle>, CollaboratorError>;
}

/// Receives the results of a run.
#[async_trait]
pub trait ArticleSink: Send + Sync {
    /// Store one article. `Ok(false)` means it was already stored.
    async fn store_article(&self, article: &Article) -> Result<bool, CollaboratorError>;

    async fn record_telemetry(&self, records: &[TelemetryRecord])
        -> Result<(), CollaboratorError>;

    async fn record_source_metrics(&self, metrics: &[SourceMetric])
        -> Result<(), CollaboratorError>;
}

/// A fixed list of raw articles.
#[derive(Debug, Clone)]
pub struct StaticSource {
    name: String,
    articles: Vec<RawArticle>,
}

impl StaticSource {
    pub fn new(name: impl Into<String>, articles: Vec<RawArticle>) -> Self {
        Self {
            name: name.into(),
            articles,
        }
    }

    /// Parse a JSON array of raw articles.
    pub fn from_json(name: impl Into<String>, json: &str) -> Result<Self, CollaboratorError> {
        Ok(Self::new(name, serde_json::from_str(json)?))
    }

    /// Read a JSON array of raw articles; the file name becomes the source name.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, CollaboratorError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        Self::from_json(path.display().to_string(), &json)
    }

    pub fn len(&self) -> usize {
        self.articles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.articles.is_empty()
    }
}

#[async_trait]
impl ArticleSource for StaticSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> Result<Vec<RawArticle>, CollaboratorError> {
        Ok(self.articles.clone())
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    articles: Vec<Article>,
    urls: HashSet<String>,
    keys: HashSet<String>,
    telemetry: Vec<TelemetryRecord>,
    source_metrics: Vec<SourceMetric>,
}

/// In-memory sink. Rejects an article whose URL or storage key was already
/// stored.
#[derive(Debug, Default)]
pub struct MemorySink {
    state: RwLock<MemoryState>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn articles(&self) -> Vec<Article> {
        self.state.read().articles.clone()
    }

    pub fn telemetry(&self) -> Vec<TelemetryRecord> {
        self.state.read().telemetry.clone()
    }

    pub fn source_metrics(&self) -> Vec<SourceMetric> {
        self.state.read().source_metrics.clone()
    }
}

#[async_trait]
impl ArticleSink for MemorySink {
    async fn store_article(&self, article: &Article) -> Result<bool, CollaboratorError> {
        let key = article.storage_key();
        let mut state = self.state.write();

        if state.urls.contains(&article.url) || state.keys.contains(&key) {
            tracing::debug!(title = %article.short_title(60), "Article already stored");
            return Ok(false);
        }

        state.urls.insert(article.url.clone());
        state.keys.insert(key);
        state.articles.push(article.clone());
        Ok(true)
    }

    async fn record_telemetry(
        &self,
        records: &[TelemetryRecord],
    ) -> Result<(), CollaboratorError> {
        self.state.write().telemetry.extend_from_slice(records);
        Ok(())
    }

    async fn record_source_metrics(
        &self,
        metrics: &[SourceMetric],
    ) -> Result<(), CollaboratorError> {
        self.state.write().source_metrics.extend_from_slice(metrics);
        Ok(())
    }
}
