//! Article records and the closed category set.
//!
//! An [`Article`] is created once per scraped item and handed from stage to
//! stage by value: each stage takes ownership, fills in its fields and returns
//! the article to the caller.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

use crate::content::{excerpt, normalize_source_name, validate_image_url};

/// Editorial category of an article.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Startups,
    Policy,
    Research,
    Industry,
    /// Not relevant to European AI/tech; never displayed.
    Other,
}

impl Category {
    /// Every valid category, in display order.
    pub const ALL: [Category; 5] = [
        Category::Startups,
        Category::Policy,
        Category::Research,
        Category::Industry,
        Category::Other,
    ];

    /// Wire name of the category.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Startups => "startups",
            Category::Policy => "policy",
            Category::Research => "research",
            Category::Industry => "industry",
            Category::Other => "other",
        }
    }

    pub fn is_other(&self) -> bool {
        matches!(self, Category::Other)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    /// Parse a category name, ignoring case and surrounding whitespace.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        Category::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == normalized)
            .ok_or(normalized)
    }
}

/// A record as yielded by a scrape source, before any processing.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RawArticle {
    pub title: String,
    pub url: String,
    /// Raw source name (feed title or site URL)
    pub source: String,
    #[serde(default)]
    pub content: String,
    /// Synopsis shipped by the feed itself, if any
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub published_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// A news article flowing through the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Article {
    /// Stable external key
    pub url: String,
    pub title: String,
    /// Normalized display name of the publisher
    pub source: String,
    /// Full article text
    pub content: String,
    /// Editorial synopsis, empty until set
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub published_date: Option<DateTime<Utc>>,
    pub scraped_date: DateTime<Utc>,
    /// None until classified
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub country: String,
    /// European relevance, 0-10
    #[serde(default)]
    pub eu_relevance: f64,
    /// Classifier confidence, 0-1
    #[serde(default)]
    pub confidence: f64,
    /// Blended quality score, 0-1
    #[serde(default)]
    pub quality_score: f64,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl Article {
    /// Create an unclassified article scraped now.
    pub fn new(
        title: impl Into<String>,
        url: impl Into<String>,
        source: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            source: source.into(),
            content: content.into(),
            summary: String::new(),
            published_date: None,
            scraped_date: Utc::now(),
            category: None,
            country: String::new(),
            eu_relevance: 0.0,
            confidence: 0.0,
            quality_score: 0.0,
            image_url: None,
        }
    }

    /// Build an article from a scraped record.
    ///
    /// The source name goes through `source_map` and the image URL is
    /// validated; an invalid image URL is dropped.
    pub fn from_raw(raw: RawArticle, source_map: &BTreeMap<String, String>) -> Self {
        let mut article = Self::new(
            raw.title,
            raw.url,
            normalize_source_name(&raw.source, source_map),
            raw.content,
        );
        article.summary = raw.summary.unwrap_or_default();
        article.published_date = raw.published_date;
        article.image_url = raw.image_url.as_deref().and_then(validate_image_url);
        article
    }

    /// Set the publication date.
    pub fn with_published_date(mut self, date: DateTime<Utc>) -> Self {
        self.published_date = Some(date);
        self
    }

    /// Set the image URL if it passes validation.
    pub fn with_image_url(mut self, url: &str) -> Self {
        self.image_url = validate_image_url(url);
        self
    }

    /// SHA-256 of title, url and source. Identifies the same story across feeds.
    pub fn content_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.title.as_bytes());
        hasher.update(self.url.as_bytes());
        hasher.update(self.source.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// SHA-256 of `url|title`, the key a persistence sink deduplicates on.
    pub fn storage_key(&self) -> String {
        format!(
            "{:x}",
            Sha256::digest(format!("{}|{}", self.url, self.title).as_bytes())
        )
    }

    /// Whether the article was published more than `max_age_days` before `now`.
    ///
    /// Articles without a publication date are never stale.
    pub fn is_stale(&self, max_age_days: u32, now: DateTime<Utc>) -> bool {
        match self.published_date {
            Some(published) => now - published > Duration::days(i64::from(max_age_days)),
            None => false,
        }
    }

    /// Whether a classifier has assigned a category.
    pub fn is_classified(&self) -> bool {
        self.category.is_some()
    }

    /// Title cut to `max` characters for log lines.
    pub fn short_title(&self, max: usize) -> &str {
        excerpt(&self.title, max)
    }
}

/// Remove duplicate articles by URL or content hash, keeping the first seen.
pub fn dedupe(articles: Vec<Article>) -> Vec<Article> {
    let mut seen_urls = HashSet::new();
    let mut seen_hashes = HashSet::new();

    articles
        .into_iter()
        .filter(|article| {
            if seen_urls.contains(&article.url) {
                return false;
            }
            let hash = article.content_hash();
            if seen_hashes.contains(&hash) {
                return false;
            }
            seen_urls.insert(article.url.clone());
            seen_hashes.insert(hash);
            true
        })
        .collect()
}
