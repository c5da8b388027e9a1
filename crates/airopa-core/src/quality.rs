//! Quality scorer.
//!
//! Five weighted signals summed into a score in [0, 1]:
//!
//! | Signal | Weight |
//! |--------|--------|
//! | content depth (word count) | 0.30 |
//! | EU relevance | 0.25 |
//! | title length | 0.15 |
//! | source credibility tier | 0.15 |
//! | metadata completeness | 0.15 |

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::article::Article;
use crate::config::QualityConfig;

/// Per-signal contributions to a quality score.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct QualityBreakdown {
    pub content_depth: f64,
    pub eu_relevance: f64,
    pub title_quality: f64,
    pub source_credibility: f64,
    pub metadata: f64,
}

impl QualityBreakdown {
    /// Sum of all signals, capped at 1.0.
    pub fn total(&self) -> f64 {
        let sum = self.content_depth
            + self.eu_relevance
            + self.title_quality
            + self.source_credibility
            + self.metadata;
        sum.min(1.0)
    }
}

/// Scores articles against configured source credibility tiers.
#[derive(Debug, Clone)]
pub struct QualityScorer {
    tier1: BTreeSet<String>,
    tier2: BTreeSet<String>,
}

impl Default for QualityScorer {
    fn default() -> Self {
        Self::from_config(&QualityConfig::default())
    }
}

impl QualityScorer {
    pub fn new(tier1: BTreeSet<String>, tier2: BTreeSet<String>) -> Self {
        Self { tier1, tier2 }
    }

    pub fn from_config(config: &QualityConfig) -> Self {
        Self::new(config.tier1_sources.clone(), config.tier2_sources.clone())
    }

    /// Quality score in [0, 1].
    pub fn score(&self, article: &Article) -> f64 {
        self.breakdown(article).total()
    }

    /// Score the article and store the result in `quality_score`.
    pub fn assess(&self, mut article: Article) -> Article {
        article.quality_score = self.score(&article);
        article
    }

    pub fn breakdown(&self, article: &Article) -> QualityBreakdown {
        QualityBreakdown {
            content_depth: content_depth(article.content.split_whitespace().count()),
            eu_relevance: eu_relevance(article.eu_relevance),
            title_quality: title_quality(article.title.split_whitespace().count()),
            source_credibility: self.source_credibility(&article.source),
            metadata: metadata(article),
        }
    }

    fn source_credibility(&self, source: &str) -> f64 {
        if self.tier1.contains(source) {
            0.15
        } else if self.tier2.contains(source) {
            0.10
        } else {
            0.05
        }
    }
}

fn content_depth(words: usize) -> f64 {
    match words {
        800.. => 0.30,
        400.. => 0.20,
        200.. => 0.10,
        _ => 0.0,
    }
}

fn eu_relevance(score: f64) -> f64 {
    if score >= 7.0 {
        0.25
    } else if score >= 5.0 {
        0.18
    } else if score >= 3.0 {
        0.10
    } else {
        0.0
    }
}

fn title_quality(words: usize) -> f64 {
    match words {
        5..=20 => 0.15,
        3..=25 => 0.08,
        _ => 0.0,
    }
}

fn metadata(article: &Article) -> f64 {
    [
        article.category.is_some(),
        !article.country.is_empty(),
        !article.summary.is_empty(),
    ]
    .iter()
    .filter(|present| **present)
    .count() as f64
        * 0.05
}
