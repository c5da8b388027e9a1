//! Per-source run metrics.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::article::{Article, Category};

/// Aggregates for one source over one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceMetric {
    pub source_name: String,
    pub articles_fetched: usize,
    pub articles_stored: usize,
    /// Scored articles with EU relevance at or above the threshold
    pub articles_passed_relevance: usize,
    /// None when no scored article had a non-zero relevance
    pub avg_eu_relevance: Option<f64>,
    /// None when no scored article had a non-zero quality score
    pub avg_quality_score: Option<f64>,
    pub category_distribution: BTreeMap<Category, usize>,
}

/// Build one metric per source seen in any of the inputs.
///
/// Zero relevance and zero quality scores count as "not scored" and are
/// left out of the averages. Averages are rounded to two decimals.
pub fn source_metrics(
    fetched: &BTreeMap<String, usize>,
    stored: &BTreeMap<String, usize>,
    scored: &[Article],
    relevance_threshold: f64,
) -> Vec<SourceMetric> {
    let mut by_source: BTreeMap<&str, Vec<&Article>> = BTreeMap::new();
    for article in scored {
        by_source.entry(article.source.as_str()).or_default().push(article);
    }

    let sources: BTreeSet<&str> = fetched
        .keys()
        .chain(stored.keys())
        .map(String::as_str)
        .chain(by_source.keys().copied())
        .collect();

    sources
        .into_iter()
        .map(|source| {
            let articles = by_source.get(source).map(Vec::as_slice).unwrap_or_default();

            let eu_scores: Vec<f64> = articles
                .iter()
                .map(|a| a.eu_relevance)
                .filter(|s| *s != 0.0)
                .collect();
            let quality_scores: Vec<f64> = articles
                .iter()
                .map(|a| a.quality_score)
                .filter(|s| *s != 0.0)
                .collect();

            let mut category_distribution = BTreeMap::new();
            for category in articles.iter().filter_map(|a| a.category) {
                *category_distribution.entry(category).or_insert(0) += 1;
            }

            SourceMetric {
                source_name: source.to_string(),
                articles_fetched: fetched.get(source).copied().unwrap_or(0),
                articles_stored: stored.get(source).copied().unwrap_or(0),
                articles_passed_relevance: eu_scores
                    .iter()
                    .filter(|s| **s >= relevance_threshold)
                    .count(),
                avg_eu_relevance: rounded_mean(&eu_scores),
                avg_quality_score: rounded_mean(&quality_scores),
                category_distribution,
            }
        })
        .collect()
}

fn rounded_mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    Some((mean * 100.0).round() / 100.0)
}
