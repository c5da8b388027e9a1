//! Keyword classifier.
//!
//! Pure substring matching over the lower-cased title and content. Always
//! available: it is the path taken when LLM classification is disabled,
//! out of budget, or failing.

use crate::article::{Article, Category};

/// Category keyword groups, checked in priority order. `industry` is the default.
const CATEGORY_KEYWORDS: [(Category, &[&str]); 3] = [
    (
        Category::Startups,
        &["startup", "company", "funding", "investment"],
    ),
    (
        Category::Policy,
        &["policy", "regulation", "law", "act", "government"],
    ),
    (
        Category::Research,
        &["research", "paper", "study", "breakthrough"],
    ),
];

/// Countries matched in title or content, in priority order.
const COUNTRIES: [(&str, &str); 3] = [
    ("france", "France"),
    ("germany", "Germany"),
    ("netherlands", "Netherlands"),
];

/// Deterministic category/country assignment.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordClassifier;

impl KeywordClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Set `category` and `country` on the article.
    ///
    /// `eu_relevance` and `confidence` are left as they are.
    pub fn classify(&self, mut article: Article) -> Article {
        let title = article.title.to_lowercase();
        let content = article.content.to_lowercase();

        article.category = Some(self.category_for(&title, &content));
        article.country = self.country_for(&title, &content).to_string();

        tracing::debug!(
            title = %article.short_title(60),
            category = ?article.category,
            country = %article.country,
            "Keyword classification"
        );
        article
    }

    /// Category from lower-cased title and content.
    pub fn category_for(&self, title: &str, content: &str) -> Category {
        CATEGORY_KEYWORDS
            .iter()
            .find(|(_, words)| words.iter().any(|w| title.contains(w) || content.contains(w)))
            .map(|(category, _)| *category)
            .unwrap_or(Category::Industry)
    }

    /// Country from lower-cased title and content; empty when nothing matches.
    ///
    /// "Europe" is only inferred from the title, and like every other rule it
    /// is a substring test: "neural" contains "eu".
    pub fn country_for(&self, title: &str, content: &str) -> &'static str {
        if let Some((_, name)) = COUNTRIES
            .iter()
            .find(|(needle, _)| title.contains(needle) || content.contains(needle))
        {
            return *name;
        }
        if title.contains("europe") || title.contains("eu") {
            return "Europe";
        }
        ""
    }
}
