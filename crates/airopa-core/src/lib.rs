//! # airopa-core
//!
//! Deterministic classification and scoring for the AIropa news pipeline.
//!
//! This crate holds everything that does not need an LLM:
//! - the [`Article`] model and intake helpers (cleaning, staleness, dedupe)
//! - the [`KeywordClassifier`], the always-available fallback
//! - validators that turn raw LLM text into typed results
//! - the [`QualityScorer`] and per-source run metrics
//! - [`PipelineConfig`] loading and validation
//!
//! ## Key Guarantees
//!
//! 1. **Total**: validators and scorers return a value for every input,
//!    including malformed LLM output. Failures are data, not errors.
//! 2. **Deterministic**: same input, same output. No network, no clock
//!    reads outside article construction.
//! 3. **Bounded**: `eu_relevance` in [0, 10], `confidence` in [0, 1],
//!    `quality_score` in [0, 1].
//!
//! ## Example
//!
//! ```rust,ignore
//! use airopa_core::{parse_classification, validate_classification};
//!
//! let result = parse_classification(r#"{"category": "policy", "eu_relevance": 9, "confidence": 0.9}"#);
//! let result = validate_classification(result, "EU AI Act enforcement timeline announced");
//! assert!(result.valid);
//! ```

pub mod article;
pub mod config;
pub mod content;
pub mod keywords;
pub mod metrics;
pub mod quality;
pub mod validation;

// Re-export main types at crate root
pub use article::{dedupe, Article, Category, RawArticle};
pub use config::{
    AiConfig, ConfigError, FeatureMode, PipelineConfig, ProviderKind, QualityConfig,
    ScraperConfig,
};
pub use content::{clean_content, excerpt, prompt_excerpt};
pub use keywords::KeywordClassifier;
pub use metrics::{source_metrics, SourceMetric};
pub use quality::{QualityBreakdown, QualityScorer};
pub use validation::{
    parse_classification, parse_summary, validate_classification, ClassificationResult,
    SummaryResult,
};
