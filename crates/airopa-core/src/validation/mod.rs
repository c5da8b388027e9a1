//! Validation of raw LLM output.
//!
//! Both parsers are total: every input, including malformed or hostile
//! text, yields a result value. Failures carry `valid = false` and a
//! machine-readable reason so callers branch on data, not on errors.

mod classification;
mod summary;

pub use classification::{parse_classification, validate_classification, ClassificationResult};
pub use summary::{parse_summary, SummaryResult};

/// Confidence below which a classification is demoted to `other`.
pub const MIN_CONFIDENCE: f64 = 0.5;

/// EU relevance below which a classification is demoted to `other`.
pub const MIN_EU_RELEVANCE: f64 = 2.0;

/// Upper bound of the EU relevance scale.
pub const MAX_EU_RELEVANCE: f64 = 10.0;

/// Most sentences a summary may contain.
pub const MAX_SUMMARY_SENTENCES: usize = 5;
