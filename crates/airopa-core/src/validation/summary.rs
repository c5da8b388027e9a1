//! Summary response validation.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::MAX_SUMMARY_SENTENCES;

lazy_static! {
    static ref MARKDOWN_HEADING: Regex = Regex::new(r"(?m)^#{1,6}\s").unwrap();
    static ref HTML_TAG: Regex = Regex::new(r"<[a-zA-Z/][^>]*>").unwrap();
    static ref SENTENCE_END: Regex = Regex::new(r"[.!?](?:\s|$)").unwrap();
}

/// Validated summary text from one LLM response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryResult {
    pub text: String,
    pub valid: bool,
    /// Empty when valid
    pub fallback_reason: String,
}

impl SummaryResult {
    /// Sentinel text: the call succeeded but the article deserves no summary.
    pub const NOT_RELEVANT: &'static str = "NOT_RELEVANT";

    pub fn valid(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            valid: true,
            fallback_reason: String::new(),
        }
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        Self {
            text: String::new(),
            valid: false,
            fallback_reason: reason.into(),
        }
    }

    pub fn not_relevant() -> Self {
        Self::valid(Self::NOT_RELEVANT)
    }

    pub fn is_not_relevant(&self) -> bool {
        self.valid && self.text == Self::NOT_RELEVANT
    }
}

/// Parse an LLM summary response.
///
/// Accepts 1-5 sentences of plain text. Markdown headings, bold markers and
/// HTML tags are rejected. A "not relevant" answer in any casing or spacing
/// maps to [`SummaryResult::NOT_RELEVANT`].
pub fn parse_summary(raw: &str) -> SummaryResult {
    let text = raw.trim();
    if text.is_empty() {
        return SummaryResult::invalid("empty_summary");
    }

    let squashed: String = text
        .to_uppercase()
        .chars()
        .filter(|c| *c != '_' && *c != ' ')
        .collect();
    if squashed.starts_with("NOTRELEVANT") {
        return SummaryResult::not_relevant();
    }

    let text = strip_wrapping_quotes(text);
    if text.is_empty() {
        return SummaryResult::invalid("empty_summary");
    }

    if MARKDOWN_HEADING.is_match(text) || text.contains("**") || HTML_TAG.is_match(text) {
        return SummaryResult::invalid("contains_formatting");
    }

    let sentences = SENTENCE_END
        .split(text)
        .filter(|s| !s.trim().is_empty())
        .count();
    if sentences < 1 {
        return SummaryResult::invalid("too_short");
    }
    if sentences > MAX_SUMMARY_SENTENCES {
        return SummaryResult::invalid("too_long");
    }

    SummaryResult::valid(text)
}

/// Remove one matching pair of `"` or `'` around the text.
fn strip_wrapping_quotes(text: &str) -> &str {
    for quote in ['"', '\''] {
        if text.starts_with(quote) && text.ends_with(quote) {
            return if text.len() >= 2 {
                text[1..text.len() - 1].trim()
            } else {
                ""
            };
        }
    }
    text
}
