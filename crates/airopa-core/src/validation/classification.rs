//! Classification response parsing and business-rule post-validation.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{MAX_EU_RELEVANCE, MIN_CONFIDENCE, MIN_EU_RELEVANCE};
use crate::article::Category;
use crate::content::excerpt;

/// Typed classification produced from one LLM response.
///
/// Only [`parse_classification`] builds these from untrusted text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub category: Category,
    pub country: String,
    /// 0-10
    pub eu_relevance: f64,
    /// 0-1
    pub confidence: f64,
    pub valid: bool,
    /// Empty when valid
    pub fallback_reason: String,
}

impl ClassificationResult {
    /// A valid result with the given fields.
    pub fn new(
        category: Category,
        country: impl Into<String>,
        eu_relevance: f64,
        confidence: f64,
    ) -> Self {
        Self {
            category,
            country: country.into(),
            eu_relevance,
            confidence,
            valid: true,
            fallback_reason: String::new(),
        }
    }

    /// An invalid result telling the caller to fall back.
    pub fn invalid(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        tracing::warn!(reason = %reason, "Classification validation failed");
        Self {
            category: Category::Other,
            country: String::new(),
            eu_relevance: 0.0,
            confidence: 0.0,
            valid: false,
            fallback_reason: reason,
        }
    }

    fn demote(mut self) -> Self {
        self.category = Category::Other;
        self.eu_relevance = 0.0;
        self
    }
}

/// Parse an LLM classification response.
///
/// Expects a single JSON object such as
/// `{"category": "startups", "country": "Germany", "eu_relevance": 8, "confidence": 0.9}`,
/// optionally wrapped in a fenced code block. Numbers are clamped into range
/// and missing optional fields default to empty/zero.
pub fn parse_classification(raw: &str) -> ClassificationResult {
    let text = raw.trim();
    if text.is_empty() {
        return ClassificationResult::invalid("empty_response");
    }

    let text = strip_code_fences(text);

    let data: Value = match serde_json::from_str(&text) {
        Ok(v) => v,
        Err(e) => return ClassificationResult::invalid(format!("json_parse_error: {}", e)),
    };

    let Value::Object(fields) = data else {
        return ClassificationResult::invalid("response_not_dict");
    };

    let category = match fields.get("category") {
        None => String::new(),
        Some(Value::String(s)) => s.trim().to_lowercase(),
        Some(other) => {
            return ClassificationResult::invalid(format!(
                "category_not_string: {}",
                json_type_name(other)
            ))
        }
    };
    let category: Category = match category.parse() {
        Ok(c) => c,
        Err(value) => {
            return ClassificationResult::invalid(format!("invalid_category: {}", value))
        }
    };

    let eu_relevance = coerce_f64(&fields, "eu_relevance").clamp(0.0, MAX_EU_RELEVANCE);
    let confidence = coerce_f64(&fields, "confidence").clamp(0.0, 1.0);
    let country = fields
        .get("country")
        .and_then(Value::as_str)
        .map(str::trim)
        .unwrap_or_default();

    ClassificationResult::new(category, country, eu_relevance, confidence)
}

/// Apply the demotion rules to a parsed classification.
///
/// Rules run in order and the first match wins:
/// 1. `other` always carries zero relevance.
/// 2. Confidence below 0.5 demotes to `other`.
/// 3. EU relevance below 2.0 demotes to `other`.
///
/// Invalid results are returned unchanged.
pub fn validate_classification(
    result: ClassificationResult,
    article_title: &str,
) -> ClassificationResult {
    if !result.valid {
        return result;
    }

    let title = excerpt(article_title, 60);

    if result.category.is_other() {
        return result.demote();
    }

    if result.confidence < MIN_CONFIDENCE {
        tracing::info!(
            title = %title,
            from = %result.category,
            confidence = result.confidence,
            "Demoting classification to other: low confidence"
        );
        return result.demote();
    }

    if result.eu_relevance < MIN_EU_RELEVANCE {
        tracing::info!(
            title = %title,
            from = %result.category,
            eu_relevance = result.eu_relevance,
            "Demoting classification to other: low EU relevance"
        );
        return result.demote();
    }

    result
}

/// Drop fence lines (```` ``` ```` / ```` ```json ````) around a fenced response.
fn strip_code_fences(text: &str) -> String {
    if !text.starts_with("```") {
        return text.to_string();
    }
    text.lines()
        .filter(|line| !line.trim().starts_with("```"))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Numeric field as f64. Numeric strings are accepted; anything else is 0.
fn coerce_f64(fields: &Map<String, Value>, key: &str) -> f64 {
    let value = match fields.get(key) {
        // out-of-range literals like 1e400 come back as +/-inf and clamp
        Some(Value::Number(n)) => n.as_f64().or_else(|| n.to_string().parse().ok()),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    value.filter(|v| !v.is_nan()).unwrap_or(0.0)
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
