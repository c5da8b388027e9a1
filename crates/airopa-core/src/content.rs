//! Text helpers shared by prompt construction and article intake.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeMap;

/// Longest image URL accepted on an article.
pub const MAX_IMAGE_URL_LEN: usize = 2048;

lazy_static! {
    /// HTML tags, comments and doctypes. A bare `<` followed by a space is text.
    static ref HTML_TAG: Regex = Regex::new(r"(?s)<!--.*?-->|<[a-zA-Z/!][^>]*>").unwrap();

    /// Bare image links left behind by feed extraction
    static ref IMAGE_URL: Regex =
        Regex::new(r"(?i)https?://\S+\.(?:jpg|jpeg|png|gif|webp|svg)\S*").unwrap();
}

const ENTITIES: [(&str, &str); 6] = [
    ("&nbsp;", " "),
    ("&amp;", "&"),
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&quot;", "\""),
    ("&#39;", "'"),
];

/// Strip residual HTML, drop image URLs and collapse whitespace.
pub fn clean_content(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }

    let mut text = HTML_TAG.replace_all(raw, " ").into_owned();
    for (entity, replacement) in ENTITIES {
        text = text.replace(entity, replacement);
    }
    let text = IMAGE_URL.replace_all(&text, "");

    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// First `max_chars` characters of `text`, never splitting a code point.
pub fn excerpt(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Cleaned and truncated article body for an LLM prompt.
pub fn prompt_excerpt(content: &str, max_chars: usize) -> String {
    excerpt(&clean_content(content), max_chars).to_string()
}

/// Return the trimmed URL if it is an http(s) link of sane length.
pub fn validate_image_url(url: &str) -> Option<String> {
    let url = url.trim();
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return None;
    }
    if url.len() > MAX_IMAGE_URL_LEN {
        return None;
    }
    Some(url.to_string())
}

/// Map a raw feed/site name to its canonical display name.
pub fn normalize_source_name(raw: &str, map: &BTreeMap<String, String>) -> String {
    map.get(raw).cloned().unwrap_or_else(|| raw.to_string())
}
