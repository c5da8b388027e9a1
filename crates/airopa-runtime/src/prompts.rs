//! Prompt templates for the classification and summary agents.
//!
//! Templates carry `{source}`, `{title}` and `{content}` placeholders.
//! [`render`] fills them in one pass, so braces inside article text (or a
//! literal `{title}` in a scraped body) are never expanded twice.

/// Version tag stored with every classification telemetry record.
pub const CLASSIFICATION_PROMPT_VERSION: &str = "classification_v2";

/// Version tag stored with every summary telemetry record.
pub const SUMMARY_PROMPT_VERSION: &str = "summary_v2";

/// Editorial classifier prompt. Expects a single JSON object back.
pub const CLASSIFICATION_PROMPT: &str = r#"You are an editorial classifier for AIropa, a European AI and technology news platform.

Your job is to classify articles AND filter out irrelevant content.

STEP 1: RELEVANCE CHECK
Is this article about AI, technology, startups, tech policy, or digital innovation?
If NO -> set category to "other", country to "", eu_relevance to 0, confidence to 0.9.

STEP 2: CLASSIFY into exactly ONE category based on the PRIMARY focus:
- startups: Funding rounds, product launches, acquisitions, founder stories
- policy: Regulation, government policy, AI ethics, governance, legal frameworks
- research: Academic papers, technical breakthroughs, new models, benchmarks
- industry: Enterprise adoption, corporate partnerships, market analysis, big tech moves
- other: Not relevant to AI/tech (lifestyle, psychology, generic business)

Tiebreaker rules:
- Regulation affecting startups -> "policy" (the regulation is the news)
- New model from a startup -> "startups" (funding/company is the angle)
- New model from a research lab -> "research" (the science is the angle)
- Technical blog post / tutorial -> "research"

STEP 3: EUROPEAN RELEVANCE (0-10)
- 8-10: European company, EU policy, European research lab
- 5-7: Global story with meaningful European angle
- 2-4: Primarily US/global story with minor European mention
- 0-1: No European connection at all
Be strict. A US company story reported by a European outlet is NOT European news.

STEP 4: COUNTRY
Use full country name: "France", "Germany", "Netherlands", etc.
Use "Europe" ONLY if genuinely pan-European (EU-wide policy, multi-country).
Use "" (empty) if not European.

STEP 5: CONFIDENCE (0.0-1.0)
Rate your confidence in this classification.

EXAMPLES:
Source: Sifted
Title: "French AI startup Mistral raises EUR 400M Series B"
{"category": "startups", "country": "France", "eu_relevance": 9, "confidence": 0.95}

Title: "EU AI Act enforcement timeline announced"
{"category": "policy", "country": "Europe", "eu_relevance": 10, "confidence": 0.95}

Title: "OpenAI launches GPT-5 with improved reasoning"
{"category": "industry", "country": "", "eu_relevance": 1, "confidence": 0.9}

Title: "Psychology says people who enjoy grocery shopping alone possess these traits"
{"category": "other", "country": "", "eu_relevance": 0, "confidence": 0.95}

Source: {source}
Title: {title}
Content: {content}

Respond in JSON only:
{"category": "...", "country": "...", "eu_relevance": N, "confidence": N.N}"#;

/// News-card summary prompt. Expects 2-3 plain sentences or `NOT_RELEVANT`.
pub const SUMMARY_PROMPT: &str = r#"You are a news editor for AIropa, a European AI and technology platform.

Write a 2-3 sentence summary of this article for a news card.
The summary should help a reader decide whether to click through.

Rules:
- State what happened, who is involved, and why it matters
- If the article has a European angle, emphasize it
- If the article is not about AI or technology, write exactly: NOT_RELEVANT
- Do NOT include any HTML tags, image URLs, or markup in your summary
- Do NOT invent or introduce facts not present in the article
- Do NOT repeat the title as the first sentence
- Write in plain text only

Source: {source}
Title: {title}
Content: {content}

Summary:"#;

/// Article fields substituted into a template.
#[derive(Debug, Clone, Copy)]
pub struct PromptFields<'a> {
    pub source: &'a str,
    pub title: &'a str,
    pub content: &'a str,
}

impl<'a> PromptFields<'a> {
    fn lookup(&self, name: &str) -> Option<&'a str> {
        match name {
            "source" => Some(self.source),
            "title" => Some(self.title),
            "content" => Some(self.content),
            _ => None,
        }
    }
}

/// Substitute `{source}`, `{title}` and `{content}` in `template`.
///
/// Any other brace text is copied through unchanged.
pub fn render(template: &str, fields: PromptFields<'_>) -> String {
    let mut out = String::with_capacity(
        template.len() + fields.source.len() + fields.title.len() + fields.content.len(),
    );
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];

        let substituted = after.find('}').and_then(|close| {
            fields
                .lookup(&after[..close])
                .map(|value| (value, close))
        });

        match substituted {
            Some((value, close)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

pub fn classification_prompt(fields: PromptFields<'_>) -> String {
    render(CLASSIFICATION_PROMPT, fields)
}

pub fn summary_prompt(fields: PromptFields<'_>) -> String {
    render(SUMMARY_PROMPT, fields)
}
