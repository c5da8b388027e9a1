//! Per-call LLM audit records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::gateway::{GatewayResponse, LlmStatus};

/// One attempted LLM call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryRecord {
    pub article_url: String,
    pub model: String,
    pub prompt_version: String,
    pub latency_ms: u64,
    pub tokens_in: u32,
    pub tokens_out: u32,
    pub status: LlmStatus,
    /// `"<status>: <error>"` for call failures, the parser reason for
    /// `parse_error`, None on success
    pub fallback_reason: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

impl TelemetryRecord {
    /// Record for a gateway response. Failed calls get their fallback
    /// reason here.
    pub fn from_response(
        article_url: &str,
        prompt_version: &str,
        response: &GatewayResponse,
    ) -> Self {
        let status = response.status();
        Self {
            article_url: article_url.to_string(),
            model: response.model.clone(),
            prompt_version: prompt_version.to_string(),
            latency_ms: response.latency_ms,
            tokens_in: response.tokens_in,
            tokens_out: response.tokens_out,
            status,
            fallback_reason: response
                .error()
                .map(|error| format!("{}: {}", status, error)),
            recorded_at: Utc::now(),
        }
    }

    /// Mark a completed call whose output failed validation.
    pub fn parse_failed(mut self, reason: &str) -> Self {
        self.status = LlmStatus::ParseError;
        self.fallback_reason = Some(reason.to_string());
        self
    }

    pub fn total_tokens(&self) -> u64 {
        u64::from(self.tokens_in) + u64::from(self.tokens_out)
    }

    pub fn is_classification(&self) -> bool {
        self.prompt_version.starts_with("classification")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::CallOutcome;

    fn response(outcome: CallOutcome) -> GatewayResponse {
        GatewayResponse {
            outcome,
            provider: "groq".to_string(),
            model: "llama-3.3-70b-versatile".to_string(),
            latency_ms: 420,
            tokens_in: 900,
            tokens_out: 40,
        }
    }

    #[test]
    fn test_ok_record() {
        let record = TelemetryRecord::from_response(
            "https://sifted.eu/a",
            "classification_v2",
            &response(CallOutcome::Completed {
                text: "{}".to_string(),
            }),
        );
        assert_eq!(record.status, LlmStatus::Ok);
        assert_eq!(record.fallback_reason, None);
        assert_eq!(record.total_tokens(), 940);
        assert_eq!(record.latency_ms, 420);
        assert!(record.is_classification());
    }

    #[test]
    fn test_failed_record_reason() {
        let record = TelemetryRecord::from_response(
            "https://sifted.eu/a",
            "summary_v2",
            &response(CallOutcome::Failed {
                status: LlmStatus::NoApiKey,
                error: "No API key configured for provider 'groq'".to_string(),
            }),
        );
        assert_eq!(record.status, LlmStatus::NoApiKey);
        assert_eq!(
            record.fallback_reason.as_deref(),
            Some("no_api_key: No API key configured for provider 'groq'")
        );
        assert!(!record.is_classification());
    }

    #[test]
    fn test_parse_failed_overrides() {
        let record = TelemetryRecord::from_response(
            "u",
            "classification_v2",
            &response(CallOutcome::Completed {
                text: "nope".to_string(),
            }),
        )
        .parse_failed("json_parse_error: expected value");
        assert_eq!(record.status, LlmStatus::ParseError);
        assert_eq!(
            record.fallback_reason.as_deref(),
            Some("json_parse_error: expected value")
        );
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["status"], "parse_error");
    }
}
