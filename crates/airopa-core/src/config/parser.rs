//! Pipeline configuration types and loading from YAML/JSON.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use super::schema::validate_config_schema;

/// Errors that can occur when loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Config does not match schema: {}", .0.join("; "))]
    SchemaError(Vec<String>),

    #[error("Config validation failed: {0}")]
    ValidationError(String),

    #[error("Invalid value for {var}: {value:?}")]
    InvalidEnv { var: String, value: String },
}

/// Hosted LLM service behind the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Groq,
    Mistral,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Groq => "groq",
            ProviderKind::Mistral => "mistral",
        }
    }

    /// Model used when the config does not name one.
    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderKind::Groq => "llama-3.3-70b-versatile",
            ProviderKind::Mistral => "mistral-small-latest",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "groq" => Ok(ProviderKind::Groq),
            "mistral" => Ok(ProviderKind::Mistral),
            other => Err(format!("unknown provider '{}'", other)),
        }
    }
}

/// How an LLM-assisted stage treats the LLM result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureMode {
    /// No LLM call
    Disabled,
    /// Call the LLM and log its result; apply the deterministic result
    Shadow,
    /// Apply the LLM result when valid, fall back otherwise
    Live,
}

impl FeatureMode {
    pub fn from_flags(enabled: bool, shadow: bool) -> Self {
        match (enabled, shadow) {
            (false, _) => FeatureMode::Disabled,
            (true, true) => FeatureMode::Shadow,
            (true, false) => FeatureMode::Live,
        }
    }

    pub fn is_enabled(&self) -> bool {
        !matches!(self, FeatureMode::Disabled)
    }
}

impl fmt::Display for FeatureMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FeatureMode::Disabled => "disabled",
            FeatureMode::Shadow => "shadow",
            FeatureMode::Live => "live",
        })
    }
}

/// LLM settings and feature flags.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AiConfig {
    pub provider: ProviderKind,

    /// None means the provider's default model
    pub model: Option<String>,

    pub temperature: f32,

    /// Completion token cap per call
    pub max_tokens: u32,

    /// Per-call timeout, human-readable ("30s", "1m")
    pub timeout: String,

    /// Override of the provider's API base URL
    pub base_url: Option<String>,

    pub classification_enabled: bool,
    pub summary_enabled: bool,

    /// When enabled, LLM results are logged but not applied
    pub shadow_mode: bool,

    /// 0 = unlimited
    pub budget_max_tokens_per_run: u64,

    /// Cleaned-content characters sent with a classification prompt
    pub classification_content_chars: usize,

    /// Cleaned-content characters sent with a summary prompt
    pub summary_content_chars: usize,

    /// Articles with less raw content than this are never summarized
    pub summary_min_content_chars: usize,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Groq,
            model: None,
            temperature: 0.3,
            max_tokens: 1024,
            timeout: "30s".to_string(),
            base_url: None,
            classification_enabled: false,
            summary_enabled: false,
            shadow_mode: true,
            budget_max_tokens_per_run: 0,
            classification_content_chars: 1500,
            summary_content_chars: 2000,
            summary_min_content_chars: 200,
        }
    }
}

impl AiConfig {
    /// Configured model, or the provider's default.
    pub fn model_name(&self) -> &str {
        self.model
            .as_deref()
            .unwrap_or_else(|| self.provider.default_model())
    }

    /// Parsed call timeout. Falls back to 30s if unparseable; `validate`
    /// rejects such configs at load time.
    pub fn timeout_duration(&self) -> Duration {
        humantime::parse_duration(&self.timeout).unwrap_or(Duration::from_secs(30))
    }

    pub fn classification_mode(&self) -> FeatureMode {
        FeatureMode::from_flags(self.classification_enabled, self.shadow_mode)
    }

    pub fn summary_mode(&self) -> FeatureMode {
        FeatureMode::from_flags(self.summary_enabled, self.shadow_mode)
    }
}

/// Intake settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScraperConfig {
    /// Older articles are dropped before classification
    pub max_article_age_days: u32,

    /// Relevance at or above which an article counts as passing, for metrics
    pub eu_relevance_threshold: f64,

    /// Raw feed/site names to canonical display names
    pub source_name_map: BTreeMap<String, String>,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        let source_name_map = [
            ("https://sifted.eu", "Sifted"),
            (
                "Sifted - News, Analysis and Opinion on European Startups",
                "Sifted",
            ),
            ("Deeptech - Tech.eu", "Tech.eu"),
            ("Robotics - Tech.eu", "Tech.eu"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        Self {
            max_article_age_days: 30,
            eu_relevance_threshold: 3.0,
            source_name_map,
        }
    }
}

/// Quality scoring settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct QualityConfig {
    pub tier1_sources: BTreeSet<String>,
    pub tier2_sources: BTreeSet<String>,

    /// Articles scoring below this are not stored
    pub publish_threshold: f64,
}

impl Default for QualityConfig {
    fn default() -> Self {
        let set = |names: &[&str]| -> BTreeSet<String> {
            names.iter().map(|s| s.to_string()).collect()
        };
        Self {
            tier1_sources: set(&["Sifted", "Tech.eu", "EURACTIV", "AlgorithmWatch"]),
            tier2_sources: set(&[
                "EuroNews",
                "The Parliament Magazine",
                "Science Business",
                "Innovation Origins",
                "TNW",
                "Politico Europe",
            ]),
            publish_threshold: 0.6,
        }
    }
}

/// Complete pipeline configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    pub ai: AiConfig,
    pub scraper: ScraperConfig,
    pub quality: QualityConfig,
}

impl PipelineConfig {
    /// Parse configuration from a YAML string.
    ///
    /// An empty document yields the defaults.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Self::from_value(serde_json::Value::Null);
        }
        let value: serde_json::Value = serde_yaml::from_str(yaml)?;
        Self::from_value(value)
    }

    /// Parse configuration from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    /// Parse configuration from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Parse configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Parse a file, picking JSON or YAML by extension.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_file(path),
            _ => Self::from_yaml_file(path),
        }
    }

    fn from_value(value: serde_json::Value) -> Result<Self, ConfigError> {
        let value = if value.is_null() {
            serde_json::Value::Object(Default::default())
        } else {
            value
        };
        validate_config_schema(&value).map_err(ConfigError::SchemaError)?;

        let config: PipelineConfig = serde_json::from_value(value)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from process environment variables.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides_from(|var| std::env::var(var).ok())
    }

    /// Apply overrides from `lookup`.
    ///
    /// Recognized variables: `AIROPA_CLASSIFICATION_ENABLED`,
    /// `AIROPA_SUMMARY_ENABLED`, `AIROPA_SHADOW_MODE`,
    /// `AIROPA_BUDGET_MAX_TOKENS`, `AIROPA_LLM_PROVIDER`, `AIROPA_LLM_MODEL`
    /// and `MAX_ARTICLE_AGE_DAYS`.
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("AIROPA_CLASSIFICATION_ENABLED") {
            self.ai.classification_enabled = parse_bool("AIROPA_CLASSIFICATION_ENABLED", &v)?;
        }
        if let Some(v) = get("AIROPA_SUMMARY_ENABLED") {
            self.ai.summary_enabled = parse_bool("AIROPA_SUMMARY_ENABLED", &v)?;
        }
        if let Some(v) = get("AIROPA_SHADOW_MODE") {
            self.ai.shadow_mode = parse_bool("AIROPA_SHADOW_MODE", &v)?;
        }
        if let Some(v) = get("AIROPA_BUDGET_MAX_TOKENS") {
            self.ai.budget_max_tokens_per_run = parse_num("AIROPA_BUDGET_MAX_TOKENS", &v)?;
        }
        if let Some(v) = get("AIROPA_LLM_PROVIDER") {
            self.ai.provider = v.parse().map_err(|_| invalid_env("AIROPA_LLM_PROVIDER", &v))?;
        }
        if let Some(v) = get("AIROPA_LLM_MODEL") {
            self.ai.model = Some(v.trim().to_string());
        }
        if let Some(v) = get("MAX_ARTICLE_AGE_DAYS") {
            self.scraper.max_article_age_days = parse_num("MAX_ARTICLE_AGE_DAYS", &v)?;
        }

        self.validate()?;
        Ok(self)
    }

    /// Checks the schema cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let timeout = humantime::parse_duration(&self.ai.timeout).map_err(|e| {
            ConfigError::ValidationError(format!("ai.timeout '{}': {}", self.ai.timeout, e))
        })?;
        if timeout.is_zero() {
            return Err(ConfigError::ValidationError(
                "ai.timeout must be greater than zero".to_string(),
            ));
        }

        if !(0.0..=2.0).contains(&self.ai.temperature) {
            return Err(ConfigError::ValidationError(format!(
                "ai.temperature must be in [0, 2], got {}",
                self.ai.temperature
            )));
        }

        if self.ai.max_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "ai.max_tokens must be at least 1".to_string(),
            ));
        }

        if self.scraper.max_article_age_days == 0 {
            return Err(ConfigError::ValidationError(
                "scraper.max_article_age_days must be at least 1".to_string(),
            ));
        }

        if let Some(source) = self
            .quality
            .tier1_sources
            .intersection(&self.quality.tier2_sources)
            .next()
        {
            return Err(ConfigError::ValidationError(format!(
                "source '{}' is listed in both quality tiers",
                source
            )));
        }

        Ok(())
    }
}

fn invalid_env(var: &str, value: &str) -> ConfigError {
    ConfigError::InvalidEnv {
        var: var.to_string(),
        value: value.to_string(),
    }
}

fn parse_bool(var: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(invalid_env(var, value)),
    }
}

fn parse_num<T: FromStr>(var: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| invalid_env(var, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.ai.provider, ProviderKind::Groq);
        assert_eq!(config.ai.model_name(), "llama-3.3-70b-versatile");
        assert_eq!(config.ai.temperature, 0.3);
        assert_eq!(config.ai.max_tokens, 1024);
        assert_eq!(config.ai.timeout_duration(), Duration::from_secs(30));
        assert_eq!(config.ai.classification_mode(), FeatureMode::Disabled);
        assert_eq!(config.ai.summary_mode(), FeatureMode::Disabled);
        assert_eq!(config.ai.classification_content_chars, 1500);
        assert_eq!(config.ai.summary_content_chars, 2000);
        assert_eq!(config.ai.summary_min_content_chars, 200);
        assert_eq!(config.scraper.max_article_age_days, 30);
        assert_eq!(config.scraper.eu_relevance_threshold, 3.0);
        assert_eq!(
            config.scraper.source_name_map.get("Deeptech - Tech.eu").map(String::as_str),
            Some("Tech.eu")
        );
        assert!(config.quality.tier1_sources.contains("Sifted"));
        assert!(config.quality.tier2_sources.contains("TNW"));
        assert_eq!(config.quality.publish_threshold, 0.6);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_yaml_is_default() {
        assert_eq!(PipelineConfig::from_yaml("").unwrap(), PipelineConfig::default());
        assert_eq!(PipelineConfig::from_json("{}").unwrap(), PipelineConfig::default());
    }

    #[test]
    fn test_parse_yaml() {
        let config = PipelineConfig::from_yaml(
            r#"
ai:
  provider: mistral
  classification_enabled: true
  shadow_mode: false
  summary_enabled: true
  budget_max_tokens_per_run: 25000
  timeout: 45s
quality:
  tier1_sources: [Sifted]
  tier2_sources: []
"#,
        )
        .unwrap();

        assert_eq!(config.ai.provider, ProviderKind::Mistral);
        assert_eq!(config.ai.model_name(), "mistral-small-latest");
        assert_eq!(config.ai.classification_mode(), FeatureMode::Live);
        assert_eq!(config.ai.summary_mode(), FeatureMode::Live);
        assert_eq!(config.ai.budget_max_tokens_per_run, 25000);
        assert_eq!(config.ai.timeout_duration(), Duration::from_secs(45));
        assert_eq!(config.quality.tier1_sources.len(), 1);
        assert!(config.quality.tier2_sources.is_empty());
        // untouched sections keep defaults
        assert_eq!(config.scraper, ScraperConfig::default());
    }

    #[test]
    fn test_shadow_mode() {
        let config = PipelineConfig::from_yaml("ai:\n  classification_enabled: true\n").unwrap();
        assert_eq!(config.ai.classification_mode(), FeatureMode::Shadow);
        assert!(config.ai.classification_mode().is_enabled());
    }

    #[test]
    fn test_schema_rejects_unknown_key() {
        let err = PipelineConfig::from_yaml("ai:\n  shadow: true\n").unwrap_err();
        assert!(matches!(err, ConfigError::SchemaError(_)));
    }

    #[test]
    fn test_bad_timeout() {
        let err = PipelineConfig::from_yaml("ai:\n  timeout: soon\n").unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));

        let err = PipelineConfig::from_yaml("ai:\n  timeout: 0s\n").unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_overlapping_tiers_rejected() {
        let err = PipelineConfig::from_json(
            r#"{"quality": {"tier1_sources": ["TNW"], "tier2_sources": ["TNW"]}}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("TNW"));
    }

    #[test]
    fn test_env_overrides() {
        let config = PipelineConfig::default()
            .with_overrides_from(lookup(&[
                ("AIROPA_CLASSIFICATION_ENABLED", "true"),
                ("AIROPA_SHADOW_MODE", "0"),
                ("AIROPA_SUMMARY_ENABLED", "yes"),
                ("AIROPA_BUDGET_MAX_TOKENS", "5000"),
                ("AIROPA_LLM_PROVIDER", "Mistral"),
                ("AIROPA_LLM_MODEL", "mistral-large-latest"),
                ("MAX_ARTICLE_AGE_DAYS", "7"),
            ]))
            .unwrap();

        assert_eq!(config.ai.classification_mode(), FeatureMode::Live);
        assert_eq!(config.ai.summary_mode(), FeatureMode::Live);
        assert_eq!(config.ai.budget_max_tokens_per_run, 5000);
        assert_eq!(config.ai.provider, ProviderKind::Mistral);
        assert_eq!(config.ai.model_name(), "mistral-large-latest");
        assert_eq!(config.scraper.max_article_age_days, 7);
    }

    #[test]
    fn test_env_overrides_ignore_blank_and_missing() {
        let config = PipelineConfig::default()
            .with_overrides_from(lookup(&[("AIROPA_LLM_MODEL", "  ")]))
            .unwrap();
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    fn test_env_override_invalid() {
        let err = PipelineConfig::default()
            .with_overrides_from(lookup(&[("AIROPA_SHADOW_MODE", "maybe")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { ref var, .. } if var == "AIROPA_SHADOW_MODE"));

        let err = PipelineConfig::default()
            .with_overrides_from(lookup(&[("MAX_ARTICLE_AGE_DAYS", "0")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_provider_parse() {
        assert_eq!(" GROQ ".parse::<ProviderKind>(), Ok(ProviderKind::Groq));
        assert!("openai".parse::<ProviderKind>().is_err());
    }
}
