//! Provider registration by name.
//!
//! The `ai.provider` config value is looked up here, so a new backend only
//! needs a factory, not a new [`ProviderKind`] arm in the gateway.
//!
//! ```ignore
//! let registry = ProviderRegistry::with_defaults();
//! let provider = registry.for_ai_config(&config.ai)?;
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use airopa_core::{AiConfig, ProviderKind};
use serde_json::Value as JsonValue;

use super::{ChatCompletionsProviderFactory, LlmProvider, ProviderError};

/// Builds providers of one type from JSON configuration.
pub trait ProviderFactory: Send + Sync {
    /// Registry key, e.g. "groq".
    fn provider_type(&self) -> &'static str;

    fn create(&self, config: &JsonValue) -> Result<Arc<dyn LlmProvider>, ProviderError>;

    /// Reject a malformed configuration before building anything.
    fn validate_config(&self, config: &JsonValue) -> Result<(), ProviderError>;
}

/// Provider factories keyed by type name.
#[derive(Default)]
pub struct ProviderRegistry {
    factories: BTreeMap<String, Arc<dyn ProviderFactory>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the Groq and Mistral factories.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(ChatCompletionsProviderFactory::new(ProviderKind::Groq)));
        registry.register(Arc::new(ChatCompletionsProviderFactory::new(
            ProviderKind::Mistral,
        )));
        registry
    }

    /// Replaces any factory already registered under the same type.
    pub fn register(&mut self, factory: Arc<dyn ProviderFactory>) {
        self.factories
            .insert(factory.provider_type().to_string(), factory);
    }

    fn factory(&self, provider_type: &str) -> Result<&Arc<dyn ProviderFactory>, ProviderError> {
        self.factories.get(provider_type).ok_or_else(|| {
            ProviderError::NotConfigured(format!(
                "Unknown provider type: '{}'. Available: {:?}",
                provider_type,
                self.available_types()
            ))
        })
    }

    pub fn create(
        &self,
        provider_type: &str,
        config: &JsonValue,
    ) -> Result<Arc<dyn LlmProvider>, ProviderError> {
        self.factory(provider_type)?.create(config)
    }

    /// Provider for the `ai` config section. The API key still comes from
    /// the environment.
    pub fn for_ai_config(&self, ai: &AiConfig) -> Result<Arc<dyn LlmProvider>, ProviderError> {
        let mut config = serde_json::json!({});
        if let Some(url) = &ai.base_url {
            config["base_url"] = JsonValue::String(url.clone());
        }
        self.create(ai.provider.as_str(), &config)
    }

    pub fn available_types(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.available_types())
            .finish()
    }
}
