//! Pipeline configuration.
//!
//! Configuration is plain data loaded once and handed to each component at
//! construction. Documents are checked against the embedded JSON Schema,
//! deserialized, then checked for constraints the schema cannot express.

mod parser;
mod schema;

pub use parser::{
    AiConfig, ConfigError, FeatureMode, PipelineConfig, ProviderKind, QualityConfig,
    ScraperConfig,
};
pub use schema::validate_config_schema;
