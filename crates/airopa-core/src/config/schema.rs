//! JSON Schema check for pipeline configuration.
//!
//! Raw config documents are checked against `schema/pipeline.schema.json`
//! before deserialization, so typos in option names are reported instead of
//! silently falling back to defaults.

use std::sync::OnceLock;

/// Embedded config schema (loaded at compile time).
const CONFIG_SCHEMA_JSON: &str = include_str!("../../../../schema/pipeline.schema.json");

static COMPILED_SCHEMA: OnceLock<Result<jsonschema::Validator, String>> = OnceLock::new();

fn validator() -> Result<&'static jsonschema::Validator, String> {
    COMPILED_SCHEMA
        .get_or_init(|| {
            let schema: serde_json::Value = serde_json::from_str(CONFIG_SCHEMA_JSON)
                .map_err(|e| format!("Invalid schema JSON: {}", e))?;
            jsonschema::options()
                .build(&schema)
                .map_err(|e| format!("Failed to compile schema: {}", e))
        })
        .as_ref()
        .map_err(Clone::clone)
}

/// Validate a raw config value against the schema.
///
/// Returns every violation as `"<message> at <path>"`.
pub fn validate_config_schema(config: &serde_json::Value) -> Result<(), Vec<String>> {
    let validator = validator().map_err(|e| vec![e])?;

    let errors: Vec<String> = validator
        .iter_errors(config)
        .map(|e| format!("{} at {}", e, e.instance_path))
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
