//! # airopa-runtime
//!
//! LLM-assisted stages of the AIropa news pipeline.
//!
//! Everything deterministic lives in `airopa-core`. This crate adds the
//! parts that talk to a model:
//! - [`LlmGateway`] over a pluggable [`LlmProvider`] (Groq or Mistral)
//! - [`LlmClassifier`] and [`Summarizer`], each disabled, shadow or live
//! - [`TokenBudget`] and per-call [`TelemetryRecord`]s
//! - the [`Pipeline`] that runs a batch end to end, or one article at a
//!   time, and compares keyword and LLM classification side by side
//!
//! ## Failure Model
//!
//! No LLM failure stops a run. Missing keys, timeouts, API errors and
//! malformed output all become telemetry, and the article falls back to
//! keyword classification or keeps its existing summary.
//!
//! ## Example
//!
//! ```rust,ignore
//! use airopa_core::PipelineConfig;
//! use airopa_runtime::{MemorySink, Pipeline, StaticSource};
//!
//! let config = PipelineConfig::from_yaml_file("pipeline.yaml")?.with_env_overrides()?;
//! let pipeline = Pipeline::from_config(config)?;
//!
//! let sources: Vec<Arc<dyn ArticleSource>> = vec![Arc::new(StaticSource::from_json_file("articles.json")?)];
//! let report = pipeline.run(&sources, &MemorySink::new()).await;
//! println!("stored {} of {}", report.stored, report.unique);
//! ```

pub mod agents;
pub mod budget;
pub mod gateway;
pub mod orchestrator;
pub mod prompts;
pub mod providers;
pub mod sink;
pub mod telemetry;

pub use agents::{Classified, LlmClassifier, Summarized, Summarizer};
pub use budget::TokenBudget;
pub use gateway::{CallOutcome, GatewayResponse, LlmGateway, LlmStatus};
pub use orchestrator::{
    Comparison, Pipeline, PipelineBuilder, RunReport, RuntimeError, StageOutput,
};
pub use providers::{
    ChatCompletionsProvider, CompletionConfig, LlmProvider, ProviderError, ProviderRegistry,
};
pub use sink::{ArticleSink, ArticleSource, CollaboratorError, MemorySink, StaticSource};
pub use telemetry::TelemetryRecord;
