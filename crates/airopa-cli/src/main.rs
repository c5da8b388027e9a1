//! `airopa` command line.
//!
//! Runs the classification and scoring pipeline over JSON article files,
//! compares keyword and LLM classification, validates configuration, and
//! exposes the LLM response validators for debugging prompts.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use airopa_core::{
    excerpt, parse_classification, parse_summary, validate_classification, Article, Category,
    PipelineConfig,
};
use airopa_runtime::{
    providers::api_key_env, ArticleSource, Comparison, MemorySink, Pipeline, RunReport,
    StaticSource, TelemetryRecord,
};

#[derive(Parser, Debug)]
#[command(name = "airopa", author, version, about = "AIropa news classification and scoring")]
struct Cli {
    /// Pipeline config (YAML or JSON). Defaults apply when omitted.
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    /// Debug logging (overrides RUST_LOG)
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Print machine-readable JSON instead of a text summary
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the full pipeline over one or more JSON article files
    Run {
        /// Files holding a JSON array of raw articles
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },
    /// Classify, summarize and score articles without storing them
    Classify {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },
    /// Classify each article with keywords and with the LLM, side by side
    Compare {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },
    /// Validate a config file and print the effective configuration
    CheckConfig,
    /// Run an LLM response validator on text from an argument or stdin
    Parse {
        #[arg(value_enum)]
        kind: ParseKind,
        /// Response text; reads stdin when omitted
        text: Option<String>,
        /// Article title; applies the business rules after parsing a classification
        #[arg(long)]
        title: Option<String>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ParseKind {
    Classification,
    Summary,
}

#[derive(Serialize)]
struct ArticleRow<'a> {
    title: &'a str,
    source: &'a str,
    category: Option<Category>,
    country: &'a str,
    eu_relevance: f64,
    confidence: f64,
    quality_score: f64,
    summary: &'a str,
}

#[derive(Serialize)]
struct ClassifyOutput<'a> {
    articles: Vec<ArticleRow<'a>>,
    tokens_used: u64,
    telemetry: &'a [TelemetryRecord],
}

#[derive(Serialize)]
struct CompareOutput<'a> {
    comparisons: &'a [Comparison],
    llm_ok: usize,
    category_matches: usize,
    tokens_used: u64,
}

impl<'a> From<&'a Article> for ArticleRow<'a> {
    fn from(a: &'a Article) -> Self {
        Self {
            title: &a.title,
            source: &a.source,
            category: a.category,
            country: &a.country,
            eu_relevance: a.eu_relevance,
            confidence: a.confidence,
            quality_score: a.quality_score,
            summary: &a.summary,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Run { ref inputs } => {
            let pipeline = Pipeline::from_config(load_config(cli.config.as_deref())?)?;
            let sources = load_sources(inputs)?;
            tracing::info!(sources = sources.len(), "Starting pipeline run");
            let report = pipeline.run(&sources, &MemorySink::new()).await;
            if cli.json {
                print_json(&report)?;
            } else {
                print_report(&report);
            }
        }
        Command::Classify { ref inputs } => {
            let config = load_config(cli.config.as_deref())?;
            let source_map = config.scraper.source_name_map.clone();
            let pipeline = Pipeline::from_config(config)?;

            let budget = pipeline.new_budget();
            let mut telemetry = Vec::new();
            let mut articles = Vec::new();
            for article in load_articles(&source_map, inputs).await? {
                articles.push(pipeline.process(article, &budget, &mut telemetry).await);
            }

            if cli.json {
                print_json(&ClassifyOutput {
                    articles: articles.iter().map(ArticleRow::from).collect(),
                    tokens_used: budget.used(),
                    telemetry: &telemetry,
                })?;
            } else {
                for a in &articles {
                    println!(
                        "{:.2}  {:<9} {:<12} eu={:<4} {}",
                        a.quality_score,
                        a.category.map(|c| c.as_str()).unwrap_or("-"),
                        if a.country.is_empty() { "-" } else { a.country.as_str() },
                        a.eu_relevance,
                        a.short_title(70)
                    );
                }
                println!(
                    "{} articles, {} LLM calls, tokens used: {}",
                    articles.len(),
                    telemetry.len(),
                    budget.used()
                );
            }
        }
        Command::Compare { ref inputs } => {
            let config = load_config(cli.config.as_deref())?;
            let source_map = config.scraper.source_name_map.clone();
            let pipeline = Pipeline::from_config(config)?;
            if !pipeline.provider_ready().await {
                tracing::warn!("No API key configured, every LLM column will fail");
            }

            let budget = pipeline.new_budget();
            let mut comparisons = Vec::new();
            for article in load_articles(&source_map, inputs).await? {
                comparisons.push(pipeline.compare(article, &budget).await);
            }

            let llm_ok = comparisons.iter().filter(|c| c.llm.is_some()).count();
            let category_matches = comparisons.iter().filter(|c| c.category_match()).count();
            if cli.json {
                print_json(&CompareOutput {
                    comparisons: &comparisons,
                    llm_ok,
                    category_matches,
                    tokens_used: budget.used(),
                })?;
            } else {
                print_comparisons(&comparisons);
                println!(
                    "\nResults: {}/{} LLM succeeded, {}/{} category match with keywords, tokens used: {}",
                    llm_ok,
                    comparisons.len(),
                    category_matches,
                    comparisons.len(),
                    budget.used()
                );
            }
        }
        Command::CheckConfig => {
            let config = load_config(cli.config.as_deref())?;
            let key_present = Pipeline::from_config(config.clone())?.provider_ready().await;
            if cli.json {
                print_json(&config)?;
            } else {
                println!("Configuration OK");
                println!("  provider:       {} ({})", config.ai.provider, config.ai.model_name());
                println!(
                    "  api key:        {} ({})",
                    if key_present { "present" } else { "missing" },
                    api_key_env(config.ai.provider)
                );
                println!("  classification: {}", config.ai.classification_mode());
                println!("  summary:        {}", config.ai.summary_mode());
                println!(
                    "  token budget:   {}",
                    match config.ai.budget_max_tokens_per_run {
                        0 => "unlimited".to_string(),
                        n => n.to_string(),
                    }
                );
                println!("  publish at:     {}", config.quality.publish_threshold);
            }
        }
        Command::Parse { kind, text, title } => {
            let text = match text {
                Some(text) if text != "-" => text,
                _ => read_stdin()?,
            };
            match kind {
                ParseKind::Classification => {
                    let mut result = parse_classification(&text);
                    if let Some(title) = title {
                        result = validate_classification(result, &title);
                    }
                    print_json(&result)?;
                }
                ParseKind::Summary => print_json(&parse_summary(&text))?,
            }
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    let config = match path {
        Some(path) => PipelineConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    config
        .with_env_overrides()
        .context("Invalid environment override")
}

fn load_sources(inputs: &[PathBuf]) -> Result<Vec<Arc<dyn ArticleSource>>> {
    inputs
        .iter()
        .map(|path| {
            let source = StaticSource::from_json_file(path)
                .with_context(|| format!("Failed to read articles from {}", path.display()))?;
            Ok(Arc::new(source) as Arc<dyn ArticleSource>)
        })
        .collect()
}

async fn load_articles(
    source_map: &BTreeMap<String, String>,
    inputs: &[PathBuf],
) -> Result<Vec<Article>> {
    let mut articles = Vec::new();
    for source in load_sources(inputs)? {
        for raw in source.fetch().await? {
            articles.push(Article::from_raw(raw, source_map));
        }
    }
    Ok(articles)
}

fn read_stdin() -> Result<String> {
    let mut buf = String::new();
    std::io::stdin()
        .read_to_string(&mut buf)
        .context("Failed to read stdin")?;
    Ok(buf)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_comparisons(comparisons: &[Comparison]) {
    let header = format!(
        "{:<47} {:<13} {:<10} {:<10} {:<10} {:<10} {:>3} {:>6} {:>5}",
        "Title", "Source", "KW Cat", "LLM Cat", "KW Ctry", "LLM Ctry", "EU", "Tokens", "Match"
    );
    println!("{header}");
    println!("{}", "-".repeat(header.len()));

    for c in comparisons {
        let (llm_cat, llm_country, llm_eu) = match &c.llm {
            Some(r) => (
                r.category.as_str().to_string(),
                if r.country.is_empty() { "-".to_string() } else { r.country.clone() },
                format!("{:.0}", r.eu_relevance),
            ),
            None => ("FAIL".to_string(), "-".to_string(), "-".to_string()),
        };
        println!(
            "{:<47} {:<13} {:<10} {:<10} {:<10} {:<10} {:>3} {:>6} {:>5}",
            excerpt(&c.title, 45),
            excerpt(&c.source, 12),
            c.keyword_category.map(|cat| cat.as_str()).unwrap_or("-"),
            llm_cat,
            if c.keyword_country.is_empty() { "-" } else { c.keyword_country.as_str() },
            llm_country,
            llm_eu,
            c.telemetry.as_ref().map_or(0, |t| t.total_tokens()),
            if c.category_match() { "Y" } else { "N" },
        );
    }
}

fn print_report(report: &RunReport) {
    println!(
        "Fetched {} articles ({} stale, {} unique, {} failed sources)",
        report.fetched, report.stale, report.unique, report.failed_sources
    );
    println!(
        "Classified {} (LLM: {} ok, {} failed, {} budget-skipped, {} keyword-only)",
        report.classified,
        report.llm_ok,
        report.llm_failed,
        report.budget_skipped,
        report.keyword_only
    );
    println!(
        "Summarized {} ({} budget-skipped), tokens used: {}",
        report.summarized, report.summary_skipped, report.tokens_used
    );
    println!(
        "{} high-quality, {} stored",
        report.high_quality, report.stored
    );
    for metric in &report.source_metrics {
        println!(
            "  {:<24} fetched={:<3} stored={:<3} relevant={:<3} avg_eu={} avg_quality={}",
            metric.source_name,
            metric.articles_fetched,
            metric.articles_stored,
            metric.articles_passed_relevance,
            metric
                .avg_eu_relevance
                .map_or_else(|| "-".to_string(), |v| v.to_string()),
            metric
                .avg_quality_score
                .map_or_else(|| "-".to_string(), |v| v.to_string()),
        );
    }
}
