use anyhow::{Context, Result};
use clap::Parser;
use paper_harvest::config::{find_config_file, load_config, parse_list, Config};
use paper_harvest::output::{run_timestamp, write_outputs};
use paper_harvest::pipeline::{Orchestrator, OrchestratorConfig};
use paper_harvest::sources::SourceRegistry;
use paper_harvest::utils::{deduplicate_records, find_duplicates};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Paper Harvest - Collect literature metadata from PubMed, Crossref and OpenAlex
#[derive(Parser, Debug)]
#[command(name = "paper-harvest")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Collect, normalize and deduplicate literature metadata", long_about = None)]
struct Cli {
    /// Comma-separated search keywords
    /// [default: aortic stenosis, mitral regurgitation, valvular heart disease, deep learning]
    #[arg(long, short)]
    keywords: Option<String>,

    /// Comma-separated sources (pubmed, crossref, openalex) [default: pubmed,crossref,openalex]
    #[arg(long, short)]
    sources: Option<String>,

    /// Directory for CSV and Markdown output [default: data]
    #[arg(long, short)]
    output_dir: Option<PathBuf>,

    /// Maximum results per source and keyword [default: 20]
    #[arg(long, short)]
    max_results: Option<usize>,

    /// Request timeout in seconds [default: 30]
    #[arg(long)]
    timeout: Option<u64>,

    /// Maximum concurrent requests per source [default: 2]
    #[arg(long)]
    concurrency: Option<usize>,

    /// Configuration file path
    #[arg(long)]
    config: Option<PathBuf>,

    /// Enable verbose logging (can be used multiple times for more verbosity: -v, -vv)
    #[arg(long, short, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(long, short)]
    quiet: bool,
}

impl Cli {
    /// Apply command-line overrides on top of file and environment settings
    fn apply(&self, config: &mut Config) {
        if let Some(keywords) = &self.keywords {
            config.search.keywords = keywords.clone();
        }
        if let Some(sources) = &self.sources {
            config.search.sources = sources.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.output.directory = dir.clone();
        }
        if let Some(max_results) = self.max_results {
            config.search.max_results = max_results;
        }
        if let Some(timeout) = self.timeout {
            config.http.timeout_secs = timeout;
        }
        if let Some(concurrency) = self.concurrency {
            config.http.max_concurrent_per_source = concurrency;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing based on verbosity
    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let env_filter = if cli.quiet { "error" } else { log_level };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("paper_harvest={}", env_filter)),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from file if specified or found in default locations
    let config_path = match &cli.config {
        Some(path) => Some(path.clone()),
        None => find_config_file(),
    };
    if let Some(path) = &config_path {
        tracing::info!("Using config file: {}", path.display());
    }
    let mut config = load_config(config_path.as_deref()).context("Failed to load configuration")?;
    cli.apply(&mut config);

    let keywords = parse_list(&config.search.keywords);
    let sources = parse_list(&config.search.sources);

    if keywords.is_empty() {
        tracing::warn!("No keywords provided; nothing to fetch.");
        return Ok(());
    }
    if sources.is_empty() {
        tracing::warn!("No sources provided; nothing to fetch.");
        return Ok(());
    }

    tracing::info!(
        "Fetching {} keyword(s) from {}",
        keywords.len(),
        sources.join(", ")
    );

    let registry = SourceRegistry::from_config(&config).context("Failed to create HTTP client")?;
    let orchestrator = Orchestrator::new(registry, OrchestratorConfig::from(&config.http));
    let report = orchestrator.run(&sources, &keywords).await;

    tracing::info!(
        "Completed {}/{} fetches, {} records",
        report.units_succeeded,
        report.units_total(),
        report.records.len()
    );

    let duplicate_groups = find_duplicates(&report.records);
    if !duplicate_groups.is_empty() {
        let extra: usize = duplicate_groups.iter().map(|g| g.len() - 1).sum();
        tracing::info!(
            "Found {} duplicate groups ({} redundant records)",
            duplicate_groups.len(),
            extra
        );
    }

    let records = deduplicate_records(report.records);
    tracing::info!("{} unique records after deduplication", records.len());

    let files = write_outputs(
        &records,
        &config.output.directory,
        &run_timestamp(),
        &config.output.summary_title,
    )?;
    tracing::debug!(
        "Wrote {}, {} and {}",
        files.csv.display(),
        files.latest_csv.display(),
        files.summary.display()
    );

    Ok(())
}
