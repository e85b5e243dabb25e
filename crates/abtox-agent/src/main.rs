//! abtox — Antibody trial adverse-event extractor.
//! Entry point for the command-line binary.

mod config;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use abtox_aggregate::digest::write_digest;
use abtox_aggregate::tables::write_all_tables;
use abtox_aggregate::Analysis;
use abtox_common::{AbtoxError, RunConfig};
use abtox_ingestion::pipeline::{run_ingestion, IngestionJob, IngestionResult};
use abtox_ingestion::sources::clinicaltrials::ClinicalTrialsClient;
use abtox_ingestion::sources::StudySource;
use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Fetch antibody trials from ClinicalTrials.gov and tabulate their adverse events
#[derive(Parser, Debug)]
#[command(name = "abtox", version, about, long_about = None)]
struct Cli {
    /// Search term for the registry query
    #[arg(short = 'q', long = "query")]
    query: Option<String>,

    /// Studies per page (1-1000)
    #[arg(long)]
    page_size: Option<usize>,

    /// Stop after this many pages
    #[arg(long)]
    max_pages: Option<usize>,

    /// Directory for the output tables
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Configuration file path (TOML, YAML or JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Fetch full study records for trials whose search payload lacks results
    #[arg(long)]
    fetch_details: bool,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log warnings and errors
    #[arg(long)]
    quiet: bool,
}

fn init_tracing(cli: &Cli) {
    let default = match cli.verbose {
        0 if cli.quiet => "warn",
        0 => "abtox=debug,info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is fine
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    init_tracing(&cli);

    info!("abtox {} starting up", env!("CARGO_PKG_VERSION"));

    let overrides = config::Overrides {
        query: cli.query.clone(),
        page_size: cli.page_size,
        max_pages: cli.max_pages,
        output_dir: cli.output_dir.clone(),
        fetch_details: cli.fetch_details,
    };
    let (config, source) = config::load(cli.config.as_deref(), &overrides)?;
    match source {
        Some(path) => info!(path = %path.display(), "Configuration loaded"),
        None => info!("No config file found, using defaults"),
    }

    let client: Arc<dyn StudySource> = Arc::new(
        ClinicalTrialsClient::from_config(&config.registry).context("building registry client")?,
    );
    let job = IngestionJob::from_config(&config);

    // Ctrl-C drops the in-flight fetch; nothing is written after an interrupt.
    let result = tokio::select! {
        res = run_ingestion(&job, client, None) => res.context("registry ingestion failed")?,
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, no tables written");
            return Err(AbtoxError::Interrupted.into());
        }
    };

    write_outputs(&config, result)?;
    Ok(())
}

fn write_outputs(config: &RunConfig, result: IngestionResult) -> anyhow::Result<()> {
    info!(
        trials_fetched  = result.trials_found,
        antibody_trials = result.extraction.antibody_trials,
        trials_kept     = result.extraction.trials_included,
        "Filtering complete"
    );

    if result.events().is_empty() {
        warn!("No adverse event data found for antibody trials, nothing to write");
        return Ok(());
    }

    let extraction = result.extraction;
    let analysis = Analysis::build(extraction.events, extraction.arms, config.output.top_n_categories);

    let dir = Path::new(&config.output.dir);
    let reports = write_all_tables(dir, &analysis)
        .with_context(|| format!("writing tables to {}", dir.display()))?;
    if config.output.write_digest {
        write_digest(dir, &analysis).context("writing run digest")?;
    }

    let rows_written: usize = reports.iter().map(|r| r.rows).sum();
    info!(
        trials = analysis.trial_count(),
        arms = analysis.arms.len(),
        interventions = analysis.by_intervention.len(),
        tables = reports.len(),
        rows_written,
        dir = %dir.display(),
        "abtox run complete"
    );
    Ok(())
}
