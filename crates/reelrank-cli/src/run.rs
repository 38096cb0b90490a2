//! The `run` command: read creators, fetch concurrently, persist the report.
//!
//! Per-creator failures are absorbed by the orchestrator and only show up in
//! the success count. Configuration and persistence errors abort the command.

use std::path::PathBuf;

use anyhow::Context;
use reelrank_core::AppConfig;
use reelrank_pipeline::{
    aggregate, persist_report, read_creators, CsvReportSink, Orchestrator, OrchestratorOptions,
    PersistStatus,
};
use reelrank_scraper::{DriverSettings, Selectors, WebDriverFactory};

#[derive(Debug, Clone, Default, PartialEq, Eq, clap::Args)]
pub(crate) struct RunArgs {
    /// Creator list (csv, xlsx, xls or ods).
    #[arg(long)]
    pub(crate) input: Option<PathBuf>,

    /// Directory the report is written to.
    #[arg(long)]
    pub(crate) output_dir: Option<PathBuf>,

    /// Maximum creators processed at once.
    #[arg(long)]
    pub(crate) workers: Option<usize>,

    /// Header of the column holding creator links.
    #[arg(long)]
    pub(crate) column: Option<String>,

    /// Print the creator list and exit without fetching.
    #[arg(long)]
    pub(crate) dry_run: bool,
}

/// Layer command-line flags over the loaded configuration.
pub(crate) fn apply_overrides(
    mut config: AppConfig,
    args: &RunArgs,
) -> anyhow::Result<AppConfig> {
    if let Some(input) = &args.input {
        config.input_path.clone_from(input);
    }
    if let Some(output_dir) = &args.output_dir {
        config.output_dir.clone_from(output_dir);
    }
    if let Some(workers) = args.workers {
        if workers == 0 {
            anyhow::bail!("--workers must be at least 1");
        }
        config.max_workers = workers;
    }
    if let Some(column) = &args.column {
        let column = column.trim();
        if column.is_empty() {
            anyhow::bail!("--column must not be blank");
        }
        column.clone_into(&mut config.input_column);
    }
    Ok(config)
}

pub(crate) async fn run(config: AppConfig, args: &RunArgs) -> anyhow::Result<()> {
    let config = apply_overrides(config, args)?;

    let creators = read_creators(&config.input_path, &config.input_column)
        .context("missing input source")?;

    if args.dry_run {
        println!(
            "dry-run: would process {} creators with {} workers",
            creators.len(),
            config.max_workers
        );
        for creator in &creators {
            println!("  {creator}");
        }
        return Ok(());
    }

    let settings = DriverSettings::from_app_config(&config);
    let factory = WebDriverFactory::new(&settings, Selectors::default())
        .map_err(|e| anyhow::anyhow!("failed to build webdriver client: {e}"))?;
    let orchestrator = Orchestrator::new(factory, OrchestratorOptions::from_app_config(&config))?;

    let mut progress = |completed: usize, total: usize| {
        println!("[{completed}/{total}] creators processed");
    };
    let outcome = orchestrator.run(creators, Some(&mut progress)).await;
    let elapsed = outcome.elapsed;

    let aggregation = aggregate(outcome.into_results());
    println!(
        "processed: {}/{} creators",
        aggregation.success_count, aggregation.total_count
    );

    let sink = CsvReportSink::new(&config.output_dir);
    match persist_report(&aggregation.report, &sink)? {
        PersistStatus::Written(path) => println!("report written to {}", path.display()),
        PersistStatus::NothingToPersist => println!("no results; nothing to persist"),
    }

    tracing::info!(elapsed_secs = elapsed.as_secs_f64(), "run finished");
    println!("elapsed: {:.1}s", elapsed.as_secs_f64());

    Ok(())
}
