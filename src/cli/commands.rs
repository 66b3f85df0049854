//! Command handlers for NetSound Fetcher CLI
//!
//! This module implements the command handlers that connect CLI arguments and
//! configuration to the curation pipeline.

use std::path::PathBuf;

use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use crate::app::output::render;
use crate::app::{
    build_transport, create_shutdown_channel, Aggregator, DedupLedger, LedgerSnapshot,
    OutputWriter, ProgressEvent, QueryBuilder, RunOutcome, SignalHandler,
};
use crate::cli::{ConfigAction, ConfigArgs, ProgressConfig, ProgressDisplay, SearchArgs};
use crate::config::AppConfig;
use crate::errors::{AppError, Result};

/// Per-invocation switches that are not part of the configuration
#[derive(Debug, Default)]
pub struct SearchOptions {
    /// Skip the artifact and the ledger
    pub dry_run: bool,
    /// Progress event sink
    pub progress: Option<mpsc::UnboundedSender<ProgressEvent>>,
    /// Cancellation signal
    pub shutdown: Option<broadcast::Receiver<()>>,
}

/// What a completed search produced
#[derive(Debug)]
pub struct SearchReport {
    pub outcome: RunOutcome,
    /// Written list, `None` for dry runs
    pub written: Option<PathBuf>,
    /// Ledger lines appended
    pub recorded: usize,
}

/// Run one search end to end: aggregate, write the list, update the ledger
///
/// The ledger is only appended after the list was written, so a failed write
/// never marks URLs as delivered.
///
/// # Errors
///
/// Returns `AppError::NoCandidatesFound` when nothing qualified, and the
/// underlying error for invalid configuration, unreadable ledgers and failed
/// writes
pub async fn execute_search(
    term: &str,
    config: &AppConfig,
    options: SearchOptions,
) -> Result<SearchReport> {
    let preset = config.search.preset()?;
    let query = QueryBuilder::from_preset(term, preset)
        .exclude_title_tokens(config.search.exclude.iter().cloned())
        .exclude_collections(config.search.exclude_collections.iter().cloned())
        .include_subjects(config.search.include_subjects.iter().cloned());
    query.validate()?;

    let endpoints = config.catalog.to_runtime_config()?;
    let transport = build_transport(&config.client.to_runtime_config())?;
    let dedupe = config.output.dedupe;
    let run_config = config.search.to_runtime_config(&config.filter, dedupe)?;

    let ledger = DedupLedger::new(&config.output.history);
    let snapshot = if dedupe {
        ledger.load().await?
    } else {
        LedgerSnapshot::new()
    };
    debug!("Ledger snapshot holds {} URLs", snapshot.len());

    let mut aggregator = Aggregator::new(run_config, transport, &endpoints, query)?
        .with_ledger(snapshot);
    if let Some(progress) = options.progress {
        aggregator = aggregator.with_progress(progress);
    }
    if let Some(shutdown) = options.shutdown {
        aggregator = aggregator.with_shutdown(shutdown);
    }

    let outcome = aggregator.run().await;
    if outcome.batch.is_empty() {
        return Err(AppError::NoCandidatesFound {
            query: term.to_string(),
        });
    }
    if outcome.is_short() {
        warn!(
            "Only {} of {} requested URLs found",
            outcome.batch.len(),
            outcome.batch.target()
        );
    }

    if options.dry_run {
        info!("Dry run, skipping output and ledger");
        return Ok(SearchReport {
            outcome,
            written: None,
            recorded: 0,
        });
    }

    let writer = OutputWriter::new(&config.output.out_dir, config.output.naming_policy())
        .with_latest(config.output.latest.clone());
    let written = writer.write(&outcome.batch).await?;

    let recorded = if dedupe {
        ledger.append(outcome.batch.urls()).await?
    } else {
        0
    };

    Ok(SearchReport {
        outcome,
        written: Some(written),
        recorded,
    })
}

/// Handle the search command
///
/// Merges the flags into the loaded configuration, wires Ctrl-C and the
/// progress display, and prints the result.
pub async fn handle_search(args: SearchArgs, mut config: AppConfig, quiet: bool) -> Result<()> {
    args.apply(&mut config);
    info!(
        "Searching '{}' with preset {} for {} URLs",
        args.query, config.search.preset, config.search.count
    );

    let (shutdown_tx, shutdown_rx) = create_shutdown_channel();
    let signal_task = SignalHandler::new(shutdown_tx).setup();

    let mut display = (!quiet).then(|| ProgressDisplay::new(ProgressConfig::default()));
    let progress = display
        .as_mut()
        .map(|display| display.start(config.search.count));

    let result = execute_search(
        &args.query,
        &config,
        SearchOptions {
            dry_run: args.dry_run,
            progress,
            shutdown: Some(shutdown_rx),
        },
    )
    .await;

    if let Some(display) = display.as_mut() {
        display.finish().await;
    }
    signal_task.abort();

    let report = result?;
    match &report.written {
        Some(path) => {
            println!("{}", path.display());
            if report.recorded > 0 {
                info!(
                    "Recorded {} URLs in {}",
                    report.recorded,
                    config.output.history.display()
                );
            }
        }
        None => print!("{}", render(&report.outcome.batch)),
    }

    if !quiet {
        eprintln!("{}", report.outcome.summary());
    }
    Ok(())
}

/// Handle configuration management commands
pub async fn handle_config(
    args: ConfigArgs,
    config: AppConfig,
    config_path: Option<PathBuf>,
) -> Result<()> {
    match args.action {
        ConfigAction::Init { force } => {
            let path = AppConfig::init(config_path, force).await?;
            println!("Wrote configuration to {}", path.display());
        }
        ConfigAction::Show => {
            print!("{}", config.to_toml_string()?);
        }
    }
    Ok(())
}
