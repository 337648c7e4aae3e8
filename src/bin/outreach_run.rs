//! Outreach runner binary.
//!
//! Runs one discovery-and-outreach pass, or replays a result store.
//!
//! ## Configuration
//!
//! Environment variables:
//! - `RUST_LOG`: Log level filter (default: `outreach_run=info,outreach_kernel=info`)
//! - `LOG_FORMAT`: "json" for structured logs, "pretty" for terminals (default: pretty)
//!
//! ## Usage
//!
//! ```bash
//! outreach_run run --config config.json --platform fixture.json --ledger sent_log.json
//! outreach_run run --config config.json --platform fixture.json --dry-run
//! outreach_run replay --results results.jsonl
//! ```
//!
//! Ctrl+C stops the run after the community being processed; a send in
//! flight is never abandoned.
//!
//! `--platform` takes a platform fixture (communities, users, injected
//! faults) served by the in-memory platform.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use outreach_kernel::{
    read_results, CooldownLedger, FrontierController, InMemoryPlatform, JsonlResultSink,
    PlatformClient, PlatformFixture, RunConfig, RunSummary, RESULT_SCHEMA_VERSION,
};

#[derive(Parser)]
#[command(name = "outreach_run")]
#[command(about = "Discover similar communities and message their owners")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one discovery and outreach pass
    Run {
        /// Run configuration (JSON)
        #[arg(long, short = 'c', default_value = "config.json")]
        config: PathBuf,

        /// Platform fixture (JSON)
        #[arg(long, short = 'p')]
        platform: PathBuf,

        /// Cooldown store
        #[arg(long, default_value = "sent_log.json")]
        ledger: PathBuf,

        /// Result store (JSON lines, appended)
        #[arg(long, default_value = "results.jsonl")]
        results: PathBuf,

        /// Resolve and expand only; send nothing
        #[arg(long)]
        dry_run: bool,
    },
    /// Print the records of a result store
    Replay {
        /// Result store (JSON lines)
        #[arg(long, default_value = "results.jsonl")]
        results: PathBuf,
    },
}

/// Initialize the tracing subscriber with JSON or pretty format
fn init_tracing() {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "outreach_run=info,outreach_kernel=info".into());

    if log_format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_current_span(true)
                    .flatten_event(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}

fn load_platform(path: &Path) -> Result<InMemoryPlatform, Box<dyn std::error::Error>> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read platform fixture {}: {e}", path.display()))?;
    let fixture = PlatformFixture::from_json(&raw)?;
    info!(
        communities = fixture.communities.len(),
        users = fixture.users.len(),
        "platform fixture loaded"
    );
    Ok(InMemoryPlatform::from_fixture(fixture))
}

async fn execute(
    platform: Arc<InMemoryPlatform>,
    config: &RunConfig,
    ledger: &Path,
    results: &Path,
    dry_run: bool,
) -> Result<RunSummary, Box<dyn std::error::Error>> {
    let ledger = CooldownLedger::load(ledger, config.cooldown_days);
    info!(
        path = ?ledger.path(),
        entries = ledger.len(),
        cooldown_days = ledger.cooldown_days(),
        "cooldown ledger ready"
    );
    let sink = JsonlResultSink::open(results)?;

    let (stop_tx, stop_rx) = watch::channel(false);
    let signal = tokio::spawn(async move {
        shutdown_signal().await;
        warn!("interrupt received, stopping after the current community");
        let _ = stop_tx.send(true);
    });

    let mut frontier = FrontierController::new(platform, config, ledger, sink)
        .with_dry_run(dry_run)
        .with_shutdown(stop_rx);
    let summary = frontier.run().await;
    signal.abort();

    if summary.interrupted {
        warn!(run_id = %frontier.run_id(), processed = summary.processed, "run interrupted");
    }
    Ok(summary)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
}

async fn run(
    config: &Path,
    platform: &Path,
    ledger: &Path,
    results: &Path,
    dry_run: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = RunConfig::load(config)?;
    info!(
        fingerprint = %config.fingerprint(),
        seeds = config.seed_channels.len(),
        target_language = ?config.target_language,
        max_sent = config.max_sent_per_run,
        "configuration loaded"
    );

    let platform = Arc::new(load_platform(platform)?);
    let outcome = execute(Arc::clone(&platform), &config, ledger, results, dry_run).await;
    platform.disconnect().await;

    match outcome {
        Ok(summary) => {
            println!("{}", serde_json::to_string_pretty(&summary)?);
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "run failed");
            Err(e)
        }
    }
}

fn replay(results: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let records = read_results(results)?;
    let mut by_status: BTreeMap<String, usize> = BTreeMap::new();
    for record in &records {
        *by_status.entry(record.status.to_string()).or_default() += 1;
        println!(
            "{}\t{}\t{}\t{}\t{}\t{}",
            record.timestamp.to_rfc3339(),
            record.community_link(),
            record.identity,
            record.language,
            record.status,
            record.depth,
        );
    }
    info!(path = %results.display(), records = records.len(), statuses = ?by_status, "replay complete");
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let cli = Cli::parse();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        result_schema = RESULT_SCHEMA_VERSION,
        "outreach_run starting"
    );

    match cli.command {
        Command::Run {
            config,
            platform,
            ledger,
            results,
            dry_run,
        } => run(&config, &platform, &ledger, &results, dry_run).await,
        Command::Replay { results } => replay(&results),
    }
}
