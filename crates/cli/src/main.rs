//! `flowbuild` CLI entry-point.
//!
//! Available sub-commands:
//! - `validate` — validate a flow JSON file and print its execution order.
//! - `run`      — execute a flow with the built-in vertex kinds and stream the
//!                job's events to stdout as newline-delimited JSON.
//!
//! Logs go to stderr (filter with `RUST_LOG`), so stdout stays machine-readable.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use engine::{Engine, EngineConfig, Flow, JobStatus};
use futures::StreamExt;
use nodes::NodeRegistry;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "flowbuild",
    about = "Run flow graphs as cancellable background jobs",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate a flow definition JSON file.
    Validate {
        /// Path to the flow JSON file.
        path: PathBuf,
    },
    /// Execute a flow definition and print its events as NDJSON.
    Run {
        /// Path to the flow JSON file.
        path: PathBuf,
        /// Request cancellation after this many milliseconds.
        #[arg(long)]
        cancel_after_ms: Option<u64>,
        #[command(flatten)]
        engine: EngineArgs,
    },
}

#[derive(Args)]
struct EngineArgs {
    /// Events a job may run ahead of its slowest reader.
    #[arg(long, env = "FLOW_EVENT_BUFFER", default_value_t = 64)]
    event_buffer: usize,
    /// Seconds a finished job stays available.
    #[arg(long, env = "FLOW_RETENTION_SECS", default_value_t = 300)]
    retention_secs: u64,
    /// Seconds between eviction sweeps.
    #[arg(long, env = "FLOW_REAP_INTERVAL_SECS", default_value_t = 30)]
    reap_interval_secs: u64,
}

impl From<EngineArgs> for EngineConfig {
    fn from(args: EngineArgs) -> Self {
        EngineConfig::default()
            .with_event_buffer(args.event_buffer)
            .with_retention(Duration::from_secs(args.retention_secs))
            .with_reap_interval(Duration::from_secs(args.reap_interval_secs))
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Validate { path } => validate(&path),
        Command::Run {
            path,
            cancel_after_ms,
            engine,
        } => run(&path, cancel_after_ms, engine.into()).await,
    }
}

fn load_flow(path: &Path) -> Result<Flow> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read file {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("invalid flow JSON in {}", path.display()))
}

fn validate(path: &Path) -> Result<ExitCode> {
    let flow = load_flow(path)?;
    let engine = Engine::new(NodeRegistry::with_builtins(), EngineConfig::default());

    match engine.validate(flow) {
        Ok(plan) => {
            println!("Flow is valid. Execution order: {:?}", plan.order_ids());
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("Validation failed: {e}");
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn run(path: &Path, cancel_after_ms: Option<u64>, config: EngineConfig) -> Result<ExitCode> {
    let flow = load_flow(path)?;
    let engine = Engine::new(NodeRegistry::with_builtins(), config);

    let id = engine.submit(flow).context("flow rejected")?;
    info!(job_id = %id, "streaming job events");

    if let Some(ms) = cancel_after_ms {
        let engine = engine.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            if let Err(e) = engine.cancel(id) {
                warn!("cancel failed: {e}");
            }
        });
    }

    let mut events = engine.events(id)?.boxed();
    let mut stdout = tokio::io::stdout();
    let mut terminal = None;

    while let Some(event) = events.next().await {
        stdout.write_all(event.to_json_line()?.as_bytes()).await?;
        stdout.flush().await?;
        if let Some(end) = event.end() {
            terminal = Some(end.status);
        }
    }

    Ok(match terminal {
        Some(JobStatus::Completed) => ExitCode::SUCCESS,
        Some(JobStatus::Cancelled) => ExitCode::from(2),
        _ => ExitCode::FAILURE,
    })
}
