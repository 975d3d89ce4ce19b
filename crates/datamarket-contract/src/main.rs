//! # datamarket CLI
//!
//! Replays a JSON script of contract invocations against an in-memory
//! ledger and prints one JSON outcome per step.
//!
//! ```bash
//! datamarket crates/datamarket-contract/demos/full_flow.json
//! RUST_LOG=debug datamarket --json-logs --keep-going script.json
//! datamarket --config engine.json script.json
//! ```

use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::Parser;
use datamarket_contract::{DataMarket, Script, replay};
use datamarket_ledger::MemoryLedger;
use datamarket_types::{EngineConfig, constants::{ENGINE_NAME, VERSION}};
use tracing_subscriber::EnvFilter;

/// Replay DataMarket contract invocations.
#[derive(Parser, Debug)]
#[command(name = "datamarket", version, about)]
struct Cli {
    /// Script to replay.
    script: PathBuf,

    /// Engine configuration (JSON). Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines.
    #[arg(long)]
    json_logs: bool,

    /// Continue after a failing step.
    #[arg(long)]
    keep_going: bool,
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.json_logs);
    tracing::info!(engine = ENGINE_NAME, version = VERSION, "starting replay");

    let config = match &cli.config {
        Some(path) => EngineConfig::from_file(path)?,
        None => EngineConfig::default(),
    };
    let raw = std::fs::read_to_string(&cli.script)
        .with_context(|| format!("reading script {}", cli.script.display()))?;
    let script = Script::from_json_str(&raw)?;

    let market = DataMarket::new(MemoryLedger::new(), config)?;
    let outcomes = replay(&market, &script, cli.keep_going);
    for outcome in &outcomes {
        println!("{}", serde_json::to_string(outcome)?);
    }

    let failed = outcomes.iter().filter(|o| !o.is_ok()).count();
    if failed > 0 {
        bail!("{failed} of {} step(s) failed", script.steps.len());
    }
    Ok(())
}
