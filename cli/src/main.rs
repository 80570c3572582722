//! Risk pool CLI
//!
//! Replays JSON scenario scripts against the pool engine and inspects
//! saved checkpoints.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use riskpool_core_rs::{InMemoryAsset, PoolConfig, PoolEngine};
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

mod scenario;

use scenario::Scenario;

/// Mutual risk-pooling ledger
#[derive(Parser)]
#[command(name = "riskpool")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Pool config file (JSON); defaults apply when omitted
    #[arg(short, long, global = true, env = "RISKPOOL_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a scenario script
    Run {
        /// Scenario file (JSON)
        #[arg(short, long)]
        scenario: PathBuf,

        /// Write a checkpoint of the final state here
        #[arg(long)]
        checkpoint: Option<PathBuf>,

        /// Log failed steps and continue instead of stopping
        #[arg(long, default_value_t = false)]
        keep_going: bool,
    },

    /// Summarize a saved checkpoint
    Inspect {
        /// Checkpoint file written by `run --checkpoint`
        checkpoint: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(cli.config.as_deref())?;
    match cli.command {
        Commands::Run {
            scenario,
            checkpoint,
            keep_going,
        } => run(config, &scenario, checkpoint.as_deref(), keep_going),
        Commands::Inspect { checkpoint } => inspect(config, &checkpoint),
    }
}

fn load_config(path: Option<&Path>) -> Result<PoolConfig> {
    let Some(path) = path else {
        return Ok(PoolConfig::default());
    };
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let config: PoolConfig =
        serde_json::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))?;
    config.validate()?;
    Ok(config)
}

fn run(config: PoolConfig, scenario_path: &Path, checkpoint: Option<&Path>, keep_going: bool) -> Result<()> {
    let raw = fs::read_to_string(scenario_path)
        .with_context(|| format!("reading scenario {}", scenario_path.display()))?;
    let scenario: Scenario = serde_json::from_str(&raw)
        .with_context(|| format!("parsing scenario {}", scenario_path.display()))?;

    let mut asset = InMemoryAsset::new();
    for (wallet, amount) in &scenario.wallets {
        asset.mint(wallet, *amount);
    }
    let mut engine = PoolEngine::new(config, asset)?;
    tracing::info!(steps = scenario.steps.len(), "Replaying scenario");

    let mut failures = 0usize;
    for (index, step) in scenario.steps.iter().enumerate() {
        match step.apply(&mut engine) {
            Ok(result) => println!(
                "{{\"step\":{},\"op\":\"{}\",\"result\":{}}}",
                index,
                step.name(),
                result
            ),
            Err(e) if e.is_fatal() => {
                tracing::error!(step = index, op = step.name(), error = %e, "Fatal invariant violation");
                bail!("step {} ({}) failed fatally: {}", index, step.name(), e);
            }
            Err(e) if keep_going => {
                tracing::warn!(step = index, op = step.name(), kind = ?e.kind(), error = %e, "Step failed");
                failures += 1;
            }
            Err(e) => bail!("step {} ({}) failed: {}", index, step.name(), e),
        }
    }

    let report = engine.reconcile();
    if !report.consistent {
        tracing::error!(issue = ?report.issue, "Reconciliation failed");
    }
    let summary = json!({
        "failed_steps": failures,
        "last_seen": engine.last_seen(),
        "activities": engine.activity_log().len(),
        "reconciliation": serde_json::to_value(&report)?,
        "risk_state": serde_json::to_value(engine.reinsurance_state())?,
        "events": engine.events().map(serde_json::to_value).collect::<Result<Vec<_>, _>>()?,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);

    if let Some(path) = checkpoint {
        let state = engine.save_state()?;
        fs::write(path, state).with_context(|| format!("writing checkpoint {}", path.display()))?;
        tracing::info!(path = %path.display(), "Checkpoint written");
    }
    Ok(())
}

fn inspect(config: PoolConfig, path: &Path) -> Result<()> {
    let raw = fs::read_to_string(path).with_context(|| format!("reading checkpoint {}", path.display()))?;
    let engine = PoolEngine::load_state(config, &raw, InMemoryAsset::new())
        .with_context(|| format!("restoring checkpoint {}", path.display()))?;

    let state = engine.state();
    let summary = json!({
        "last_seen": engine.last_seen(),
        "participants": state.ledger().participants().count(),
        "insurers": state.capital_pool().insurers().count(),
        "reinsurers": state.reinsurance_pool().reinsurers().count(),
        "events": state.events().len(),
        "policies": state.policies().len(),
        "protocol_fees": engine.protocol_fees().to_string(),
        "total_system_liquidity": engine.total_system_liquidity().to_string(),
        "risk_state": serde_json::to_value(engine.reinsurance_state())?,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
