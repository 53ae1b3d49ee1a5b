//! Headless world runner.
//!
//! Runs scenarios without any interface. Reports go to stdout as JSON,
//! logs go to stderr.
//!
//! # Usage
//!
//! ```bash
//! # Run a scenario and save where it ended
//! cargo run -p realm_headless -- run --scenario assets/scenarios/skirmish.ron \
//!     --ticks 20000 --speed 10 --snapshot out.json
//!
//! # Continue from a snapshot
//! cargo run -p realm_headless -- resume --snapshot out.json --ticks 5000
//!
//! # Check determinism and replay
//! cargo run -p realm_headless -- verify --ticks 5000
//!
//! # Many seeds in parallel
//! cargo run -p realm_headless -- batch --count 64 --seed 100 --output results/batch.json
//! ```

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use realm_core::data::Catalog;
use realm_core::replay::Replay;
use realm_core::snapshot::Snapshot;
use realm_headless::{
    load_catalog, run_batch, BatchConfig, GameMetrics, HeadlessConfig, HeadlessRunner, Scenario,
};

#[derive(Parser)]
#[command(name = "realm_headless")]
#[command(about = "Headless world runner for CI and long runs")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Catalog file or directory
    #[arg(long, global = true, default_value = "assets/data")]
    catalog: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one scenario
    Run {
        /// Scenario file (defaults to the built-in skirmish)
        #[arg(short, long)]
        scenario: Option<PathBuf>,

        /// Seed override
        #[arg(long)]
        seed: Option<u64>,

        /// Ticks to run
        #[arg(short, long, default_value = "10000")]
        ticks: u64,

        /// Ticks per driver step (0 = pause)
        #[arg(long, default_value = "1")]
        speed: u32,

        /// Log progress every N ticks
        #[arg(long, default_value = "0")]
        progress: u64,

        /// Write a snapshot here when done
        #[arg(long)]
        snapshot: Option<PathBuf>,
    },

    /// Run twice and check a recorded replay
    Verify {
        /// Scenario file (defaults to the built-in skirmish)
        #[arg(short, long)]
        scenario: Option<PathBuf>,

        /// Seed override
        #[arg(long)]
        seed: Option<u64>,

        /// Ticks per run
        #[arg(short, long, default_value = "5000")]
        ticks: u64,

        /// Replay checkpoint interval
        #[arg(long, default_value = "500")]
        interval: u64,
    },

    /// Run many seeds in parallel
    Batch {
        /// Scenario file (defaults to the built-in skirmish)
        #[arg(short, long)]
        scenario: Option<PathBuf>,

        /// Number of runs
        #[arg(short, long, default_value = "16")]
        count: u32,

        /// Starting seed
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Ticks per run
        #[arg(short, long, default_value = "10000")]
        ticks: u64,

        /// Write results JSON here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Continue a saved snapshot
    Resume {
        /// Snapshot to load
        #[arg(long)]
        snapshot: PathBuf,

        /// Ticks to run
        #[arg(short, long, default_value = "10000")]
        ticks: u64,

        /// Write a new snapshot here when done
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

/// Outcome of the `verify` subcommand.
#[derive(Serialize)]
struct VerifyReport {
    scenario: String,
    seed: u64,
    ticks: u64,
    first_hash: u64,
    second_hash: u64,
    deterministic: bool,
    checkpoints: usize,
    replay_verified: bool,
    replay_error: Option<String>,
}

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let fallback = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(filter)
        .init();

    let outcome = match cli.command {
        Commands::Run {
            scenario,
            seed,
            ticks,
            speed,
            progress,
            snapshot,
        } => cmd_run(
            &cli.catalog,
            scenario.as_deref(),
            seed,
            ticks,
            HeadlessConfig {
                speed,
                progress_every: progress,
            },
            snapshot.as_deref(),
        ),
        Commands::Verify {
            scenario,
            seed,
            ticks,
            interval,
        } => cmd_verify(&cli.catalog, scenario.as_deref(), seed, ticks, interval),
        Commands::Batch {
            scenario,
            count,
            seed,
            ticks,
            output,
        } => cmd_batch(
            &cli.catalog,
            scenario.as_deref(),
            BatchConfig::new(count).with_seed(seed).with_ticks(ticks),
            output.as_deref(),
        ),
        Commands::Resume {
            snapshot,
            ticks,
            output,
        } => cmd_resume(&cli.catalog, &snapshot, ticks, output.as_deref()),
    };

    match outcome {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            ExitCode::FAILURE
        }
    }
}

fn load_inputs(catalog: &Path, scenario: Option<&Path>) -> CliResult<(Arc<Catalog>, Scenario)> {
    let catalog = Arc::new(load_catalog(catalog)?);
    let scenario = match scenario {
        Some(path) => Scenario::load(path)?,
        None => Scenario::skirmish(),
    };
    Ok((catalog, scenario))
}

fn print_json<T: Serialize>(value: &T) -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn cmd_run(
    catalog: &Path,
    scenario: Option<&Path>,
    seed: Option<u64>,
    ticks: u64,
    config: HeadlessConfig,
    snapshot: Option<&Path>,
) -> CliResult<bool> {
    let (catalog, scenario) = load_inputs(catalog, scenario)?;
    let seed = seed.unwrap_or(scenario.seed);
    let simulation = scenario.simulation(catalog, seed)?;

    let mut runner = HeadlessRunner::with_config(simulation, config);
    let executed = runner.run_ticks(ticks);
    tracing::info!(executed, tick = runner.simulation().tick_count(), "Run complete");

    if let Some(path) = snapshot {
        runner.snapshot().save(path)?;
        tracing::info!(path = %path.display(), "Snapshot written");
    }

    let sim = runner.simulation();
    print_json(&GameMetrics::collect(
        scenario.name.clone(),
        seed,
        sim.state(),
        sim.catalog(),
        runner.notifications(),
    ))?;
    Ok(true)
}

fn cmd_verify(
    catalog: &Path,
    scenario: Option<&Path>,
    seed: Option<u64>,
    ticks: u64,
    interval: u64,
) -> CliResult<bool> {
    let (catalog, scenario) = load_inputs(catalog, scenario)?;
    let seed = seed.unwrap_or(scenario.seed);

    let mut first = scenario.simulation(Arc::clone(&catalog), seed)?;
    first.run(ticks);
    let mut second = scenario.simulation(Arc::clone(&catalog), seed)?;
    let replay = Replay::record(scenario.name.clone(), &mut second, ticks, interval)?;

    let first_hash = first.state_hash();
    let second_hash = second.state_hash();
    let verified = replay.verify(catalog);
    let report = VerifyReport {
        scenario: scenario.name.clone(),
        seed,
        ticks,
        first_hash,
        second_hash,
        deterministic: first_hash == second_hash,
        checkpoints: replay.checkpoints.len(),
        replay_verified: verified.is_ok(),
        replay_error: verified.err().map(|e| e.to_string()),
    };
    if !report.deterministic {
        tracing::error!(first_hash, second_hash, "Runs diverged");
    }
    print_json(&report)?;
    Ok(report.deterministic && report.replay_verified)
}

fn cmd_batch(
    catalog: &Path,
    scenario: Option<&Path>,
    config: BatchConfig,
    output: Option<&Path>,
) -> CliResult<bool> {
    let (catalog, scenario) = load_inputs(catalog, scenario)?;
    let results = run_batch(&scenario, catalog, config);
    match output {
        Some(path) => {
            results.save(path)?;
            tracing::info!(path = %path.display(), "Batch results written");
        }
        None => print_json(&results)?,
    }
    Ok(results.errors.is_empty())
}

fn cmd_resume(
    catalog: &Path,
    snapshot: &Path,
    ticks: u64,
    output: Option<&Path>,
) -> CliResult<bool> {
    let catalog = Arc::new(load_catalog(catalog)?);
    let simulation = Snapshot::load(snapshot)?.restore(catalog)?;
    let seed = simulation.seed();
    tracing::info!(tick = simulation.tick_count(), seed, "Snapshot restored");

    let mut runner = HeadlessRunner::new(simulation);
    runner.run_ticks(ticks);
    if let Some(path) = output {
        runner.snapshot().save(path)?;
        tracing::info!(path = %path.display(), "Snapshot written");
    }

    let sim = runner.simulation();
    print_json(&GameMetrics::collect(
        "resumed",
        seed,
        sim.state(),
        sim.catalog(),
        runner.notifications(),
    ))?;
    Ok(true)
}
