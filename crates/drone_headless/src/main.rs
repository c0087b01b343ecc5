//! Headless drone simulation runner.
//!
//! This binary runs the harvest simulation without graphics, controlled via
//! JSON on stdin/stdout.
//!
//! # Usage
//!
//! ```bash
//! # Interactive mode - read commands from stdin
//! cargo run -p drone_headless -- run
//!
//! # Interactive mode with a bare config file
//! cargo run -p drone_headless -- run --config tuning.ron --seed 3
//!
//! # Play a scenario file and print its report
//! cargo run -p drone_headless -- scenario --file scenarios/skirmish.ron --ticks 600
//!
//! # Verify determinism
//! cargo run -p drone_headless -- verify --seed 7 --runs 5 --ticks 3600
//! ```
//!
//! # Protocol
//!
//! Input (stdin): JSON commands, one per line
//! Output (stdout): JSON responses, one per line
//! Logs (stderr): Debug information

use std::io;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use drone_headless::{run_scenario, verify_determinism, HeadlessRunner, Scenario, ScenarioError};

#[derive(Parser)]
#[command(name = "drone_headless")]
#[command(about = "Headless drone harvest simulation for scripting and CI")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an interactive session on stdin/stdout
    Run {
        /// Scenario file providing the config and seed
        #[arg(short, long, conflicts_with = "config")]
        scenario: Option<PathBuf>,

        /// Bare simulation config file (RON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Seed, overriding the scenario's own
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Play a scenario file and print the report as JSON
    Scenario {
        /// Scenario file path
        #[arg(short, long)]
        file: PathBuf,

        /// Frames to run instead of the scenario's duration
        #[arg(short, long)]
        ticks: Option<u64>,
    },

    /// Verify determinism by running same seed multiple times
    Verify {
        /// Scenario file; the built-in default when omitted
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Seed to verify, overriding the scenario's own
        #[arg(long)]
        seed: Option<u64>,

        /// Number of verification runs
        #[arg(short, long, default_value = "5")]
        runs: u32,

        /// Frames per run
        #[arg(short, long, default_value = "3600")]
        ticks: u64,
    },
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging to stderr (stdout is for protocol)
    let log_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(tracing_subscriber::filter::LevelFilter::from_level(
            log_level,
        ))
        .init();

    match cli.command {
        Some(Commands::Run {
            scenario,
            config,
            seed,
        }) => cmd_run(scenario, config, seed),
        Some(Commands::Scenario { file, ticks }) => cmd_scenario(file, ticks),
        Some(Commands::Verify {
            file,
            seed,
            runs,
            ticks,
        }) => cmd_verify(file, seed, runs, ticks),
        None => cmd_run(None, None, None),
    }
}

fn exit_on_error(loaded: Result<Scenario, ScenarioError>) -> Scenario {
    match loaded {
        Ok(scenario) => scenario,
        Err(e) => {
            eprintln!("Failed to load scenario: {}", e);
            std::process::exit(1);
        }
    }
}

fn load_or_exit(path: &Path) -> Scenario {
    exit_on_error(Scenario::load(path))
}

/// Interactive JSON-lines session
fn cmd_run(scenario: Option<PathBuf>, config: Option<PathBuf>, seed: Option<u64>) {
    let mut scenario = match (scenario, config) {
        (Some(path), _) => load_or_exit(&path),
        (None, Some(path)) => exit_on_error(Scenario::from_config_file(&path)),
        (None, None) => Scenario::default(),
    };
    scenario.override_seed(seed);

    let mut runner = match HeadlessRunner::from_scenario(&scenario) {
        Ok(runner) => runner,
        Err(e) => {
            eprintln!("Failed to start simulation: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("Starting interactive session: {}", scenario.name);
    let stdin = io::stdin();
    if let Err(e) = runner.run(stdin.lock(), io::stdout().lock()) {
        eprintln!("Session I/O error: {}", e);
        std::process::exit(1);
    }
}

/// Play a scenario to completion
fn cmd_scenario(file: PathBuf, ticks: Option<u64>) {
    let scenario = load_or_exit(&file);

    match run_scenario(&scenario, ticks) {
        Ok(report) => match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Failed to serialize report: {}", e);
                std::process::exit(1);
            }
        },
        Err(e) => {
            eprintln!("Scenario failed: {}", e);
            std::process::exit(1);
        }
    }
}

/// Verify determinism across repeated runs
fn cmd_verify(file: Option<PathBuf>, seed: Option<u64>, runs: u32, ticks: u64) {
    let mut scenario = file
        .as_deref()
        .map(load_or_exit)
        .unwrap_or_default();
    scenario.override_seed(seed);

    tracing::info!(
        "Verifying determinism: {} with seed {} ({} runs, {} ticks)",
        scenario.name,
        scenario.seed,
        runs,
        ticks
    );

    match verify_determinism(&scenario, runs, Some(ticks)) {
        Ok(report) if report.is_deterministic => {
            eprintln!("PASS: All {} runs produced identical results", runs);
            if let Some(hash) = report.hashes.first() {
                eprintln!("  Final hash: {:016x}", hash);
            }
        }
        Ok(report) => {
            eprintln!("FAIL: Non-determinism detected!");
            for (run, hash) in report.hashes.iter().enumerate() {
                eprintln!("  Run {}: {:016x}", run, hash);
            }
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("Verification failed: {}", e);
            std::process::exit(1);
        }
    }
}
