//! Headless tactics game runner.
//!
//! This binary runs a game without a client, controlled via JSON on stdin/stdout.
//! Designed for AI controllers, CI testing, and replay verification.
//!
//! # Usage
//!
//! ```bash
//! # Interactive mode - read commands from stdin
//! cargo run -p tac_headless -- run --session sessions/skirmish.ron
//!
//! # Verify replays in parallel
//! cargo run -p tac_headless -- verify --dir replays/ --output results/verify.json
//!
//! # Print the state hash of a map snapshot
//! cargo run -p tac_headless -- hash maps/duel.json
//! ```
//!
//! # Protocol
//!
//! Input (stdin): JSON commands, one per line
//! Output (stdout): JSON responses, one per line
//! Logs (stderr): Debug information
//!
//! See the protocol module for command/response format.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use tac_core::map::{MapState, PlayerId};
use tac_headless::{
    batch::{run_batch, BatchConfig},
    runner::{HeadlessRunner, RunnerError},
    session_config::SessionConfig,
};

#[derive(Parser)]
#[command(name = "tac_headless")]
#[command(about = "Headless tactics game runner for AI controllers and CI")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single interactive game
    Run {
        /// Session file (RON)
        #[arg(short, long, conflicts_with = "map")]
        session: Option<PathBuf>,

        /// Map snapshot (JSON), when no session file is given
        #[arg(short, long)]
        map: Option<PathBuf>,

        /// Report responses as this player sees them
        #[arg(long)]
        viewer: Option<u8>,

        /// Output state after every accepted step
        #[arg(long)]
        auto_state: bool,

        /// Write a replay when the runner quits
        #[arg(long)]
        replay: Option<PathBuf>,
    },

    /// Verify replay files
    Verify {
        /// Replay files
        replays: Vec<PathBuf>,

        /// Verify every JSON file in this directory
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// Maximum parallel verifications (0 = auto)
        #[arg(short, long, default_value = "0")]
        parallel: u32,

        /// Write results as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the state hash of a map snapshot
    Hash {
        /// Map snapshot (JSON)
        map: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs go to stderr, stdout is for the protocol
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(filter)
        .init();

    let result = match cli.command {
        Commands::Run {
            session,
            map,
            viewer,
            auto_state,
            replay,
        } => cmd_run(session, map, viewer, auto_state, replay),
        Commands::Verify {
            replays,
            dir,
            parallel,
            output,
        } => cmd_verify(replays, dir, parallel, output),
        Commands::Hash { map } => cmd_hash(map),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn cmd_run(
    session: Option<PathBuf>,
    map: Option<PathBuf>,
    viewer: Option<u8>,
    auto_state: bool,
    replay: Option<PathBuf>,
) -> Result<ExitCode, RunnerError> {
    let mut config = match (session, map) {
        (Some(path), _) => SessionConfig::load(path)?,
        (None, Some(map)) => SessionConfig::for_map(map),
        (None, None) => {
            error!("either --session or --map is required");
            return Ok(ExitCode::FAILURE);
        }
    };
    if let Some(viewer) = viewer {
        config.viewer = Some(PlayerId(viewer));
    }
    config.output.auto_state |= auto_state;
    if replay.is_some() {
        config.output.replay = replay;
    }

    let runner = HeadlessRunner::from_session(&config)?;
    info!(name = %config.name, "runner ready");
    runner.run_stdio()?;
    Ok(ExitCode::SUCCESS)
}

fn cmd_verify(
    mut replays: Vec<PathBuf>,
    dir: Option<PathBuf>,
    parallel: u32,
    output: Option<PathBuf>,
) -> Result<ExitCode, RunnerError> {
    if let Some(dir) = dir {
        replays.extend(BatchConfig::from_dir(&dir)?.replays);
    }
    let config = BatchConfig::new(replays).with_parallel(parallel);
    let results = run_batch(&config);

    for report in &results.verified {
        println!(
            "ok    {} ({} responses, hash {})",
            report.path.display(),
            report.responses,
            report.expected_hash
        );
    }
    for failure in &results.errors {
        println!("FAIL  {}: {}", failure.path.display(), failure.message);
    }
    if let Some(path) = output {
        results.save(&path)?;
        info!("Results saved to {}", path.display());
    }

    Ok(if results.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn cmd_hash(path: PathBuf) -> Result<ExitCode, RunnerError> {
    let json = std::fs::read_to_string(&path)?;
    let map = MapState::from_json(&json)?;
    println!("{}", map.state_hash());
    Ok(ExitCode::SUCCESS)
}
