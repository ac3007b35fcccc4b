//! Tactics kernel - development tools

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tac_tools::list::{render, rows, Catalog, Format};
use tac_tools::validate::{
    validate_campaign_file, validate_data_directory, validate_effects_file, validate_map_file,
    ContentKind,
};

#[derive(Parser)]
#[command(name = "tac-tools")]
#[command(about = "Development tools for tactics kernel content")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a content file or every content file in a directory
    Validate {
        /// File or directory
        #[arg(default_value = "content")]
        path: PathBuf,
    },
    /// Show a campaign's levels and where each one continues
    Campaign {
        /// Campaign file
        path: PathBuf,
    },
    /// List a registry
    List {
        /// Registry to list
        #[arg(value_enum)]
        catalog: Catalog,
        /// Output format
        #[arg(short, long, value_enum, default_value_t = Format::Table)]
        format: Format,
    },
}

fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { path } => validate(&path),
        Commands::Campaign { path } => campaign(&path),
        Commands::List { catalog, format } => match render(&rows(catalog), format) {
            Ok(text) => {
                print!("{text}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                tracing::error!("{e}");
                ExitCode::FAILURE
            }
        },
    }
}

fn validate(path: &Path) -> ExitCode {
    tracing::info!("Validating {}", path.display());
    if path.is_dir() {
        return match validate_data_directory(path) {
            Ok(report) => {
                for warning in &report.warnings {
                    println!("warning  {}: {}", warning.path.display(), warning.message);
                }
                for error in &report.errors {
                    println!("error    {}: {}", error.path.display(), error.message);
                }
                println!(
                    "{} file(s) checked, {} error(s), {} warning(s)",
                    report.checked,
                    report.errors.len(),
                    report.warnings.len()
                );
                if report.is_valid() {
                    ExitCode::SUCCESS
                } else {
                    ExitCode::FAILURE
                }
            }
            Err(e) => {
                tracing::error!("Validation failed: {e}");
                ExitCode::FAILURE
            }
        };
    }

    let result = match ContentKind::of(path) {
        Some(ContentKind::Map) => validate_map_file(path).map(|_| ()),
        Some(ContentKind::Effects) => validate_effects_file(path, None).map(|(_, notices)| {
            for notice in notices {
                println!("warning  {}: {notice}", path.display());
            }
        }),
        Some(ContentKind::Campaign) => validate_campaign_file(path).map(|_| ()),
        None => {
            tracing::error!("{} is not a JSON content file", path.display());
            return ExitCode::FAILURE;
        }
    };
    match result {
        Ok(()) => {
            tracing::info!("Validation passed");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("Validation failed: {e}");
            ExitCode::FAILURE
        }
    }
}

fn campaign(path: &Path) -> ExitCode {
    let campaign = match validate_campaign_file(path) {
        Ok(campaign) => campaign,
        Err(e) => {
            tracing::error!("Invalid campaign: {e}");
            return ExitCode::FAILURE;
        }
    };
    println!("{} (starts at {})", campaign.name, campaign.next);
    for map_id in campaign.reachable() {
        let Ok(level) = campaign.level(map_id) else {
            continue;
        };
        if level.next.is_empty() {
            println!("  {map_id} -> (end)");
        }
        for next in &level.next {
            match next.objective() {
                Some(objective) => {
                    println!("  {map_id} -> {} (objective {objective})", next.map_id());
                }
                None => println!("  {map_id} -> {}", next.map_id()),
            }
        }
    }
    let unreachable = campaign.levels.len() - campaign.reachable().len();
    if unreachable > 0 {
        tracing::warn!("{unreachable} level(s) cannot be reached");
    }
    ExitCode::SUCCESS
}
