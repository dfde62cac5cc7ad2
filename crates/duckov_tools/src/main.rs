//! Duckov - Development Tools

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "duckov-tools")]
#[command(about = "Development tools for Duckov item content")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a content pack (or a directory of packs)
    Validate {
        /// Path to a .ron pack or a directory
        #[arg(default_value = "assets/data")]
        path: PathBuf,
    },
    /// Print the item catalog as JSON
    Catalog {
        /// Path to a .ron pack or a directory
        #[arg(default_value = "assets/data")]
        path: PathBuf,
    },
    /// List the keys stored in a save file
    InspectSave {
        /// Path to the save file
        path: PathBuf,
    },
}

fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { path } => {
            tracing::info!("Validating content in: {}", path.display());
            match duckov_tools::validate::validate_content(&path) {
                Ok(problems) if problems.is_empty() => {
                    tracing::info!("Validation passed");
                    ExitCode::SUCCESS
                }
                Ok(problems) => {
                    for problem in &problems {
                        tracing::error!("{problem}");
                    }
                    tracing::error!("Validation failed with {} problem(s)", problems.len());
                    ExitCode::FAILURE
                }
                Err(e) => {
                    tracing::error!("Validation failed: {e}");
                    ExitCode::FAILURE
                }
            }
        }
        Commands::Catalog { path } => {
            let json = duckov_tools::validate::load_content(&path)
                .map_err(|e| e.to_string())
                .and_then(|pack| {
                    duckov_tools::catalog::catalog_json(&pack).map_err(|e| e.to_string())
                });
            match json {
                Ok(json) => {
                    println!("{json}");
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    tracing::error!("Catalog listing failed: {e}");
                    ExitCode::FAILURE
                }
            }
        }
        Commands::InspectSave { path } => match duckov_tools::inspect::inspect_save(&path) {
            Ok(entries) => {
                for entry in entries {
                    match entry.summary {
                        Some(summary) => println!("{} ({} bytes): {summary}", entry.key, entry.bytes),
                        None => println!("{} ({} bytes)", entry.key, entry.bytes),
                    }
                }
                ExitCode::SUCCESS
            }
            Err(e) => {
                tracing::error!("Cannot read save: {e}");
                ExitCode::FAILURE
            }
        },
    }
}
