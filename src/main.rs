//! # nasimport - Media Library Import CLI
//!
//! Identifies downloaded video files as TV episodes, documentaries or movies,
//! matches them against an existing library and online catalogs, and files
//! them under canonical names, remuxing into matroska when needed.
//!
//! ## Usage
//!
//! ```bash
//! # Import files, choosing each match interactively
//! nasimport import --config config.json ~/Downloads/*.mkv
//!
//! # Import without prompting, taking the best match
//! nasimport import --auto ~/Downloads/the.wire.s01e02.avi
//!
//! # Show how file names are classified
//! nasimport classify ~/Downloads/*.mkv
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use nasimport::commands::{classify::ClassifyCommand, import::ImportCommand};
use nasimport::config::DEFAULT_CONFIG_PATH;

/// nasimport - Import downloaded media into a NAS library
#[derive(Parser)]
#[command(
    name = "nasimport",
    about = "Import downloaded media into a NAS library",
    long_about = "Identifies video files as TV episodes, documentaries or movies and files them under canonical names in the library.",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand)]
enum Commands {
    /// Identify files and move or remux them into the library
    Import {
        /// Files to import
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Path to the JSON configuration file
        #[arg(long, short = 'c', env = "NASIMPORT_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,
        /// Take the best match without prompting
        #[arg(long, short = 'a')]
        auto: bool,
        /// Only match against the local library
        #[arg(long)]
        offline: bool,
        /// Continue with the next file when an import fails
        #[arg(long, short = 'k')]
        keep_going: bool,
    },
    /// Print how file names are classified
    Classify {
        /// Files to classify
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nasimport=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Import {
            files,
            config,
            auto,
            offline,
            keep_going,
        } => {
            info!(
                "Starting import of {} file(s), config: {:?}, auto: {}, offline: {}",
                files.len(),
                config,
                auto,
                offline
            );
            ImportCommand::new(config, files, auto, offline, keep_going)
                .execute()
                .await
        }
        Commands::Classify { files } => {
            let classify_cmd = ClassifyCommand::new(files);
            match classify_cmd.execute().await {
                Ok(reports) => classify_cmd.print_report(&reports),
                Err(e) => Err(e),
            }
        }
    };

    if let Err(e) = result {
        error!("Command failed: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}
