//! owkit - Overlay toolkit
//!
//! This is the binary entry point. All logic lives in the library.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use owkit::app::config::{init_config_dir, load_settings, load_settings_from};
use owkit::core::prelude::*;

/// owkit - Event, status and shared-state utilities for game overlay apps
#[derive(Parser, Debug)]
#[command(name = "owkit")]
#[command(about = "Replay recorded overlay host sessions", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replay an NDJSON recording of host pushes and print every change
    Replay {
        /// Recording to replay
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Project directory holding .owkit/config.toml
        #[arg(long, value_name = "PATH")]
        project: Option<PathBuf>,

        /// Explicit settings file (overrides --project)
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Features to negotiate (default: every category in the recording)
        #[arg(long, value_delimiter = ',')]
        features: Vec<String>,

        /// Log every raw host push
        #[arg(long)]
        verbose: bool,
    },

    /// Write a default .owkit/config.toml
    Init {
        /// Project directory
        #[arg(value_name = "PATH")]
        path: Option<PathBuf>,
    },
}

fn current_dir() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    owkit::core::logging::init()?;

    let args = Args::parse();

    match args.command {
        Command::Replay {
            file,
            project,
            config,
            features,
            verbose,
        } => {
            let mut settings = match config {
                Some(path) => load_settings_from(&path)?,
                None => load_settings(&project.unwrap_or_else(current_dir)),
            };
            settings.telemetry.verbose |= verbose;

            let summary = owkit::run_replay(&file, &settings, features).await?;
            if !summary.granted && summary.pushes > 0 {
                warn!("No telemetry features were granted during replay");
            }
        }
        Command::Init { path } => {
            let path = path.unwrap_or_else(current_dir);
            init_config_dir(&path)?;
            eprintln!(
                "Wrote {}",
                path.join(".owkit").join("config.toml").display()
            );
        }
    }

    Ok(())
}
