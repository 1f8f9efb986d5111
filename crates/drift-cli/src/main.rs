//! DRIFT recommender CLI
//!
//! Replays recorded utilization and throttle traces through the
//! recommendation engine and prints the emitted recommendations.

mod commands;
mod config;
mod input;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use output::{print_error, LogFormat, OutputFormat};

/// DRIFT resource recommender
#[derive(Parser)]
#[command(name = "drift")]
#[command(author, version, about = "Replay tool for the DRIFT resource recommender", long_about = None)]
pub struct Cli {
    /// Recommender config file (TOML); defaults to ~/.config/drift/config.toml
    #[arg(long, env = "DRIFT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: OutputFormat,

    /// Log format on stderr
    #[arg(long, default_value = "pretty")]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Replay traces and print emitted recommendations
    Recommend {
        /// Replay input file (JSON)
        #[arg(long, short)]
        input: PathBuf,

        /// Minutes of data added per replay step (defaults to the optimization interval)
        #[arg(long)]
        step_minutes: Option<usize>,

        /// Print Prometheus metrics after the replay
        #[arg(long)]
        metrics: bool,
    },

    /// Print the characterization of each workload
    Characterize {
        /// Replay input file (JSON)
        #[arg(long, short)]
        input: PathBuf,
    },
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Pretty => registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = config::load(cli.config.as_deref())?;
    debug!(?config, "Configuration loaded");

    match cli.command {
        Commands::Recommend {
            input,
            step_minutes,
            metrics,
        } => {
            let replay = input::load(&input)?;
            commands::recommend::run(&config, replay, step_minutes, metrics, cli.format).await?;
        }
        Commands::Characterize { input } => {
            let replay = input::load(&input)?;
            commands::characterize::run(&config, replay, cli.format)?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    if let Err(e) = run(cli).await {
        print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}
