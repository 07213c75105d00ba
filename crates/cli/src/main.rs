//! NIDS command-line client
//!
//! Sends flows to a running nids-server for classification and generates
//! the synthetic demo dataset locally.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{batch, dataset, health, predict};
use nids_lib::dataset::{DEFAULT_SAMPLES, DEFAULT_SEED};
use std::path::PathBuf;

/// Network Intrusion Detection CLI
#[derive(Parser)]
#[command(name = "nids")]
#[command(author, version, about = "CLI for the Network Intrusion Detection System demo", long_about = None)]
pub struct Cli {
    /// API endpoint URL (can also be set via NIDS_API_URL env var)
    #[arg(long, env = "NIDS_API_URL", global = true)]
    pub api_url: Option<String>,

    /// Output format
    #[arg(long, short, global = true)]
    pub format: Option<output::OutputFormat>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Classify a single flow
    Predict(predict::FlowArgs),

    /// Classify every row of a CSV file
    Batch {
        /// CSV file with flow features
        input: PathBuf,

        /// Write the labelled CSV here instead of printing it
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Generate the synthetic demo dataset
    Generate {
        /// Number of flows
        #[arg(long, default_value_t = DEFAULT_SAMPLES)]
        samples: usize,

        /// Random seed
        #[arg(long, default_value_t = DEFAULT_SEED)]
        seed: u64,

        /// Output CSV path
        #[arg(long, short, default_value = "demo_cicids2017.csv")]
        output: PathBuf,
    },

    /// Show server and model status
    Health,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        output::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = config::Config::load()?;
    let format = config.resolve_format(cli.format);
    let api_url = config.resolve_api_url(cli.api_url);

    match cli.command {
        Commands::Predict(args) => {
            let client = client::ApiClient::new(&api_url)?;
            predict::predict_flow(&client, &args, format).await?;
        }
        Commands::Batch { input, output } => {
            let client = client::ApiClient::new(&api_url)?;
            batch::predict_file(&client, &input, output, format).await?;
        }
        Commands::Generate {
            samples,
            seed,
            output,
        } => {
            dataset::generate(samples, seed, &output, format)?;
        }
        Commands::Health => {
            let client = client::ApiClient::new(&api_url)?;
            health::show_health(&client, format).await?;
        }
    }

    Ok(())
}
