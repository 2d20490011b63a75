//! Telecom Service Assurance CLI
//!
//! Queries a running assurance agent for a fresh SLA compliance report or
//! its component health.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{health, status};

/// Agent URL used when neither the flag, the environment nor the config file sets one
const DEFAULT_API_URL: &str = "http://127.0.0.1:5000";

/// Telecom Service Assurance CLI
#[derive(Parser)]
#[command(name = "sactl")]
#[command(author, version, about = "CLI for the Telecom Service Assurance agent", long_about = None)]
pub struct Cli {
    /// Agent base URL (can also be set via SACTL_API_URL env var)
    #[arg(long, env = "SACTL_API_URL")]
    pub api_url: Option<String>,

    /// Output format
    #[arg(long, short)]
    pub format: Option<output::OutputFormat>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a compliance check and show the report
    Status,

    /// Show agent readiness and component health
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = config::Config::load()?;

    let api_url = cli
        .api_url
        .or(config.api_url)
        .unwrap_or_else(|| DEFAULT_API_URL.to_string());
    let format = cli
        .format
        .or_else(|| {
            config
                .default_format
                .as_deref()
                .and_then(output::OutputFormat::from_name)
        })
        .unwrap_or_default();

    let client = client::ApiClient::new(&api_url)?;

    match cli.command {
        Commands::Status => status::show_status(&client, format).await?,
        Commands::Health => health::show_health(&client, format).await?,
    }

    Ok(())
}
