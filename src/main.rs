mod aggregator;
mod cli;
mod decoder;
mod loader;
mod overrides;
mod pipeline;
mod report;
mod structures;
mod writer;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Import(args) => {
            pipeline::run_import(args)?;
        }
        Commands::Validate(args) => {
            pipeline::run_validate(args)?;
        }
    }

    Ok(())
}
