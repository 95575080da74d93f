mod analysis;
mod auth;
mod backend;
mod cli;
mod error;
mod insights;
mod pipeline;
mod scheduler;
mod server;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use log::info;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    info!("Starting defect-insights");
    cli.execute().await?;

    Ok(())
}
