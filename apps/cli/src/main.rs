//! ownertrace CLI: batch people-search enrichment for owner records.
//!
//! Reads owner records, resolves each owner through a people-search site,
//! and writes one CSV row per owner.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
