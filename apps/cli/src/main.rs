//! compenrich CLI: enrich a list of companies with verified metadata.
//!
//! Reads a delimited company table, asks a chat completion API about each
//! company, and appends the results to a JSON array file.

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
