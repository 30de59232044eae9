//! statgrab CLI: scrape a rendered statistics table into a CSV file.
//!
//! Drives a browser to the statistics page, waits for the summary table to
//! render, extracts it, and writes it as delimited text.

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
