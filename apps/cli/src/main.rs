//! Daybook CLI: enrich existing daily notes with the day's content.
//!
//! Appends news, weather, box office, charts and personal history exports to
//! the matching `YYYY-MM-DD.md` notes, without ever duplicating a block.

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
