//! CLI entry point for chainsocket.
//!
//! This binary provides the `chainsocket` command: `run` (the default) holds
//! a conversation with the entry agent, `plugins` lists what the application
//! document loads.

mod cli;
mod helpers;
mod plugins;
mod repl;

use anyhow::Result;
use clap::Parser;

use crate::cli::{Cli, Commands};
use crate::helpers::init_tracing;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing("warn", &cli.options.log_file)?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => repl::cmd_run(cli.options).await,
        Commands::Plugins => plugins::cmd_plugins(cli.options),
    }
}
