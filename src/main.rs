mod cli;
mod clipboard;
mod config;
mod errors;
mod file_scanner;
mod logging;
mod prompt;
mod report;
mod tags;
mod tui;
mod utils;
mod watcher;
mod workflow;
mod workspace;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    // Handle daemon mode first. This should stay in main.rs as it's an early exit.
    if clipboard::check_and_run_daemon_if_requested()? {
        return Ok(());
    }

    let cli_args = cli::Cli::parse();

    // Delegate the main application logic to the workflow module
    workflow::run_lmreview(cli_args)
}
