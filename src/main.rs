//! chart-render CLI entry point
//!
//! Parses arguments, runs the selected command and prints failures through
//! [`user_friendly_error`] before exiting with status 1.

use anyhow::Result;
use chart_render::cli;
use chart_render::core::user_friendly_error;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    match cli.execute().await {
        Ok(()) => Ok(()),
        Err(e) => {
            user_friendly_error(e).display();
            std::process::exit(1);
        }
    }
}
