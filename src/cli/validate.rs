//! The `validate` command.
//!
//! Checks every configured source descriptor (chart reference and release
//! name) the same way renderer construction does, without locating or
//! loading any chart. Useful as a fast CI gate.

use anyhow::{Result, bail};
use clap::Args;
use colored::Colorize;

use super::SourceArgs;
use crate::config::RenderConfig;
use crate::renderer::Source;

/// Validate source descriptors.
#[derive(Args, Debug)]
pub struct ValidateCommand {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Only print failures
    #[arg(long)]
    pub errors_only: bool,
}

impl ValidateCommand {
    /// Run the command against `config`.
    ///
    /// Every source is checked and reported; the command fails if any is invalid.
    ///
    /// # Errors
    ///
    /// Fails when no source is configured or when at least one is invalid.
    pub fn execute(self, config: &RenderConfig) -> Result<()> {
        let mut sources: Vec<Source> = config
            .sources
            .iter()
            .map(|entry| Source::new(entry.chart.clone(), entry.release.clone()))
            .collect();
        sources.extend(self.source.source());

        if sources.is_empty() {
            bail!("No sources to validate");
        }

        let failures = report(&sources, self.errors_only);
        if failures > 0 {
            bail!("{failures} of {} sources are invalid", sources.len());
        }

        if !self.errors_only {
            println!("{} {} sources valid", "✓".green(), sources.len());
        }
        Ok(())
    }
}

/// Print one line per source and return the number of invalid ones.
fn report(sources: &[Source], errors_only: bool) -> usize {
    let mut failures = 0;
    for source in sources {
        match source.validate() {
            Ok(()) => {
                if !errors_only {
                    println!("{} {} (release: {})", "✓".green(), source.chart, source.release_name);
                }
            }
            Err(e) => {
                failures += 1;
                println!(
                    "{} {} (release: {}): {}",
                    "✗".red(),
                    source.chart,
                    source.release_name,
                    e
                );
            }
        }
    }
    failures
}
