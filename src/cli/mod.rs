//! Command-line interface for the chart renderer.
//!
//! # Available Commands
//!
//! - `render` - render every configured chart and print the objects
//! - `validate` - check source descriptors without loading any chart
//!
//! # Configuration
//!
//! Sources come from a TOML file (`render.toml` in the current directory, or the
//! file given with `--config`) and/or from `--chart`/`--release` on the command
//! line. See [`crate::config`] for the file format.
//!
//! # Examples
//!
//! ```bash
//! # Render a local chart
//! chart-render render --chart ./charts/app --release app
//!
//! # Render everything in render.toml with overrides, as JSON
//! chart-render render --values prod.yaml --set image.tag=1.2.0 --output json
//!
//! # Check release names in a custom config
//! chart-render --config ci/render.toml validate
//! ```
//!
//! # Global Options
//!
//! - `--verbose` - debug logging on stderr
//! - `--quiet` - errors only
//! - `--config` - path to the render configuration file

pub mod render;
pub mod validate;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::config::RenderConfig;
use crate::constants::DEFAULT_CONFIG_FILE;
use crate::renderer::Source;

/// Render Helm-style charts into Kubernetes objects.
#[derive(Parser, Debug)]
#[command(
    name = "chart-render",
    about = "Render Helm-style charts into Kubernetes objects",
    version
)]
pub struct Cli {
    /// The subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging on stderr
    ///
    /// Equivalent to `RUST_LOG=debug`. Mutually exclusive with `--quiet`.
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to the render configuration file
    ///
    /// Defaults to `render.toml` in the current directory when present.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render charts and write the objects to stdout
    Render(render::RenderCommand),

    /// Validate source descriptors without loading charts
    Validate(validate::ValidateCommand),
}

impl Cli {
    /// Initialise logging and run the selected command.
    ///
    /// # Errors
    ///
    /// Returns the command's failure; the caller decides how to present it.
    pub async fn execute(self) -> Result<()> {
        init_logging(self.verbose, self.quiet);

        let config = load_config(self.config.as_deref()).await?;
        match self.command {
            Commands::Render(cmd) => cmd.execute(&config).await,
            Commands::Validate(cmd) => cmd.execute(&config),
        }
    }
}

/// Install the global tracing subscriber, writing to stderr.
///
/// `RUST_LOG` is honoured unless `--verbose` or `--quiet` is given. Calling this
/// more than once is harmless.
pub fn init_logging(verbose: bool, quiet: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else if quiet {
        EnvFilter::new("error")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .try_init();
}

/// Load the render configuration.
///
/// An explicit path must exist. Without one, `render.toml` in the current
/// directory is used when present, otherwise an empty configuration.
async fn load_config(path: Option<&Path>) -> Result<RenderConfig> {
    if let Some(path) = path {
        return RenderConfig::load(path)
            .await
            .with_context(|| format!("Failed to load render config from {}", path.display()));
    }

    let default_path = Path::new(DEFAULT_CONFIG_FILE);
    if tokio::fs::try_exists(default_path).await.unwrap_or(false) {
        return RenderConfig::load(default_path)
            .await
            .with_context(|| format!("Failed to load render config from {DEFAULT_CONFIG_FILE}"));
    }

    tracing::debug!("No {} found, using command-line sources only", DEFAULT_CONFIG_FILE);
    Ok(RenderConfig::default())
}

/// Source selection flags shared by `render` and `validate`.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct SourceArgs {
    /// Chart reference: local path, file:// URL or repo/chart name
    #[arg(long, requires = "release")]
    pub chart: Option<String>,

    /// Release name for --chart
    #[arg(long, requires = "chart")]
    pub release: Option<String>,

    /// Version constraint for --chart
    #[arg(long = "chart-version", requires = "chart")]
    pub version: Option<String>,

    /// Repository URL for --chart
    #[arg(long, requires = "chart")]
    pub repo: Option<String>,

    /// Prune sub-charts of --chart by condition and tags
    #[arg(long, requires = "chart")]
    pub process_dependencies: bool,
}

impl SourceArgs {
    /// The command-line source, if `--chart` was given.
    #[must_use]
    pub fn source(&self) -> Option<Source> {
        let chart = self.chart.as_ref()?;
        let release = self.release.clone().unwrap_or_default();

        Some(
            Source::new(chart.clone(), release)
                .with_version(self.version.clone().unwrap_or_default())
                .with_repo(self.repo.clone().unwrap_or_default())
                .with_process_dependencies(self.process_dependencies),
        )
    }
}
