//! Configuration for the chart renderer
//!
//! Two layers feed a [`crate::renderer::Renderer`]:
//!
//! - [`Settings`] - environment-derived values (namespace, base directory,
//!   repository cache) consulted while locating and rendering charts
//! - [`RenderConfig`] - the TOML file the CLI reads (`render.toml` by default),
//!   describing sources, cache and render options
//!
//! # Configuration File Format
//!
//! ```toml
//! [settings]
//! namespace = "apps"
//!
//! [cache]
//! ttl_secs = 300
//! key = "full"          # full | fast | identity
//!
//! [options]
//! source_annotations = true
//! strict = false
//! lint_mode = false
//!
//! [[sources]]
//! chart = "./charts/app"
//! release = "app"
//! version = "1.2.0"
//! process_dependencies = true
//! values_files = ["values-prod.yaml"]
//! username_env = "CHARTS_USER"
//! password_env = "CHARTS_PASSWORD"
//!
//! [sources.values]
//! replicaCount = 2
//! ```
//!
//! Relative paths (`base_dir`, `values_files`, local charts) are resolved against
//! the directory holding the configuration file. Inline `values` are deep-merged
//! over the `values_files`, which are merged in the order listed.
//!
//! # Loading
//!
//! ```rust,no_run
//! use chart_render::config::RenderConfig;
//! use std::path::Path;
//!
//! # async fn example() -> chart_render::core::Result<()> {
//! let config = RenderConfig::load(Path::new("render.toml")).await?;
//! let sources = config.sources().await?;
//! let options = config.options_builder().build();
//! # Ok(())
//! # }
//! ```

pub mod file;
pub mod settings;

pub use file::{
    CacheConfig, CacheKeyStrategy, OptionsConfig, RenderConfig, SettingsConfig, SourceConfig,
    read_values_file,
};
pub use settings::Settings;
