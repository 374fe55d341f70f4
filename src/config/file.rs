//! The TOML render configuration read by the CLI.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

use super::Settings;
use crate::cache::CacheOptions;
use crate::chart::{Credentials, credentials_fn};
use crate::constants::DEFAULT_CACHE_TTL;
use crate::core::{RenderError, Result};
use crate::renderer::{RendererOptions, RendererOptionsBuilder, Source};
use crate::values::{Values, deep_merge, values};

/// Root of a render configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RenderConfig {
    /// Overrides applied on top of [`Settings::from_env`]
    #[serde(default)]
    pub settings: SettingsConfig,

    /// Cache configuration; caching stays off when the table is absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache: Option<CacheConfig>,

    /// Render toggles
    #[serde(default)]
    pub options: OptionsConfig,

    /// Charts to render, in output order
    #[serde(default)]
    pub sources: Vec<SourceConfig>,

    /// Directory relative paths are resolved against; set by [`RenderConfig::load`]
    #[serde(skip)]
    pub root: PathBuf,
}

/// `[settings]` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SettingsConfig {
    /// Namespace reported to templates
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// Base directory for relative chart paths
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_dir: Option<PathBuf>,
    /// Repository cache directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository_cache: Option<PathBuf>,
}

/// Cache key derivation strategy selectable from configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheKeyStrategy {
    /// Hash of chart, release, version and values
    #[default]
    Full,
    /// Chart, release and version; values ignored
    Fast,
    /// Chart and version only
    Identity,
}

/// `[cache]` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    /// Entry lifetime in seconds; `0` never expires
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
    /// Key strategy
    #[serde(default)]
    pub key: CacheKeyStrategy,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
            key: CacheKeyStrategy::default(),
        }
    }
}

impl CacheConfig {
    /// The equivalent [`CacheOptions`].
    #[must_use]
    pub fn to_options(self) -> CacheOptions {
        let options = CacheOptions::new().with_ttl(Duration::from_secs(self.ttl_secs));
        match self.key {
            CacheKeyStrategy::Full => options,
            CacheKeyStrategy::Fast => options.fast(),
            CacheKeyStrategy::Identity => options.identity(),
        }
    }
}

const fn default_ttl_secs() -> u64 {
    DEFAULT_CACHE_TTL.as_secs()
}

/// `[options]` table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OptionsConfig {
    /// Annotate objects with their chart and file of origin
    #[serde(default)]
    pub source_annotations: bool,
    /// Fail on undefined template variables
    #[serde(default)]
    pub strict: bool,
    /// Tolerate `required` failures
    #[serde(default)]
    pub lint_mode: bool,
}

/// One `[[sources]]` entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    /// Chart reference
    pub chart: String,
    /// Release name
    pub release: String,
    /// Version constraint
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,
    /// Repository URL
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub repo: String,
    /// Prune sub-charts by condition and tags
    #[serde(default)]
    pub process_dependencies: bool,
    /// YAML values files merged in order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values_files: Vec<PathBuf>,
    /// Inline values merged over the files
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub values: Values,
    /// Environment variable holding the repository username
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username_env: Option<String>,
    /// Environment variable holding the repository password
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_env: Option<String>,
}

impl RenderConfig {
    /// Read and parse the configuration file at `path`.
    ///
    /// # Errors
    ///
    /// - [`RenderError::Io`] if the file cannot be read
    /// - [`RenderError::Config`] if it is not valid TOML or does not match the schema
    pub async fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).await.map_err(|source| RenderError::Io {
            path: path.display().to_string(),
            source,
        })?;

        let mut config = Self::parse(&content).map_err(|e| RenderError::Config {
            message: format!("failed to parse {}: {e}", path.display()),
        })?;
        config.root = path.parent().map(Path::to_path_buf).unwrap_or_default();

        tracing::debug!(
            "Loaded render config from {} with {} sources",
            path.display(),
            config.sources.len()
        );
        Ok(config)
    }

    /// Parse configuration text; relative paths resolve against the current directory.
    ///
    /// # Errors
    ///
    /// Returns the TOML deserialization error.
    pub fn parse(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Environment settings with the `[settings]` overrides applied.
    #[must_use]
    pub fn settings(&self) -> Settings {
        let mut settings = Settings::from_env().with_base_dir(self.resolve(Path::new(".")));

        if let Some(namespace) = &self.settings.namespace {
            settings = settings.with_namespace(namespace.clone());
        }
        if let Some(base_dir) = &self.settings.base_dir {
            settings = settings.with_base_dir(self.resolve(base_dir));
        }
        if let Some(cache) = &self.settings.repository_cache {
            settings = settings.with_repository_cache(self.resolve(cache));
        }

        settings
    }

    /// A builder preloaded with this configuration's settings, cache and toggles.
    #[must_use]
    pub fn options_builder(&self) -> RendererOptionsBuilder {
        let mut builder = RendererOptions::builder()
            .settings(self.settings())
            .source_annotations(self.options.source_annotations)
            .strict(self.options.strict)
            .lint_mode(self.options.lint_mode);

        if let Some(cache) = self.cache {
            builder = builder.cache(cache.to_options());
        }

        builder
    }

    /// Turn every `[[sources]]` entry into a [`Source`].
    ///
    /// Values files are read now; credentials are read from the environment
    /// each time a chart is loaded.
    ///
    /// # Errors
    ///
    /// Fails on the first unreadable or malformed values file. Sources are not
    /// validated here; [`crate::renderer::Renderer::new`] does that.
    pub async fn sources(&self) -> Result<Vec<Source>> {
        let mut sources = Vec::with_capacity(self.sources.len());
        for entry in &self.sources {
            sources.push(self.build_source(entry).await?);
        }
        Ok(sources)
    }

    async fn build_source(&self, entry: &SourceConfig) -> Result<Source> {
        let mut merged = Values::new();
        for file in &entry.values_files {
            let file_values = read_values_file(&self.resolve(file)).await?;
            merged = deep_merge(merged, Some(&file_values));
        }
        merged = deep_merge(merged, Some(&entry.values));

        let mut source = Source::new(entry.chart.clone(), entry.release.clone())
            .with_repo(entry.repo.clone())
            .with_version(entry.version.clone())
            .with_process_dependencies(entry.process_dependencies);

        if !merged.is_empty() {
            source = source.with_values(values(merged));
        }

        if entry.username_env.is_some() || entry.password_env.is_some() {
            let username_env = entry.username_env.clone();
            let password_env = entry.password_env.clone();
            source = source.with_credentials(credentials_fn(move |_ctx| {
                let username = read_env(username_env.as_deref())?;
                let password = read_env(password_env.as_deref())?;
                Ok(Some(Credentials {
                    username,
                    password,
                }))
            }));
        }

        Ok(source)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

fn read_env(name: Option<&str>) -> std::result::Result<String, crate::core::BoxError> {
    let Some(name) = name else {
        return Ok(String::new());
    };
    std::env::var(name).map_err(|e| format!("environment variable {name}: {e}").into())
}

/// Read a YAML values file into a value tree.
///
/// An empty file yields an empty tree.
///
/// # Errors
///
/// - [`RenderError::Io`] if the file cannot be read
/// - [`RenderError::Config`] if the content is not a YAML mapping
pub async fn read_values_file(path: &Path) -> Result<Values> {
    let content = fs::read_to_string(path).await.map_err(|source| RenderError::Io {
        path: path.display().to_string(),
        source,
    })?;

    let value: Value = serde_yaml::from_str(&content).map_err(|e| RenderError::Config {
        message: format!("invalid values file {}: {e}", path.display()),
    })?;

    match value {
        Value::Null => Ok(Values::new()),
        Value::Object(map) => Ok(map),
        _ => Err(RenderError::Config {
            message: format!("values file {} must contain a mapping", path.display()),
        }),
    }
}
