//! Environment settings consulted while locating and rendering charts.

use std::path::PathBuf;

use crate::constants::DEFAULT_NAMESPACE;

/// Environment-derived settings for a renderer.
///
/// # Environment Variables
///
/// - `HELM_NAMESPACE` - namespace reported to templates as `Release.Namespace`
/// - `HELM_REPOSITORY_CACHE` - directory holding pulled charts, searched for
///   `repo/chart` references
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Namespace releases are rendered into
    pub namespace: String,
    /// Directory relative chart paths are resolved against
    pub base_dir: PathBuf,
    /// Directory of pulled charts laid out as `<repo>/<chart>` or `<chart>-<version>`
    pub repository_cache: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            base_dir: PathBuf::from("."),
            repository_cache: default_repository_cache(),
        }
    }
}

impl Settings {
    /// Build settings from the process environment, falling back to defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let mut settings = Self::default();

        if let Some(namespace) = non_empty_env("HELM_NAMESPACE") {
            settings.namespace = namespace;
        }

        if let Some(cache) = non_empty_env("HELM_REPOSITORY_CACHE") {
            settings.repository_cache = PathBuf::from(cache);
        }

        if let Ok(cwd) = std::env::current_dir() {
            settings.base_dir = cwd;
        }

        settings
    }

    /// Override the namespace.
    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Override the base directory for relative chart paths.
    #[must_use]
    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = base_dir.into();
        self
    }

    /// Override the repository cache directory.
    #[must_use]
    pub fn with_repository_cache(mut self, dir: impl Into<PathBuf>) -> Self {
        self.repository_cache = dir.into();
        self
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn default_repository_cache() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("helm")
        .join("repository")
}
