//! Locating chart references and loading chart directories.
//!
//! Loading happens in two steps so each can be replaced independently:
//!
//! 1. [`ChartLocator::locate`] turns a reference (local path, `file://` URL,
//!    `repo/chart` name) plus version constraint and credentials into a local path
//! 2. [`ChartLoader::load`] reads that path into a [`Chart`]
//!
//! The defaults, [`FilesystemLocator`] and [`DirectoryLoader`], work purely on the
//! local filesystem. Remote registries are not contacted: `oci://` and `http(s)://`
//! references fail to locate unless a registry-capable locator is plugged in.

use futures::future::{BoxFuture, FutureExt};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

use super::{Chart, ChartFile, ChartMetadata};
use crate::config::Settings;
use crate::core::{BoxError, RenderContext};
use crate::values::to_values;

/// Authentication for repositories and registries.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Credentials {
    /// Username for basic authentication
    pub username: String,
    /// Password for basic authentication
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Supplies credentials when a chart is first loaded.
///
/// Returning `Ok(None)` means anonymous access.
pub trait CredentialsProvider: Send + Sync {
    /// Produce credentials for one load attempt.
    fn credentials(&self, ctx: &RenderContext) -> Result<Option<Credentials>, BoxError>;
}

impl<F> CredentialsProvider for F
where
    F: Fn(&RenderContext) -> Result<Option<Credentials>, BoxError> + Send + Sync,
{
    fn credentials(&self, ctx: &RenderContext) -> Result<Option<Credentials>, BoxError> {
        self(ctx)
    }
}

struct StaticCredentials(Credentials);

impl CredentialsProvider for StaticCredentials {
    fn credentials(&self, _ctx: &RenderContext) -> Result<Option<Credentials>, BoxError> {
        Ok(Some(self.0.clone()))
    }
}

/// Provider that always returns the same username and password.
#[must_use]
pub fn static_credentials(
    username: impl Into<String>,
    password: impl Into<String>,
) -> Arc<dyn CredentialsProvider> {
    Arc::new(StaticCredentials(Credentials {
        username: username.into(),
        password: password.into(),
    }))
}

/// Provider backed by a closure.
pub fn credentials_fn<F>(f: F) -> Arc<dyn CredentialsProvider>
where
    F: Fn(&RenderContext) -> Result<Option<Credentials>, BoxError> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Everything a locator needs to resolve one chart reference.
#[derive(Debug, Clone, Copy)]
pub struct LocateRequest<'a> {
    /// Chart reference as configured
    pub reference: &'a str,
    /// Repository URL, possibly empty
    pub repo: &'a str,
    /// Version constraint, possibly empty
    pub version: &'a str,
    /// Resolved credentials, if any
    pub credentials: Option<&'a Credentials>,
    /// Renderer settings
    pub settings: &'a Settings,
}

/// Resolves chart references to local chart directories.
///
/// Must be safe to call concurrently for different references.
pub trait ChartLocator: Send + Sync {
    /// Resolve `request` to a local path.
    fn locate<'a>(&'a self, request: LocateRequest<'a>) -> BoxFuture<'a, Result<PathBuf, BoxError>>;
}

/// Reads a located chart into memory.
///
/// Must be safe to call concurrently for different paths.
pub trait ChartLoader: Send + Sync {
    /// Load the chart at `path`.
    fn load<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, Result<Chart, BoxError>>;
}

/// Locator for charts already present on the local filesystem.
///
/// Resolution order:
/// 1. `file://` URLs and plain paths (relative ones against [`Settings::base_dir`])
///    naming an existing directory
/// 2. `<repository_cache>/<reference>-<version>` when a version is given
/// 3. `<repository_cache>/<reference>` (covers `repo/chart` names)
///
/// A non-empty version constraint must match the located chart's version,
/// either exactly or as a SemVer requirement such as `^1.2`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FilesystemLocator;

impl ChartLocator for FilesystemLocator {
    fn locate<'a>(&'a self, request: LocateRequest<'a>) -> BoxFuture<'a, Result<PathBuf, BoxError>> {
        async move {
            let reference = request.reference.trim();
            if is_remote_reference(reference) {
                return Err(format!(
                    "remote chart reference {reference:?} requires a registry-capable locator"
                )
                .into());
            }

            let candidates = candidate_paths(reference, request.version, request.settings);
            for candidate in &candidates {
                if tokio::fs::metadata(candidate.join("Chart.yaml")).await.is_ok() {
                    tracing::debug!("Located chart {} at {}", reference, candidate.display());
                    check_version(candidate, request.version).await?;
                    return Ok(candidate.clone());
                }
            }

            let searched: Vec<String> = candidates.iter().map(|p| p.display().to_string()).collect();
            Err(format!("chart {reference:?} not found (searched: {})", searched.join(", ")).into())
        }
        .boxed()
    }
}

fn is_remote_reference(reference: &str) -> bool {
    ["oci://", "http://", "https://"].iter().any(|scheme| reference.starts_with(scheme))
}

fn candidate_paths(reference: &str, version: &str, settings: &Settings) -> Vec<PathBuf> {
    let local = PathBuf::from(reference.strip_prefix("file://").unwrap_or(reference));
    let local = if local.is_absolute() {
        local
    } else {
        settings.base_dir.join(local)
    };

    let mut candidates = vec![local];
    if !reference.starts_with("file://") && !reference.starts_with('/') {
        let version = version.trim();
        if !version.is_empty() {
            candidates.push(settings.repository_cache.join(format!("{reference}-{version}")));
        }
        candidates.push(settings.repository_cache.join(reference));
    }
    candidates
}

async fn check_version(chart_dir: &Path, constraint: &str) -> Result<(), BoxError> {
    let constraint = constraint.trim();
    if constraint.is_empty() {
        return Ok(());
    }

    let raw = tokio::fs::read_to_string(chart_dir.join("Chart.yaml")).await?;
    let metadata: ChartMetadata = serde_yaml::from_str(&raw)?;
    if version_matches(&metadata.version, constraint) {
        Ok(())
    } else {
        Err(format!(
            "chart {:?} has version {:?}, which does not satisfy {:?}",
            metadata.name, metadata.version, constraint
        )
        .into())
    }
}

fn version_matches(actual: &str, constraint: &str) -> bool {
    let actual = actual.trim().trim_start_matches('v');
    let constraint = constraint.trim();
    if actual == constraint.trim_start_matches('v') {
        return true;
    }
    let Ok(version) = semver::Version::parse(actual) else {
        return false;
    };

    // A bare version is an exact pin; only operators make a range.
    if let Ok(pinned) = semver::Version::parse(constraint.trim_start_matches('v')) {
        return version == pinned;
    }
    semver::VersionReq::parse(constraint).is_ok_and(|requirement| requirement.matches(&version))
}

/// Loader for unpacked chart directories.
///
/// Reads `Chart.yaml` (required), `values.yaml` (optional), every file under
/// `templates/` and `crds/`, and sub-chart directories under `charts/`.
/// Packaged sub-charts (`.tgz`) are skipped with a warning.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectoryLoader;

impl ChartLoader for DirectoryLoader {
    fn load<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, Result<Chart, BoxError>> {
        let path = path.to_path_buf();
        async move {
            let mut chart = tokio::task::spawn_blocking(move || load_dir(&path)).await??;
            chart.assign_full_paths(None);
            Ok(chart)
        }
        .boxed()
    }
}

/// Load a chart directory synchronously.
pub fn load_dir(dir: &Path) -> Result<Chart, BoxError> {
    let chart_yaml = dir.join("Chart.yaml");
    let raw = std::fs::read_to_string(&chart_yaml)
        .map_err(|e| format!("Chart.yaml file is missing or unreadable in {}: {e}", dir.display()))?;
    let metadata: ChartMetadata = serde_yaml::from_str(&raw)
        .map_err(|e| format!("invalid {}: {e}", chart_yaml.display()))?;
    if metadata.name.trim().is_empty() {
        return Err(format!("{}: chart name is required", chart_yaml.display()).into());
    }

    let values_path = dir.join("values.yaml");
    let values = if values_path.is_file() {
        let raw = std::fs::read_to_string(&values_path)?;
        if raw.trim().is_empty() {
            Default::default()
        } else {
            let value: serde_json::Value = serde_yaml::from_str(&raw)
                .map_err(|e| format!("invalid {}: {e}", values_path.display()))?;
            to_values(value)
        }
    } else {
        Default::default()
    };

    let templates = read_files(dir, "templates")?;
    let crds = read_files(dir, "crds")?;

    let mut dependencies = Vec::new();
    let charts_dir = dir.join("charts");
    if charts_dir.is_dir() {
        let mut entries: Vec<PathBuf> =
            std::fs::read_dir(&charts_dir)?.filter_map(|e| e.ok().map(|e| e.path())).collect();
        entries.sort();
        for entry in entries {
            if entry.is_dir() {
                dependencies.push(load_dir(&entry)?);
            } else if entry.extension().is_some_and(|ext| ext == "tgz") {
                tracing::warn!("Skipping packaged sub-chart {}", entry.display());
            }
        }
    }

    tracing::debug!(
        "Loaded chart {} {} ({} templates, {} crds, {} sub-charts)",
        metadata.name,
        metadata.version,
        templates.len(),
        crds.len(),
        dependencies.len()
    );

    Ok(Chart {
        metadata,
        values,
        templates,
        crds,
        dependencies,
        full_path: String::new(),
    })
}

fn read_files(chart_dir: &Path, subdir: &str) -> Result<Vec<ChartFile>, BoxError> {
    let root = chart_dir.join(subdir);
    if !root.is_dir() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(&root).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry.path().strip_prefix(chart_dir)?;
        let name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        let data = std::fs::read_to_string(entry.path())
            .map_err(|e| format!("failed to read {name}: {e}"))?;
        files.push(ChartFile {
            name,
            data,
        });
    }
    Ok(files)
}
