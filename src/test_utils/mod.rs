//! Test utilities for chart-render.
//!
//! Available to the crate's own tests and, through the `test-utils` feature, to
//! integration tests:
//!
//! - [`init_test_logging`] - one-time tracing setup honouring `RUST_LOG`
//! - [`ChartFixture`] - writes a chart directory to disk
//! - [`CountingLoader`] / [`FlakyLocator`] - collaborator doubles that count calls

use futures::future::{BoxFuture, FutureExt};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Once;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use crate::chart::{
    Chart, ChartLoader, ChartLocator, DirectoryLoader, FilesystemLocator, LocateRequest,
};
use crate::core::BoxError;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Uses `level` when given, otherwise `RUST_LOG`; with neither, logging stays off.
///
/// ```bash
/// RUST_LOG=chart_render=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .try_init();
    });
}

/// A chart directory to be written to disk.
///
/// # Example
///
/// ```rust,no_run
/// use chart_render::test_utils::ChartFixture;
///
/// let dir = tempfile::TempDir::new().unwrap();
/// let path = ChartFixture::new("app", "0.1.0")
///     .values("replicaCount: 1\n")
///     .template("deployment.yaml", "kind: Deployment\nmetadata:\n  name: {{ Release.Name }}\n")
///     .write(dir.path())
///     .unwrap();
/// assert!(path.join("Chart.yaml").exists());
/// ```
#[derive(Debug, Clone, Default)]
pub struct ChartFixture {
    name: String,
    version: String,
    chart_extra: String,
    values: String,
    files: BTreeMap<String, String>,
    subcharts: Vec<ChartFixture>,
}

impl ChartFixture {
    /// A chart with the given name and version and no files.
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            ..Default::default()
        }
    }

    /// Extra YAML appended to `Chart.yaml`, e.g. a `dependencies:` block.
    #[must_use]
    pub fn chart_yaml(mut self, extra: impl Into<String>) -> Self {
        self.chart_extra = extra.into();
        self
    }

    /// Contents of `values.yaml`.
    #[must_use]
    pub fn values(mut self, values: impl Into<String>) -> Self {
        self.values = values.into();
        self
    }

    /// Add `templates/<name>`.
    #[must_use]
    pub fn template(mut self, name: &str, content: impl Into<String>) -> Self {
        self.files.insert(format!("templates/{name}"), content.into());
        self
    }

    /// Add `crds/<name>`.
    #[must_use]
    pub fn crd(mut self, name: &str, content: impl Into<String>) -> Self {
        self.files.insert(format!("crds/{name}"), content.into());
        self
    }

    /// Add a sub-chart under `charts/`.
    #[must_use]
    pub fn subchart(mut self, chart: ChartFixture) -> Self {
        self.subcharts.push(chart);
        self
    }

    /// Write the chart to `<parent>/<name>` and return that path.
    ///
    /// # Errors
    ///
    /// Returns any filesystem error.
    pub fn write(&self, parent: &Path) -> std::io::Result<PathBuf> {
        let root = parent.join(&self.name);
        std::fs::create_dir_all(&root)?;

        let chart_yaml = format!(
            "apiVersion: v2\nname: {}\nversion: {}\n{}",
            self.name, self.version, self.chart_extra
        );
        std::fs::write(root.join("Chart.yaml"), chart_yaml)?;
        if !self.values.is_empty() {
            std::fs::write(root.join("values.yaml"), &self.values)?;
        }

        for (name, content) in &self.files {
            let path = root.join(name);
            if let Some(dir) = path.parent() {
                std::fs::create_dir_all(dir)?;
            }
            std::fs::write(path, content)?;
        }

        if !self.subcharts.is_empty() {
            let charts_dir = root.join("charts");
            for sub in &self.subcharts {
                sub.write(&charts_dir)?;
            }
        }

        Ok(root)
    }
}

/// [`DirectoryLoader`] that counts calls and can stall each load.
#[derive(Debug, Default)]
pub struct CountingLoader {
    loads: AtomicUsize,
    delay: Option<Duration>,
}

impl CountingLoader {
    /// A loader without delay.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A loader that sleeps `delay` before every load, widening race windows.
    #[must_use]
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            loads: AtomicUsize::new(0),
            delay: Some(delay),
        }
    }

    /// Number of loads started so far.
    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

impl ChartLoader for CountingLoader {
    fn load<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, Result<Chart, BoxError>> {
        async move {
            self.loads.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            DirectoryLoader.load(path).await
        }
        .boxed()
    }
}

/// [`FilesystemLocator`] that fails its first `failures` calls.
#[derive(Debug, Default)]
pub struct FlakyLocator {
    inner: FilesystemLocator,
    failures: usize,
    calls: AtomicUsize,
}

impl FlakyLocator {
    /// Fail the first `failures` calls, then delegate.
    #[must_use]
    pub fn new(failures: usize) -> Self {
        Self {
            inner: FilesystemLocator,
            failures,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of locate calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ChartLocator for FlakyLocator {
    fn locate<'a>(&'a self, request: LocateRequest<'a>) -> BoxFuture<'a, Result<PathBuf, BoxError>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            let reference = request.reference.to_string();
            return async move { Err(format!("transient failure locating {reference}").into()) }
                .boxed();
        }
        self.inner.locate(request)
    }
}
