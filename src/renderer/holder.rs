//! Source descriptors and their lazily loaded charts.

use regex::Regex;
use std::fmt;
use std::sync::{Arc, LazyLock};
use tokio::sync::RwLock;

use crate::chart::{Chart, ChartLoader, ChartLocator, CredentialsProvider, LocateRequest};
use crate::config::Settings;
use crate::constants::{MAX_RELEASE_NAME_LENGTH, RELEASE_NAME_PATTERN};
use crate::core::{RenderContext, RenderError, Result};
use crate::values::ValuesProvider;

static RELEASE_NAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(RELEASE_NAME_PATTERN).expect("release name pattern is valid"));

/// One chart to render.
///
/// # Examples
///
/// ```rust
/// use chart_render::renderer::Source;
/// use chart_render::values::{to_values, values};
/// use serde_json::json;
///
/// let source = Source::new("./charts/app", "app")
///     .with_version("1.2.0")
///     .with_values(values(to_values(json!({ "replicaCount": 2 }))));
///
/// assert!(source.validate().is_ok());
/// assert!(Source::new("./charts/app", "App").validate().is_err());
/// ```
#[derive(Clone, Default)]
pub struct Source {
    /// Repository URL for chart lookup; empty for local or OCI charts
    pub repo: String,
    /// Chart reference: local path, `file://` URL, `repo/chart` or `oci://` reference
    pub chart: String,
    /// Release name exposed to templates as `Release.Name`
    pub release_name: String,
    /// Version constraint; empty accepts any version
    pub release_version: String,
    /// Per-render values, merged under call-time values
    pub values: Option<Arc<dyn ValuesProvider>>,
    /// Credentials resolved when the chart is first loaded
    pub credentials: Option<Arc<dyn CredentialsProvider>>,
    /// Prune sub-charts by condition/tags before rendering
    pub process_dependencies: bool,
}

impl fmt::Debug for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Source")
            .field("repo", &self.repo)
            .field("chart", &self.chart)
            .field("release_name", &self.release_name)
            .field("release_version", &self.release_version)
            .field("values", &self.values.is_some())
            .field("credentials", &self.credentials.is_some())
            .field("process_dependencies", &self.process_dependencies)
            .finish()
    }
}

impl Source {
    /// A source for `chart` rendered as release `release_name`.
    pub fn new(chart: impl Into<String>, release_name: impl Into<String>) -> Self {
        Self {
            chart: chart.into(),
            release_name: release_name.into(),
            ..Default::default()
        }
    }

    /// Set the repository URL.
    #[must_use]
    pub fn with_repo(mut self, repo: impl Into<String>) -> Self {
        self.repo = repo.into();
        self
    }

    /// Set the version constraint.
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.release_version = version.into();
        self
    }

    /// Set the values provider.
    #[must_use]
    pub fn with_values(mut self, values: Arc<dyn ValuesProvider>) -> Self {
        self.values = Some(values);
        self
    }

    /// Set the credentials provider.
    #[must_use]
    pub fn with_credentials(mut self, credentials: Arc<dyn CredentialsProvider>) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Enable or disable dependency processing.
    #[must_use]
    pub const fn with_process_dependencies(mut self, enabled: bool) -> Self {
        self.process_dependencies = enabled;
        self
    }

    /// Check the chart reference and release name.
    ///
    /// # Errors
    ///
    /// - [`RenderError::ChartEmpty`] for an empty or whitespace-only chart
    /// - [`RenderError::ReleaseNameEmpty`] for an empty or whitespace-only release name
    /// - [`RenderError::ReleaseNameTooLong`] above 53 characters
    /// - [`RenderError::ReleaseNameInvalidFormat`] unless the name matches
    ///   `^[a-z0-9]([-a-z0-9]*[a-z0-9])?$`
    pub fn validate(&self) -> Result<()> {
        if self.chart.trim().is_empty() {
            return Err(RenderError::ChartEmpty);
        }

        let release_name = self.release_name.trim();
        if release_name.is_empty() {
            return Err(RenderError::ReleaseNameEmpty);
        }
        if release_name.len() > MAX_RELEASE_NAME_LENGTH {
            return Err(RenderError::ReleaseNameTooLong {
                max: MAX_RELEASE_NAME_LENGTH,
                actual: release_name.len(),
            });
        }
        if !RELEASE_NAME_REGEX.is_match(release_name) {
            return Err(RenderError::ReleaseNameInvalidFormat {
                name: release_name.to_string(),
            });
        }

        Ok(())
    }
}

/// A [`Source`] plus its lazily loaded chart.
///
/// The chart is loaded at most once per holder even under concurrent first
/// access: readers share a read lock once it is present, and the first writer
/// re-checks presence before loading. Failed loads leave the holder empty so
/// the next [`ChartHolder::ensure`] retries from scratch.
#[derive(Debug)]
pub struct ChartHolder {
    source: Source,
    chart: RwLock<Option<Arc<Chart>>>,
}

impl ChartHolder {
    /// Wrap a validated source.
    ///
    /// # Errors
    ///
    /// Returns the validation error of [`Source::validate`].
    pub fn new(source: Source) -> Result<Self> {
        source.validate()?;
        Ok(Self {
            source,
            chart: RwLock::new(None),
        })
    }

    /// The wrapped source.
    #[must_use]
    pub const fn source(&self) -> &Source {
        &self.source
    }

    /// Whether the chart has been loaded.
    pub async fn is_loaded(&self) -> bool {
        self.chart.read().await.is_some()
    }

    /// Return the loaded chart, loading it first if needed.
    ///
    /// # Errors
    ///
    /// - [`RenderError::Cancelled`] if `ctx` is done when a load would start
    /// - [`RenderError::Credentials`] if the credentials provider fails
    /// - [`RenderError::Locate`] / [`RenderError::Load`] if the collaborators fail
    pub async fn ensure(
        &self,
        ctx: &RenderContext,
        settings: &Settings,
        locator: &dyn ChartLocator,
        loader: &dyn ChartLoader,
    ) -> Result<Arc<Chart>> {
        if let Some(chart) = self.chart.read().await.as_ref() {
            return Ok(Arc::clone(chart));
        }

        let mut slot = self.chart.write().await;
        if let Some(chart) = slot.as_ref() {
            tracing::debug!("Chart {} was loaded by a concurrent caller", self.source.chart);
            return Ok(Arc::clone(chart));
        }

        ctx.check("during chart load")?;

        let source = &self.source;
        let credentials = match &source.credentials {
            Some(provider) => {
                provider.credentials(ctx).map_err(|e| RenderError::Credentials {
                    chart: source.chart.clone(),
                    version: source.release_version.clone(),
                    source: e,
                })?
            }
            None => None,
        };

        tracing::debug!(
            "Loading chart {} (repo: {}, version: {})",
            source.chart,
            source.repo,
            source.release_version
        );

        let path = locator
            .locate(LocateRequest {
                reference: &source.chart,
                repo: &source.repo,
                version: &source.release_version,
                credentials: credentials.as_ref(),
                settings,
            })
            .await
            .map_err(|e| RenderError::Locate {
                repo: source.repo.clone(),
                chart: source.chart.clone(),
                version: source.release_version.clone(),
                source: e,
            })?;

        let chart = loader.load(&path).await.map_err(|e| RenderError::Load {
            repo: source.repo.clone(),
            chart: source.chart.clone(),
            version: source.release_version.clone(),
            source: e,
        })?;

        let chart = Arc::new(chart);
        *slot = Some(Arc::clone(&chart));
        Ok(chart)
    }
}
