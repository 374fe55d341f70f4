//! Chart resource model and the collaborators that produce it.
//!
//! A [`Chart`] is the in-memory form of one chart directory: metadata from
//! `Chart.yaml`, default values from `values.yaml`, template and CRD files,
//! and loaded sub-charts. Charts are produced by a [`ChartLocator`] (reference
//! to local path) followed by a [`ChartLoader`] (path to [`Chart`]), and may be
//! pruned per render by a [`DependencyProcessor`].
//!
//! # Components
//!
//! - [`loader`] - locator/loader traits, [`Credentials`] and the filesystem defaults
//! - [`dependencies`] - dependency processor trait and the condition/tags default

pub mod dependencies;
pub mod loader;

use serde::{Deserialize, Serialize};

use crate::values::Values;

pub use dependencies::{ConditionProcessor, DependencyProcessor};
pub use loader::{
    ChartLoader, ChartLocator, Credentials, CredentialsProvider, DirectoryLoader,
    FilesystemLocator, LocateRequest, credentials_fn, static_credentials,
};

/// Contents of `Chart.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartMetadata {
    /// Chart API version (`v1` or `v2`)
    #[serde(default)]
    pub api_version: String,
    /// Chart name
    pub name: String,
    /// Chart version (SemVer)
    #[serde(default)]
    pub version: String,
    /// Version of the packaged application
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_version: Option<String>,
    /// Human-readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Declared sub-chart dependencies
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<DependencySpec>,
}

/// One entry of the `dependencies` list in `Chart.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DependencySpec {
    /// Name of the sub-chart
    pub name: String,
    /// Version constraint, informational only for local sub-charts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Repository the sub-chart comes from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
    /// Comma-separated value paths that enable or disable the sub-chart
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    /// Tags under `tags.<name>` that enable or disable the sub-chart
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Name the sub-chart is rendered under
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

impl DependencySpec {
    /// The alias if set, otherwise the chart name.
    #[must_use]
    pub fn effective_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

/// A file inside a chart, named relative to the chart root with `/` separators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartFile {
    /// Path relative to the chart root, e.g. `templates/deployment.yaml`
    pub name: String,
    /// File contents
    pub data: String,
}

/// A CRD file together with its full in-chart path.
#[derive(Debug, Clone)]
pub struct CrdObject<'a> {
    /// Full path such as `app/charts/db/crds/backup.yaml`
    pub name: String,
    /// The CRD file
    pub file: &'a ChartFile,
}

/// A loaded chart.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Chart {
    /// Parsed `Chart.yaml`
    pub metadata: ChartMetadata,
    /// Default values from `values.yaml`
    pub values: Values,
    /// Files under `templates/`
    pub templates: Vec<ChartFile>,
    /// Files under `crds/`
    pub crds: Vec<ChartFile>,
    /// Loaded sub-charts from `charts/`
    pub dependencies: Vec<Chart>,
    /// Full path from the root chart, e.g. `app/charts/db`
    pub full_path: String,
}

impl Chart {
    /// Chart name from metadata.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    /// Chart version from metadata.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.metadata.version
    }

    /// CRD files of this chart and all of its sub-charts, parents first.
    #[must_use]
    pub fn crd_objects(&self) -> Vec<CrdObject<'_>> {
        let mut out = Vec::new();
        self.collect_crds(&mut out);
        out
    }

    fn collect_crds<'a>(&'a self, out: &mut Vec<CrdObject<'a>>) {
        out.extend(self.crds.iter().map(|file| CrdObject {
            name: format!("{}/{}", self.full_path, file.name),
            file,
        }));
        for dependency in &self.dependencies {
            dependency.collect_crds(out);
        }
    }

    /// Recompute `full_path` for this chart and every sub-chart under `parent`.
    pub(crate) fn assign_full_paths(&mut self, parent: Option<&str>) {
        self.full_path = match parent {
            Some(parent) => format!("{parent}/charts/{}", self.metadata.name),
            None => self.metadata.name.clone(),
        };
        let path = self.full_path.clone();
        for dependency in &mut self.dependencies {
            dependency.assign_full_paths(Some(&path));
        }
    }
}
