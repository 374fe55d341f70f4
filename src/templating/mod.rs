//! Template expansion for charts.
//!
//! The renderer treats template expansion as a collaborator behind the
//! [`TemplateEngine`] trait: it hands over a [`Chart`] and [`RenderValues`] and
//! gets back named text outputs. The default implementation is [`TeraEngine`].
//!
//! # Template Context
//!
//! Every template sees:
//!
//! - `Values` - chart defaults with the supplied values merged on top
//! - `Release` - `Name`, `Namespace`, `Revision`, `IsInstall`, `IsUpgrade`, `Service`
//! - `Chart` - `Name`, `Version`, `AppVersion`, `Description`
//! - `Template` - `Name` (full output name) and `BasePath`
//!
//! Sub-charts see `Values.<name>` of their parent merged over their own
//! defaults, plus the parent's `Values.global`.
//!
//! # Output Names
//!
//! Outputs are keyed `<chart>/templates/<path>`, with sub-charts nested as
//! `<chart>/charts/<sub>/templates/<path>`. Files whose name starts with `_`
//! are partials: available to `include`/`import` but never emitted.

mod tera_engine;

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use strsim::levenshtein;
use thiserror::Error;

use crate::chart::Chart;
use crate::constants::RELEASE_SERVICE;
use crate::core::BoxError;
use crate::values::{Values, deep_merge};

pub use tera_engine::TeraEngine;

/// Maximum allowed Levenshtein distance as a percentage of target length for suggestions.
const SIMILARITY_THRESHOLD_PERCENT: usize = 50;

/// Named text outputs in stable order.
pub type RenderedOutputs = BTreeMap<String, String>;

/// Flags forwarded to the engine for one render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EngineOptions {
    /// Fail on undefined variables instead of rendering them empty
    pub strict: bool,
    /// Tolerate `required` failures, as when linting a chart
    pub lint_mode: bool,
}

/// Release information exposed to templates as `Release`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ReleaseInfo {
    /// Release name
    pub name: String,
    /// Target namespace
    pub namespace: String,
    /// Release revision, always 1 for a fresh render
    pub revision: u32,
    /// Whether this is an install
    pub is_install: bool,
    /// Whether this is an upgrade
    pub is_upgrade: bool,
    /// Service performing the release
    pub service: String,
}

impl ReleaseInfo {
    /// A first-install release named `name` in `namespace`.
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            revision: 1,
            is_install: true,
            is_upgrade: false,
            service: RELEASE_SERVICE.to_string(),
        }
    }
}

/// Everything a template engine needs besides the chart itself.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderValues {
    /// Chart defaults coalesced with the supplied values
    pub values: Values,
    /// Release information
    pub release: ReleaseInfo,
}

impl RenderValues {
    /// Coalesce `values` over the chart's own defaults.
    ///
    /// Precedence, lowest first: chart `values.yaml`, then `values`.
    #[must_use]
    pub fn new(chart: &Chart, values: &Values, release: ReleaseInfo) -> Self {
        Self {
            values: deep_merge(chart.values.clone(), Some(values)),
            release,
        }
    }
}

/// Expands chart templates into named text outputs.
///
/// Implementations must be deterministic: the same chart and values yield the
/// same output names and contents. They must be safe to call concurrently.
pub trait TemplateEngine: Send + Sync {
    /// Render every non-partial template of `chart` and its sub-charts.
    fn render(
        &self,
        chart: &Chart,
        values: &RenderValues,
        options: EngineOptions,
    ) -> Result<RenderedOutputs, BoxError>;
}

/// Template failures reported by [`TeraEngine`].
#[derive(Debug, Error)]
pub enum TemplateError {
    /// A template could not be parsed.
    #[error("template syntax error in {chart}: {message}")]
    Syntax {
        /// Full path of the chart owning the template
        chart: String,
        /// Cleaned-up parser message
        message: String,
    },

    /// A template referenced a variable that does not exist.
    #[error("{}", format_variable_not_found(.template, .variable, .suggestions))]
    VariableNotFound {
        /// Output name of the failing template
        template: String,
        /// Dotted variable path
        variable: String,
        /// Similar variable paths from the context
        suggestions: Vec<String>,
    },

    /// Rendering failed for any other reason.
    #[error("error rendering {template}: {message}")]
    Render {
        /// Output name of the failing template
        template: String,
        /// Cleaned-up render message
        message: String,
    },
}

fn format_variable_not_found(template: &str, variable: &str, suggestions: &[String]) -> String {
    let mut message = format!("variable `{variable}` not found in {template}");
    if !suggestions.is_empty() {
        message.push_str(&format!(" (did you mean: {}?)", suggestions.join(", ")));
    }
    message
}

/// Collect dotted paths of every leaf and map under `value`, up to `max_depth` levels.
fn available_paths(value: &Map<String, Value>, prefix: &str, max_depth: usize, out: &mut Vec<String>) {
    for (key, child) in value {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        if let (Some(map), true) = (child.as_object(), max_depth > 1) {
            available_paths(map, &path, max_depth - 1, out);
        }
        out.push(path);
    }
}

/// Find similar variable names using Levenshtein distance.
fn find_similar_variables(target: &str, available: &[String]) -> Vec<String> {
    let mut scored: Vec<_> =
        available.iter().map(|var| (var.clone(), levenshtein(target, var))).collect();
    scored.sort_by(|(a, da), (b, db)| da.cmp(db).then_with(|| a.cmp(b)));

    scored
        .into_iter()
        .filter(|(_, dist)| *dist <= target.len() * SIMILARITY_THRESHOLD_PERCENT / 100)
        .take(3)
        .map(|(var, _)| var)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::ChartMetadata;
    use crate::values::to_values;
    use serde_json::json;

    #[test]
    fn test_render_values_coalesce_defaults() {
        let chart = Chart {
            metadata: ChartMetadata {
                name: "app".into(),
                ..Default::default()
            },
            values: to_values(json!({"replicaCount": 1, "image": {"tag": "stable"}})),
            ..Default::default()
        };

        let rv = RenderValues::new(
            &chart,
            &to_values(json!({"image": {"tag": "1.2"}})),
            ReleaseInfo::new("app", "default"),
        );
        assert_eq!(Value::Object(rv.values), json!({"replicaCount": 1, "image": {"tag": "1.2"}}));
    }

    #[test]
    fn test_release_info_serializes_pascal_case() {
        let value = serde_json::to_value(ReleaseInfo::new("web", "apps")).unwrap();
        assert_eq!(value["Name"], json!("web"));
        assert_eq!(value["Namespace"], json!("apps"));
        assert_eq!(value["Revision"], json!(1));
        assert_eq!(value["IsInstall"], json!(true));
        assert_eq!(value["Service"], json!("Helm"));
    }

    #[test]
    fn test_similar_variable_suggestions() {
        let ctx = to_values(json!({"Values": {"image": {"tag": "1"}, "replicaCount": 2}}));
        let mut paths = Vec::new();
        available_paths(&ctx, "", 4, &mut paths);

        let suggestions = find_similar_variables("Values.image.tga", &paths);
        assert_eq!(suggestions.first().map(String::as_str), Some("Values.image.tag"));
        assert!(find_similar_variables("zzzzzzzz", &paths).is_empty());
    }

    #[test]
    fn test_variable_not_found_message() {
        let err = TemplateError::VariableNotFound {
            template: "app/templates/a.yaml".into(),
            variable: "Values.imag".into(),
            suggestions: vec!["Values.image".into()],
        };
        assert_eq!(
            err.to_string(),
            "variable `Values.imag` not found in app/templates/a.yaml (did you mean: Values.image?)"
        );
    }
}
