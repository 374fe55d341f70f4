//! Sub-chart enablement from conditions, tags and aliases.

use serde_json::Value;

use super::{Chart, DependencySpec};
use crate::core::BoxError;
use crate::values::{Values, deep_merge, get_path};

/// Validates and prunes a chart's sub-charts against a value tree.
///
/// Called on a per-render copy of the loaded chart, so implementations may
/// freely remove or rename sub-charts.
pub trait DependencyProcessor: Send + Sync {
    /// Process `chart` in place given the merged per-render `values`.
    fn process(&self, chart: &mut Chart, values: &Values) -> Result<(), BoxError>;
}

impl<F> DependencyProcessor for F
where
    F: Fn(&mut Chart, &Values) -> Result<(), BoxError> + Send + Sync,
{
    fn process(&self, chart: &mut Chart, values: &Values) -> Result<(), BoxError> {
        self(chart, values)
    }
}

/// Default processor implementing `condition`, `tags` and `alias` from `Chart.yaml`.
///
/// For each declared dependency:
/// - `condition` holds comma-separated dotted paths; the first one resolving to a
///   boolean decides
/// - otherwise `tags` are looked up under the top-level `tags` map; any `true`
///   enables the sub-chart, all `false` disables it
/// - with neither resolved the sub-chart stays enabled
///
/// Sub-charts present under `charts/` but not declared are always kept.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConditionProcessor;

impl DependencyProcessor for ConditionProcessor {
    fn process(&self, chart: &mut Chart, values: &Values) -> Result<(), BoxError> {
        let scope = deep_merge(chart.values.clone(), Some(values));
        let tags = scope.get("tags").and_then(Value::as_object).cloned().unwrap_or_default();
        process_chart(chart, &scope, &tags)?;
        chart.assign_full_paths(None);
        Ok(())
    }
}

fn process_chart(chart: &mut Chart, scope: &Values, tags: &Values) -> Result<(), BoxError> {
    let resolved = resolve_aliases(chart)?;

    let mut kept = Vec::with_capacity(resolved.len());
    for (spec, mut sub) in resolved {
        let disabled = spec.as_ref().filter(|spec| !is_enabled(spec, scope, tags));
        if let Some(spec) = disabled {
            tracing::debug!("Disabling sub-chart {} of {}", spec.effective_name(), chart.name());
            continue;
        }

        let sub_scope = scope
            .get(sub.name())
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        let sub_scope = deep_merge(sub.values.clone(), Some(&sub_scope));
        process_chart(&mut sub, &sub_scope, tags)?;
        kept.push(sub);
    }

    chart.dependencies = kept;
    Ok(())
}

/// Pair every sub-chart with the declaration that produced it, applying aliases.
fn resolve_aliases(chart: &Chart) -> Result<Vec<(Option<DependencySpec>, Chart)>, BoxError> {
    let mut resolved = Vec::new();

    for spec in &chart.metadata.dependencies {
        let Some(found) = chart.dependencies.iter().find(|c| c.name() == spec.name) else {
            return Err(format!(
                "found in Chart.yaml, but missing in charts/ directory: {}",
                spec.name
            )
            .into());
        };
        let mut sub = found.clone();
        if let Some(alias) = &spec.alias {
            sub.metadata.name.clone_from(alias);
        }
        resolved.push((Some(spec.clone()), sub));
    }

    for sub in &chart.dependencies {
        let declared = chart.metadata.dependencies.iter().any(|spec| spec.name == sub.name());
        if !declared {
            resolved.push((None, sub.clone()));
        }
    }

    Ok(resolved)
}

fn is_enabled(spec: &DependencySpec, scope: &Values, tags: &Values) -> bool {
    if let Some(condition) = &spec.condition {
        for path in condition.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            match get_path(scope, path) {
                Some(Value::Bool(enabled)) => return *enabled,
                Some(Value::Null) | None => {}
                Some(other) => {
                    tracing::warn!(
                        "Condition path {} for {} returned non-bool value {}",
                        path,
                        spec.name,
                        other
                    );
                }
            }
        }
    }

    let tag_values: Vec<bool> =
        spec.tags.iter().filter_map(|tag| tags.get(tag).and_then(Value::as_bool)).collect();
    if tag_values.is_empty() {
        return true;
    }
    tag_values.iter().any(|enabled| *enabled)
}
