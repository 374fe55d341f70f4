//! Layered value trees and their deep merge.
//!
//! Values are string-keyed JSON maps with arbitrary leaves. They are merged in
//! layers: chart defaults, then per-source values, then call-time overrides,
//! with later layers winning.

use serde_json::{Map, Value};
use std::sync::Arc;

use crate::core::{BoxError, RenderContext};

/// A tree of string-keyed maps with arbitrary leaf types.
pub type Values = Map<String, Value>;

/// Deep-merge `overrides` on top of `base`.
///
/// - keys present on one side only are kept
/// - when both sides hold maps, they are merged recursively
/// - otherwise (scalars, lists, type mismatch) the override replaces the base
///   value entirely; lists are never concatenated
/// - `None` overrides leave `base` untouched
///
/// # Examples
///
/// ```rust
/// use chart_render::values::{deep_merge, to_values};
/// use serde_json::json;
///
/// let base = to_values(json!({ "a": 1, "b": { "x": 1 } }));
/// let overrides = to_values(json!({ "b": { "y": 2 } }));
///
/// let merged = deep_merge(base, Some(&overrides));
/// assert_eq!(serde_json::Value::Object(merged), json!({ "a": 1, "b": { "x": 1, "y": 2 } }));
/// ```
#[must_use]
pub fn deep_merge(mut base: Values, overrides: Option<&Values>) -> Values {
    let Some(overrides) = overrides else {
        return base;
    };

    for (key, override_value) in overrides {
        match base.get_mut(key) {
            Some(Value::Object(base_obj)) if override_value.is_object() => {
                let nested = std::mem::take(base_obj);
                let merged = deep_merge(nested, override_value.as_object());
                *base_obj = merged;
            }
            _ => {
                base.insert(key.clone(), override_value.clone());
            }
        }
    }

    base
}

/// Convert a JSON value into a [`Values`] map; non-objects yield an empty map.
#[must_use]
pub fn to_values(value: Value) -> Values {
    match value {
        Value::Object(map) => map,
        _ => Values::new(),
    }
}

/// Look up a dotted path such as `ingress.enabled`.
#[must_use]
pub fn get_path<'a>(values: &'a Values, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.').filter(|s| !s.is_empty());
    let first = segments.next()?;
    let mut current = values.get(first)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Set a dotted path, creating intermediate maps.
///
/// Returns `false` without modifying anything when an intermediate segment
/// exists but is not a map.
pub fn set_path(values: &mut Values, path: &str, value: Value) -> bool {
    let segments: Vec<&str> = path.split('.').filter(|s| !s.is_empty()).collect();
    let Some((last, parents)) = segments.split_last() else {
        return false;
    };

    let mut current = values;
    for segment in parents {
        let entry = current.entry(segment.to_string()).or_insert_with(|| Value::Object(Map::new()));
        match entry {
            Value::Object(map) => current = map,
            _ => return false,
        }
    }
    current.insert((*last).to_string(), value);
    true
}

/// Supplies per-source values at render time.
///
/// Implementations must be safe to call concurrently and repeatedly. Returning
/// `Ok(None)` is equivalent to returning an empty map.
pub trait ValuesProvider: Send + Sync {
    /// Produce the values for one render.
    fn values(&self, ctx: &RenderContext) -> Result<Option<Values>, BoxError>;
}

impl<F> ValuesProvider for F
where
    F: Fn(&RenderContext) -> Result<Option<Values>, BoxError> + Send + Sync,
{
    fn values(&self, ctx: &RenderContext) -> Result<Option<Values>, BoxError> {
        self(ctx)
    }
}

/// Provider returning the same values on every call.
#[derive(Debug, Clone, Default)]
pub struct StaticValues(Values);

impl ValuesProvider for StaticValues {
    fn values(&self, _ctx: &RenderContext) -> Result<Option<Values>, BoxError> {
        Ok(Some(self.0.clone()))
    }
}

/// Provider for fixed values, the common case of non-dynamic configuration.
#[must_use]
pub fn values(values: Values) -> Arc<dyn ValuesProvider> {
    Arc::new(StaticValues(values))
}

/// Provider backed by a closure.
pub fn values_fn<F>(f: F) -> Arc<dyn ValuesProvider>
where
    F: Fn(&RenderContext) -> Result<Option<Values>, BoxError> + Send + Sync + 'static,
{
    Arc::new(f)
}
