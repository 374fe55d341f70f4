//! Stock filters.

use std::collections::BTreeSet;
use std::sync::Arc;

use super::{Filter, FilterRef};
use crate::core::{BoxError, Object};

/// Keeps objects with a given `apiVersion` and `kind`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GvkFilter {
    api_version: String,
    kind: String,
}

impl Filter for GvkFilter {
    fn matches(&self, object: &Object) -> Result<bool, BoxError> {
        Ok(object.api_version() == self.api_version && object.kind() == self.kind)
    }
}

/// Keep only objects of `api_version` (e.g. `apps/v1`) and `kind`.
pub fn gvk(api_version: impl Into<String>, kind: impl Into<String>) -> FilterRef {
    Arc::new(GvkFilter {
        api_version: api_version.into(),
        kind: kind.into(),
    })
}

/// Keeps, or drops, objects whose `kind` is in a set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KindFilter {
    kinds: BTreeSet<String>,
    exclude: bool,
}

impl Filter for KindFilter {
    fn matches(&self, object: &Object) -> Result<bool, BoxError> {
        Ok(self.kinds.contains(object.kind()) != self.exclude)
    }
}

/// Keep only objects whose kind is one of `kinds`.
pub fn kinds<I, S>(kinds: I) -> FilterRef
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Arc::new(KindFilter {
        kinds: kinds.into_iter().map(Into::into).collect(),
        exclude: false,
    })
}

/// Drop objects whose kind is one of `kinds`.
pub fn exclude_kinds<I, S>(kinds: I) -> FilterRef
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Arc::new(KindFilter {
        kinds: kinds.into_iter().map(Into::into).collect(),
        exclude: true,
    })
}

/// Keeps objects carrying a label, optionally with a specific value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelFilter {
    key: String,
    value: Option<String>,
}

impl Filter for LabelFilter {
    fn matches(&self, object: &Object) -> Result<bool, BoxError> {
        let labels = object.labels();
        Ok(match (&self.value, labels.get(&self.key)) {
            (_, None) => false,
            (None, Some(_)) => true,
            (Some(expected), Some(actual)) => expected == actual,
        })
    }
}

/// Keep objects labelled `key`, with value `value` when given.
pub fn label(key: impl Into<String>, value: Option<&str>) -> FilterRef {
    Arc::new(LabelFilter {
        key: key.into(),
        value: value.map(str::to_string),
    })
}
