//! Structured Kubernetes-style objects produced by rendering.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// A decoded manifest: a string-keyed tree with the usual `apiVersion`,
/// `kind` and `metadata` fields.
///
/// Objects are plain owned data, so `clone()` yields a structurally
/// independent copy. Accessors return empty strings for missing fields
/// rather than failing, matching how manifests are usually inspected.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Object(Map<String, Value>);

impl Object {
    /// Wrap an existing map.
    #[must_use]
    pub const fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Convert a JSON value into an object; `None` unless the value is a mapping.
    #[must_use]
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    /// The `apiVersion` field.
    #[must_use]
    pub fn api_version(&self) -> &str {
        self.0.get("apiVersion").and_then(Value::as_str).unwrap_or_default()
    }

    /// The `kind` field.
    #[must_use]
    pub fn kind(&self) -> &str {
        self.0.get("kind").and_then(Value::as_str).unwrap_or_default()
    }

    /// `metadata.name`.
    #[must_use]
    pub fn name(&self) -> &str {
        self.metadata_str("name")
    }

    /// `metadata.namespace`.
    #[must_use]
    pub fn namespace(&self) -> &str {
        self.metadata_str("namespace")
    }

    /// Set `metadata.namespace`, creating `metadata` if needed.
    pub fn set_namespace(&mut self, namespace: &str) {
        self.metadata_mut().insert("namespace".into(), Value::String(namespace.to_string()));
    }

    /// `metadata.labels` as an ordered map; non-string values are skipped.
    #[must_use]
    pub fn labels(&self) -> BTreeMap<String, String> {
        self.metadata_string_map("labels")
    }

    /// Replace `metadata.labels`.
    pub fn set_labels(&mut self, labels: BTreeMap<String, String>) {
        self.set_metadata_string_map("labels", labels);
    }

    /// Set one label, keeping every other entry of `metadata.labels` as is.
    pub fn insert_label(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.metadata_field_mut("labels").insert(key.into(), Value::String(value.into()));
    }

    /// `metadata.annotations` as an ordered map; non-string values are skipped.
    #[must_use]
    pub fn annotations(&self) -> BTreeMap<String, String> {
        self.metadata_string_map("annotations")
    }

    /// Replace `metadata.annotations`.
    pub fn set_annotations(&mut self, annotations: BTreeMap<String, String>) {
        self.set_metadata_string_map("annotations", annotations);
    }

    /// Set one annotation, keeping every other entry of `metadata.annotations` as is.
    pub fn insert_annotation(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.metadata_field_mut("annotations").insert(key.into(), Value::String(value.into()));
    }

    /// Borrow the underlying fields.
    #[must_use]
    pub const fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Mutably borrow the underlying fields.
    pub fn fields_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.0
    }

    /// Consume the object into a JSON value.
    #[must_use]
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    fn metadata_str(&self, field: &str) -> &str {
        self.0
            .get("metadata")
            .and_then(|m| m.get(field))
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    fn metadata_mut(&mut self) -> &mut Map<String, Value> {
        let metadata = self.0.entry("metadata").or_insert_with(|| Value::Object(Map::new()));
        if !metadata.is_object() {
            *metadata = Value::Object(Map::new());
        }
        match metadata {
            Value::Object(map) => map,
            _ => unreachable!("metadata was just replaced with an object"),
        }
    }

    fn metadata_field_mut(&mut self, field: &str) -> &mut Map<String, Value> {
        let entry = self.metadata_mut().entry(field).or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        match entry {
            Value::Object(map) => map,
            _ => unreachable!("{field} was just replaced with an object"),
        }
    }

    fn metadata_string_map(&self, field: &str) -> BTreeMap<String, String> {
        self.0
            .get("metadata")
            .and_then(|m| m.get(field))
            .and_then(Value::as_object)
            .map(|map| {
                map.iter()
                    .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn set_metadata_string_map(&mut self, field: &str, values: BTreeMap<String, String>) {
        let map: Map<String, Value> =
            values.into_iter().map(|(k, v)| (k, Value::String(v))).collect();
        self.metadata_mut().insert(field.to_string(), Value::Object(map));
    }
}

impl From<Object> for Value {
    fn from(object: Object) -> Self {
        object.into_value()
    }
}
