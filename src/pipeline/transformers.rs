//! Stock transformers.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::{Transformer, TransformerRef};
use crate::core::{BoxError, Object};

/// Kinds that are not namespaced and must not receive `metadata.namespace`.
const CLUSTER_SCOPED_KINDS: &[&str] = &[
    "APIService",
    "ClusterRole",
    "ClusterRoleBinding",
    "CustomResourceDefinition",
    "MutatingWebhookConfiguration",
    "Namespace",
    "PersistentVolume",
    "PriorityClass",
    "StorageClass",
    "ValidatingWebhookConfiguration",
];

/// Sets labels, overriding existing values for the same keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelsTransformer(BTreeMap<String, String>);

impl Transformer for LabelsTransformer {
    fn apply(&self, mut object: Object) -> Result<Object, BoxError> {
        for (key, value) in &self.0 {
            object.insert_label(key.as_str(), value.as_str());
        }
        Ok(object)
    }
}

/// Set `labels` on every object.
#[must_use]
pub fn labels(labels: BTreeMap<String, String>) -> TransformerRef {
    Arc::new(LabelsTransformer(labels))
}

/// Sets annotations, overriding existing values for the same keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationsTransformer(BTreeMap<String, String>);

impl Transformer for AnnotationsTransformer {
    fn apply(&self, mut object: Object) -> Result<Object, BoxError> {
        for (key, value) in &self.0 {
            object.insert_annotation(key.as_str(), value.as_str());
        }
        Ok(object)
    }
}

/// Set `annotations` on every object.
#[must_use]
pub fn annotations(annotations: BTreeMap<String, String>) -> TransformerRef {
    Arc::new(AnnotationsTransformer(annotations))
}

/// Assigns a namespace to namespaced objects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceTransformer {
    namespace: String,
    overwrite: bool,
}

impl Transformer for NamespaceTransformer {
    fn apply(&self, mut object: Object) -> Result<Object, BoxError> {
        if CLUSTER_SCOPED_KINDS.contains(&object.kind()) {
            return Ok(object);
        }
        if self.overwrite || object.namespace().is_empty() {
            object.set_namespace(&self.namespace);
        }
        Ok(object)
    }
}

/// Set `namespace` on namespaced objects that have none.
pub fn namespace(namespace: impl Into<String>) -> TransformerRef {
    Arc::new(NamespaceTransformer {
        namespace: namespace.into(),
        overwrite: false,
    })
}

/// Set `namespace` on every namespaced object, replacing any existing one.
pub fn force_namespace(namespace: impl Into<String>) -> TransformerRef {
    Arc::new(NamespaceTransformer {
        namespace: namespace.into(),
        overwrite: true,
    })
}
