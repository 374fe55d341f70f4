//! Post-processing of rendered objects.
//!
//! After a source is rendered, its objects run through the configured
//! [`Filter`]s (an object is kept only if every filter matches) and then the
//! configured [`Transformer`]s, in the order they were added. Stock
//! implementations live in [`filters`] and [`transformers`]; closures work too.
//!
//! ```rust
//! use chart_render::core::Object;
//! use chart_render::pipeline::{self, filters, transformers};
//! use serde_json::json;
//! use std::collections::BTreeMap;
//!
//! let objects = vec![
//!     Object::from_value(json!({"apiVersion": "apps/v1", "kind": "Deployment", "metadata": {"name": "web"}})).unwrap(),
//!     Object::from_value(json!({"apiVersion": "v1", "kind": "Service", "metadata": {"name": "web"}})).unwrap(),
//! ];
//!
//! let kept = pipeline::apply(
//!     objects,
//!     &[filters::gvk("apps/v1", "Deployment")],
//!     &[transformers::labels(BTreeMap::from([("team".to_string(), "core".to_string())]))],
//! )
//! .unwrap();
//!
//! assert_eq!(kept.len(), 1);
//! assert_eq!(kept[0].labels()["team"], "core");
//! ```

pub mod filters;
pub mod transformers;

use std::sync::Arc;

use crate::core::{BoxError, Object, RenderError, Result};

/// Decides whether an object is kept.
///
/// Must be a pure function of the object, safe to call concurrently.
pub trait Filter: Send + Sync {
    /// Whether `object` should be kept.
    fn matches(&self, object: &Object) -> std::result::Result<bool, BoxError>;
}

impl<F> Filter for F
where
    F: Fn(&Object) -> std::result::Result<bool, BoxError> + Send + Sync,
{
    fn matches(&self, object: &Object) -> std::result::Result<bool, BoxError> {
        self(object)
    }
}

/// Rewrites an object.
///
/// Must be safe to call concurrently.
pub trait Transformer: Send + Sync {
    /// Produce the transformed object.
    fn apply(&self, object: Object) -> std::result::Result<Object, BoxError>;
}

impl<F> Transformer for F
where
    F: Fn(Object) -> std::result::Result<Object, BoxError> + Send + Sync,
{
    fn apply(&self, object: Object) -> std::result::Result<Object, BoxError> {
        self(object)
    }
}

/// Shared filter handle.
pub type FilterRef = Arc<dyn Filter>;

/// Shared transformer handle.
pub type TransformerRef = Arc<dyn Transformer>;

/// Filter backed by a closure.
pub fn filter_fn<F>(f: F) -> FilterRef
where
    F: Fn(&Object) -> std::result::Result<bool, BoxError> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Transformer backed by a closure.
pub fn transformer_fn<F>(f: F) -> TransformerRef
where
    F: Fn(Object) -> std::result::Result<Object, BoxError> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Filter then transform `objects`, preserving order.
///
/// # Errors
///
/// The first failing filter or transformer aborts with [`RenderError::Filter`]
/// or [`RenderError::Transform`] naming the object.
pub fn apply(
    objects: Vec<Object>,
    filters: &[FilterRef],
    transformers: &[TransformerRef],
) -> Result<Vec<Object>> {
    if filters.is_empty() && transformers.is_empty() {
        return Ok(objects);
    }

    let mut out = Vec::with_capacity(objects.len());
    'objects: for object in objects {
        for filter in filters {
            let keep = filter.matches(&object).map_err(|source| RenderError::Filter {
                kind: object.kind().to_string(),
                name: object.name().to_string(),
                source,
            })?;
            if !keep {
                continue 'objects;
            }
        }

        let mut current = object;
        for transformer in transformers {
            let kind = current.kind().to_string();
            let name = current.name().to_string();
            current = transformer.apply(current).map_err(|source| RenderError::Transform {
                kind,
                name,
                source,
            })?;
        }
        out.push(current);
    }

    Ok(out)
}
