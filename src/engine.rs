//! Aggregation of several renderers behind one call.
//!
//! An [`Engine`] runs its renderers in registration order, concatenates their
//! objects, then applies engine-level filters and transformers to the whole
//! set. Renderer-level post-processing has already run by then, per source.

use futures::future::{BoxFuture, FutureExt};
use std::sync::Arc;

use crate::core::{Object, RenderContext, Result};
use crate::pipeline::{self, FilterRef, TransformerRef};
use crate::renderer::{Renderer, RendererOptions, Source};
use crate::values::Values;

/// Anything that turns values into objects.
pub trait ManifestRenderer: Send + Sync {
    /// Renderer type identifier, e.g. `"helm"`.
    fn name(&self) -> &str;

    /// Produce objects for one call.
    fn process<'a>(
        &'a self,
        ctx: &'a RenderContext,
        values: &'a Values,
    ) -> BoxFuture<'a, Result<Vec<Object>>>;
}

impl ManifestRenderer for Renderer {
    fn name(&self) -> &str {
        Renderer::name(self)
    }

    fn process<'a>(
        &'a self,
        ctx: &'a RenderContext,
        values: &'a Values,
    ) -> BoxFuture<'a, Result<Vec<Object>>> {
        Renderer::process(self, ctx, values).boxed()
    }
}

/// Runs renderers in order and post-processes the combined output.
#[derive(Clone, Default)]
pub struct Engine {
    renderers: Vec<Arc<dyn ManifestRenderer>>,
    filters: Vec<FilterRef>,
    transformers: Vec<TransformerRef>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("renderers", &self.renderers.iter().map(|r| r.name().to_string()).collect::<Vec<_>>())
            .field("filters", &self.filters.len())
            .field("transformers", &self.transformers.len())
            .finish()
    }
}

impl Engine {
    /// An engine with no renderers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a renderer.
    #[must_use]
    pub fn with_renderer(mut self, renderer: Arc<dyn ManifestRenderer>) -> Self {
        self.renderers.push(renderer);
        self
    }

    /// Add an engine-level filter.
    #[must_use]
    pub fn with_filter(mut self, filter: FilterRef) -> Self {
        self.filters.push(filter);
        self
    }

    /// Add an engine-level transformer.
    #[must_use]
    pub fn with_transformer(mut self, transformer: TransformerRef) -> Self {
        self.transformers.push(transformer);
        self
    }

    /// Names of the registered renderers, in order.
    #[must_use]
    pub fn renderer_names(&self) -> Vec<&str> {
        self.renderers.iter().map(|r| r.name()).collect()
    }

    /// Run every renderer and post-process the combined objects.
    ///
    /// # Errors
    ///
    /// The first renderer or pipeline failure aborts the call.
    pub async fn render(&self, ctx: &RenderContext, values: &Values) -> Result<Vec<Object>> {
        let mut objects = Vec::new();
        for renderer in &self.renderers {
            let rendered = renderer.process(ctx, values).await?;
            tracing::debug!("Renderer {} produced {} objects", renderer.name(), rendered.len());
            objects.extend(rendered);
        }

        pipeline::apply(objects, &self.filters, &self.transformers)
    }
}

/// Build an engine around a single chart renderer.
///
/// # Errors
///
/// Returns the validation error of the first invalid source; no engine is built.
pub fn new_engine(sources: Vec<Source>, options: RendererOptions) -> Result<Engine> {
    let renderer = Renderer::new(sources, options)?;
    Ok(Engine::new().with_renderer(Arc::new(renderer)))
}
