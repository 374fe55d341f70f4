//! Multi-source chart renderer.
//!
//! A [`Renderer`] owns one [`ChartHolder`] per configured [`Source`] and an
//! optional [`RenderCache`]. [`Renderer::process`] walks the sources in
//! configuration order:
//!
//! 1. ensure the chart is loaded (once per holder, see [`ChartHolder::ensure`])
//! 2. merge the source's values under the call-time values
//! 3. optionally prune sub-charts with the dependency processor
//! 4. look the result up in the cache, or render, decode and annotate it
//! 5. apply the renderer's filters and transformers to this source's objects
//!
//! The first failing source aborts the call and no objects are returned.
//!
//! # Concurrency
//!
//! `process` takes `&self` and may be called concurrently from many tasks.
//! Sources within one call are processed sequentially so output order is
//! deterministic: sources in configuration order, and within a source CRDs
//! first, then rendered templates in output-name order.
//!
//! # Examples
//!
//! ```rust,no_run
//! use chart_render::core::RenderContext;
//! use chart_render::renderer::{Renderer, RendererOptions, Source};
//! use chart_render::values::Values;
//!
//! # async fn example() -> chart_render::core::Result<()> {
//! let renderer = Renderer::new(
//!     vec![Source::new("./charts/app", "app")],
//!     RendererOptions::builder().source_annotations(true).build(),
//! )?;
//!
//! let objects = renderer.process(&RenderContext::new(), &Values::new()).await?;
//! for object in &objects {
//!     println!("{} {}", object.kind(), object.name());
//! }
//! # Ok(())
//! # }
//! ```

mod holder;
mod options;

pub use holder::{ChartHolder, Source};
pub use options::{RendererOptions, RendererOptionsBuilder};

use std::sync::Arc;

use crate::cache::{ChartSpec, RenderCache};
use crate::chart::Chart;
use crate::constants::{
    ANNOTATION_SOURCE_FILE, ANNOTATION_SOURCE_PATH, ANNOTATION_SOURCE_TYPE, RENDERER_TYPE,
};
use crate::core::{BoxError, Object, RenderContext, RenderError, Result};
use crate::decode::is_yaml_output;
use crate::pipeline;
use crate::templating::{ReleaseInfo, RenderValues, RenderedOutputs};
use crate::values::{Values, deep_merge};

/// Renders a fixed list of chart sources into structured objects.
#[derive(Debug)]
pub struct Renderer {
    holders: Vec<ChartHolder>,
    options: RendererOptions,
    cache: Option<RenderCache>,
}

impl Renderer {
    /// Validate `sources` and build a renderer.
    ///
    /// No chart is loaded here; loading happens on first use.
    ///
    /// # Errors
    ///
    /// Returns the first validation error; no renderer is produced.
    pub fn new(sources: Vec<Source>, options: RendererOptions) -> Result<Self> {
        let holders = sources.into_iter().map(ChartHolder::new).collect::<Result<Vec<_>>>()?;
        let cache = options.cache().cloned().map(RenderCache::new);

        tracing::debug!(
            "Created helm renderer with {} sources (cache: {})",
            holders.len(),
            cache.is_some()
        );

        Ok(Self {
            holders,
            options,
            cache,
        })
    }

    /// Renderer type identifier, always `"helm"`.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        RENDERER_TYPE
    }

    /// Configured sources in processing order.
    pub fn sources(&self) -> impl Iterator<Item = &Source> + '_ {
        self.holders.iter().map(ChartHolder::source)
    }

    /// Options the renderer was built with.
    #[must_use]
    pub const fn options(&self) -> &RendererOptions {
        &self.options
    }

    /// The render cache, when caching is enabled.
    #[must_use]
    pub const fn cache(&self) -> Option<&RenderCache> {
        self.cache.as_ref()
    }

    /// Render every source with `values` taking precedence over per-source values.
    ///
    /// # Errors
    ///
    /// The first failure is returned wrapped in [`RenderError::Source`] or
    /// [`RenderError::Pipeline`], naming the chart and release.
    pub async fn process(&self, ctx: &RenderContext, values: &Values) -> Result<Vec<Object>> {
        let mut all_objects = Vec::new();

        for holder in &self.holders {
            let source = holder.source();

            let objects = self.process_single(ctx, holder, values).await.map_err(|e| {
                RenderError::Source {
                    chart: source.chart.clone(),
                    release: source.release_name.clone(),
                    source: Box::new(e),
                }
            })?;

            let transformed =
                pipeline::apply(objects, self.options.filters(), self.options.transformers())
                    .map_err(|e| RenderError::Pipeline {
                        chart: source.chart.clone(),
                        release: source.release_name.clone(),
                        source: Box::new(e),
                    })?;

            all_objects.extend(transformed);
        }

        Ok(all_objects)
    }

    async fn process_single(
        &self,
        ctx: &RenderContext,
        holder: &ChartHolder,
        overrides: &Values,
    ) -> Result<Vec<Object>> {
        let source = holder.source();
        let chart = holder
            .ensure(ctx, self.options.settings(), self.options.locator(), self.options.loader())
            .await?;

        let values = self.source_values(ctx, source, overrides)?;
        let chart = self.process_dependencies(source, chart, &values)?;

        let spec = ChartSpec {
            chart: source.chart.clone(),
            release_name: source.release_name.clone(),
            release_version: source.release_version.clone(),
            values,
        };

        if let Some(cache) = &self.cache {
            cache.sync();
            if let Some(cached) = cache.get(&spec) {
                tracing::debug!("Render cache hit for {} ({})", source.chart, source.release_name);
                return Ok(cached);
            }
            tracing::debug!("Render cache miss for {} ({})", source.chart, source.release_name);
        }

        ctx.check("before render")?;

        let outputs = self.render(source, &chart, &spec.values).await?;

        let mut result = self.decode_crds(source, &chart)?;
        result.extend(self.decode_outputs(source, &outputs)?);

        if let Some(cache) = &self.cache {
            cache.set(&spec, &result);
        }

        Ok(result)
    }

    /// Per-source values with `overrides` merged on top.
    fn source_values(&self, ctx: &RenderContext, source: &Source, overrides: &Values) -> Result<Values> {
        let source_values = match &source.values {
            Some(provider) => provider.values(ctx).map_err(|e| RenderError::Values {
                chart: source.chart.clone(),
                release: source.release_name.clone(),
                source: e,
            })?,
            None => None,
        };

        Ok(deep_merge(source_values.unwrap_or_default(), Some(overrides)))
    }

    /// Apply the dependency processor to a private copy of the chart when requested.
    fn process_dependencies(
        &self,
        source: &Source,
        chart: Arc<Chart>,
        values: &Values,
    ) -> Result<Arc<Chart>> {
        if !source.process_dependencies {
            return Ok(chart);
        }

        let mut processed = Chart::clone(&chart);
        self.options.dependency_processor().process(&mut processed, values).map_err(|e| {
            RenderError::Dependencies {
                chart: source.chart.clone(),
                release: source.release_name.clone(),
                source: e,
            }
        })?;
        Ok(Arc::new(processed))
    }

    async fn render(&self, source: &Source, chart: &Arc<Chart>, values: &Values) -> Result<RenderedOutputs> {
        let render_error = |e: BoxError| RenderError::Render {
            chart: source.chart.clone(),
            release: source.release_name.clone(),
            source: e,
        };

        let release = ReleaseInfo::new(source.release_name.clone(), self.options.settings().namespace.clone());
        let render_values = RenderValues::new(chart, values, release);
        let engine = self.options.engine();
        let engine_options = self.options.engine_options();
        let chart = Arc::clone(chart);

        tokio::task::spawn_blocking(move || engine.render(&chart, &render_values, engine_options))
            .await
            .map_err(|e| render_error(e.into()))?
            .map_err(render_error)
    }

    fn decode_crds(&self, source: &Source, chart: &Chart) -> Result<Vec<Object>> {
        let mut result = Vec::new();

        for crd in chart.crd_objects() {
            let mut objects = self.options.decoder().decode(&crd.file.data).map_err(|e| {
                RenderError::Decode {
                    file: format!("CRD {}", crd.name),
                    source: e,
                }
            })?;
            self.annotate(&mut objects, &source.chart, &crd.name);
            result.extend(objects);
        }

        Ok(result)
    }

    fn decode_outputs(&self, source: &Source, outputs: &RenderedOutputs) -> Result<Vec<Object>> {
        let mut result = Vec::new();

        for (name, text) in outputs {
            if !is_yaml_output(name) {
                tracing::debug!("Skipping non-YAML output {}", name);
                continue;
            }

            let mut objects = self.options.decoder().decode(text).map_err(|e| RenderError::Decode {
                file: name.clone(),
                source: e,
            })?;
            self.annotate(&mut objects, &source.chart, name);
            result.extend(objects);
        }

        Ok(result)
    }

    fn annotate(&self, objects: &mut [Object], chart_ref: &str, file: &str) {
        if !self.options.source_annotations() {
            return;
        }

        for object in objects {
            object.insert_annotation(ANNOTATION_SOURCE_TYPE, RENDERER_TYPE);
            object.insert_annotation(ANNOTATION_SOURCE_PATH, chart_ref);
            object.insert_annotation(ANNOTATION_SOURCE_FILE, file);
        }
    }
}
