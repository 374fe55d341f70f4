//! Immutable renderer configuration and its builder.

use std::fmt;
use std::sync::Arc;

use crate::cache::CacheOptions;
use crate::chart::{
    ChartLoader, ChartLocator, ConditionProcessor, DependencyProcessor, DirectoryLoader,
    FilesystemLocator,
};
use crate::config::Settings;
use crate::decode::{Decoder, YamlDecoder};
use crate::pipeline::{FilterRef, TransformerRef};
use crate::templating::{EngineOptions, TemplateEngine, TeraEngine};

/// Configuration for a [`crate::renderer::Renderer`].
///
/// Built once through [`RendererOptions::builder`] and never mutated afterwards.
/// Every field is optional; the defaults render local charts with Tera and
/// disable caching.
#[derive(Clone)]
pub struct RendererOptions {
    filters: Vec<FilterRef>,
    transformers: Vec<TransformerRef>,
    settings: Settings,
    cache: Option<CacheOptions>,
    source_annotations: bool,
    lint_mode: bool,
    strict: bool,
    locator: Arc<dyn ChartLocator>,
    loader: Arc<dyn ChartLoader>,
    dependency_processor: Arc<dyn DependencyProcessor>,
    engine: Arc<dyn TemplateEngine>,
    decoder: Arc<dyn Decoder>,
}

impl Default for RendererOptions {
    fn default() -> Self {
        Self {
            filters: Vec::new(),
            transformers: Vec::new(),
            settings: Settings::default(),
            cache: None,
            source_annotations: false,
            lint_mode: false,
            strict: false,
            locator: Arc::new(FilesystemLocator),
            loader: Arc::new(DirectoryLoader),
            dependency_processor: Arc::new(ConditionProcessor),
            engine: Arc::new(TeraEngine),
            decoder: Arc::new(YamlDecoder),
        }
    }
}

impl fmt::Debug for RendererOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RendererOptions")
            .field("filters", &self.filters.len())
            .field("transformers", &self.transformers.len())
            .field("settings", &self.settings)
            .field("cache", &self.cache)
            .field("source_annotations", &self.source_annotations)
            .field("lint_mode", &self.lint_mode)
            .field("strict", &self.strict)
            .finish_non_exhaustive()
    }
}

impl RendererOptions {
    /// Start building options from the defaults.
    #[must_use]
    pub fn builder() -> RendererOptionsBuilder {
        RendererOptionsBuilder::default()
    }

    /// Renderer-level filters, in application order.
    #[must_use]
    pub fn filters(&self) -> &[FilterRef] {
        &self.filters
    }

    /// Renderer-level transformers, in application order.
    #[must_use]
    pub fn transformers(&self) -> &[TransformerRef] {
        &self.transformers
    }

    /// Environment settings.
    #[must_use]
    pub const fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Cache configuration; `None` disables caching.
    #[must_use]
    pub const fn cache(&self) -> Option<&CacheOptions> {
        self.cache.as_ref()
    }

    /// Whether source-tracking annotations are added.
    #[must_use]
    pub const fn source_annotations(&self) -> bool {
        self.source_annotations
    }

    /// Whether `required` failures are tolerated.
    #[must_use]
    pub const fn lint_mode(&self) -> bool {
        self.lint_mode
    }

    /// Whether undefined template variables fail the render.
    #[must_use]
    pub const fn strict(&self) -> bool {
        self.strict
    }

    /// Flags forwarded to the template engine.
    #[must_use]
    pub const fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            strict: self.strict,
            lint_mode: self.lint_mode,
        }
    }

    pub(crate) fn locator(&self) -> &dyn ChartLocator {
        self.locator.as_ref()
    }

    pub(crate) fn loader(&self) -> &dyn ChartLoader {
        self.loader.as_ref()
    }

    pub(crate) fn dependency_processor(&self) -> &dyn DependencyProcessor {
        self.dependency_processor.as_ref()
    }

    pub(crate) fn engine(&self) -> Arc<dyn TemplateEngine> {
        Arc::clone(&self.engine)
    }

    pub(crate) fn decoder(&self) -> &dyn Decoder {
        self.decoder.as_ref()
    }
}

/// Builder for [`RendererOptions`].
///
/// Calls apply in order: scalar settings keep the last value, filters and
/// transformers accumulate.
///
/// ```rust
/// use chart_render::cache::CacheOptions;
/// use chart_render::pipeline::filters;
/// use chart_render::renderer::RendererOptions;
/// use std::time::Duration;
///
/// let options = RendererOptions::builder()
///     .filter(filters::kinds(["Deployment"]))
///     .filter(filters::exclude_kinds(["Secret"]))
///     .cache(CacheOptions::new().with_ttl(Duration::from_secs(60)))
///     .strict(true)
///     .strict(false)
///     .build();
///
/// assert_eq!(options.filters().len(), 2);
/// assert!(!options.strict());
/// assert!(options.cache().is_some());
/// ```
#[derive(Debug, Default)]
pub struct RendererOptionsBuilder {
    options: RendererOptions,
}

impl RendererOptionsBuilder {
    /// Append a renderer-level filter.
    #[must_use]
    pub fn filter(mut self, filter: FilterRef) -> Self {
        self.options.filters.push(filter);
        self
    }

    /// Append a renderer-level transformer.
    #[must_use]
    pub fn transformer(mut self, transformer: TransformerRef) -> Self {
        self.options.transformers.push(transformer);
        self
    }

    /// Replace the environment settings.
    #[must_use]
    pub fn settings(mut self, settings: Settings) -> Self {
        self.options.settings = settings;
        self
    }

    /// Enable caching with `cache`, replacing any earlier cache configuration.
    #[must_use]
    pub fn cache(mut self, cache: CacheOptions) -> Self {
        self.options.cache = Some(cache);
        self
    }

    /// Disable caching.
    #[must_use]
    pub fn no_cache(mut self) -> Self {
        self.options.cache = None;
        self
    }

    /// Toggle source-tracking annotations.
    #[must_use]
    pub const fn source_annotations(mut self, enabled: bool) -> Self {
        self.options.source_annotations = enabled;
        self
    }

    /// Toggle lint mode.
    #[must_use]
    pub const fn lint_mode(mut self, enabled: bool) -> Self {
        self.options.lint_mode = enabled;
        self
    }

    /// Toggle strict mode.
    #[must_use]
    pub const fn strict(mut self, enabled: bool) -> Self {
        self.options.strict = enabled;
        self
    }

    /// Replace the chart locator.
    #[must_use]
    pub fn locator(mut self, locator: Arc<dyn ChartLocator>) -> Self {
        self.options.locator = locator;
        self
    }

    /// Replace the chart loader.
    #[must_use]
    pub fn loader(mut self, loader: Arc<dyn ChartLoader>) -> Self {
        self.options.loader = loader;
        self
    }

    /// Replace the dependency processor.
    #[must_use]
    pub fn dependency_processor(mut self, processor: Arc<dyn DependencyProcessor>) -> Self {
        self.options.dependency_processor = processor;
        self
    }

    /// Replace the template engine.
    #[must_use]
    pub fn engine(mut self, engine: Arc<dyn TemplateEngine>) -> Self {
        self.options.engine = engine;
        self
    }

    /// Replace the decoder.
    #[must_use]
    pub fn decoder(mut self, decoder: Arc<dyn Decoder>) -> Self {
        self.options.decoder = decoder;
        self
    }

    /// Finish building.
    #[must_use]
    pub fn build(self) -> RendererOptions {
        self.options
    }
}
