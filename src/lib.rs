//! chart-render - Helm-style chart rendering as a library
//!
//! Renders one or more charts (templates, CRDs, default values, sub-charts)
//! into an ordered list of structured Kubernetes objects, without talking to a
//! cluster.
//!
//! # Architecture Overview
//!
//! A [`renderer::Renderer`] owns an ordered list of [`renderer::Source`]
//! descriptors. On each [`renderer::Renderer::process`] call, for every source
//! in order:
//!
//! 1. The chart is loaded lazily, exactly once per source, through a
//!    [`renderer::ChartHolder`]; failed loads are retried on the next call
//! 2. Values are layered: chart defaults, then the source's values provider,
//!    then the call-time overrides ([`values::deep_merge`])
//! 3. Optional dependency processing prunes disabled sub-charts
//! 4. The [`cache::RenderCache`] is consulted; on a miss the template engine
//!    renders and the decoder turns outputs (CRDs first) into [`core::Object`]s
//! 5. Renderer-level filters and transformers run on the source's objects
//!
//! The first failure aborts the whole call: no partial results.
//!
//! # Core Modules
//!
//! - [`core`] - error taxonomy, cancellation context, the `Object` type
//! - [`values`] - value trees and layered merge
//! - [`chart`] - in-memory chart model, locating, loading, dependency processing
//! - [`templating`] - template engine trait and the Tera-backed default
//! - [`decode`] - multi-document YAML decoding
//! - [`pipeline`] - filters and transformers
//! - [`cache`] - render result cache with pluggable keys and TTL
//! - [`renderer`] - sources, lazy chart holders, options, the renderer itself
//! - [`engine`] - aggregation of several renderers
//! - [`config`] - environment settings and the TOML render configuration
//! - [`cli`] - the `chart-render` command line
//!
//! # Example
//!
//! ```rust,no_run
//! use chart_render::core::RenderContext;
//! use chart_render::renderer::{Renderer, RendererOptions, Source};
//! use chart_render::cache::CacheOptions;
//! use chart_render::values::{Values, to_values, values};
//! use serde_json::json;
//!
//! # async fn example() -> chart_render::core::Result<()> {
//! let renderer = Renderer::new(
//!     vec![
//!         Source::new("./charts/app", "app")
//!             .with_values(values(to_values(json!({ "replicaCount": 2 })))),
//!     ],
//!     RendererOptions::builder().cache(CacheOptions::new()).build(),
//! )?;
//!
//! let objects = renderer.process(&RenderContext::new(), &Values::new()).await?;
//! for object in &objects {
//!     println!("{} {}", object.kind(), object.name());
//! }
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod chart;
pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod decode;
pub mod engine;
pub mod pipeline;
pub mod renderer;
pub mod templating;
pub mod values;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
