use chart_render::core::{Object, RenderContext};
use chart_render::engine::new_engine;
use chart_render::pipeline::{filter_fn, filters, transformers};
use chart_render::renderer::RendererOptions;
use chart_render::values::Values;

use crate::common::{fixture_source, kinds};

#[tokio::test]
async fn test_engine_wraps_renderer() {
    let engine = new_engine(
        vec![fixture_source("web")],
        RendererOptions::builder().filter(filters::gvk("apps/v1", "Deployment")).build(),
    )
    .unwrap()
    .with_transformer(transformers::force_namespace("prod"));

    assert_eq!(engine.renderer_names(), vec!["helm"]);

    let objects = engine.render(&RenderContext::new(), &Values::new()).await.unwrap();
    assert_eq!(kinds(&objects), vec!["Deployment"]);
    assert_eq!(objects[0].namespace(), "prod");
}

/// Engine filters see the combined output of every source
#[tokio::test]
async fn test_engine_filters_run_after_renderers() {
    let engine = new_engine(
        vec![fixture_source("one"), fixture_source("two")],
        RendererOptions::default(),
    )
    .unwrap()
    .with_filter(filter_fn(|o: &Object| Ok(o.kind() == "Service")));

    let objects = engine.render(&RenderContext::new(), &Values::new()).await.unwrap();
    let names: Vec<&str> = objects.iter().map(Object::name).collect();
    assert_eq!(names, vec!["one-simple-app", "two-simple-app"]);
}

#[test]
fn test_engine_rejects_invalid_sources() {
    assert!(new_engine(vec![fixture_source("Bad_Name")], RendererOptions::default()).is_err());
}
