use chart_render::core::{Object, RenderContext, RenderError};
use chart_render::renderer::{Renderer, RendererOptions, Source};
use chart_render::test_utils::ChartFixture;
use chart_render::values::{Values, to_values};
use serde_json::json;
use std::path::Path;
use tempfile::TempDir;

const DEPENDENCIES: &str = "\
dependencies:
  - name: db
    version: 0.2.0
    condition: db.enabled
  - name: cache
    version: 0.3.0
    alias: redis
    tags:
      - backend
";

fn umbrella(dir: &Path) -> String {
    ChartFixture::new("shop", "1.0.0")
        .chart_yaml(DEPENDENCIES)
        .values("db:\n  enabled: true\n  port: 5432\n")
        .template("app.yaml", "kind: ConfigMap\nmetadata:\n  name: shop\n")
        .subchart(
            ChartFixture::new("db", "0.2.0")
                .values("port: 3306\n")
                .template(
                    "db.yaml",
                    "kind: ConfigMap\nmetadata:\n  name: db\ndata:\n  port: \"{{ Values.port }}\"\n  env: \"{{ Values.global.env }}\"\n",
                ),
        )
        .subchart(
            ChartFixture::new("cache", "0.3.0")
                .template("cache.yaml", "kind: ConfigMap\nmetadata:\n  name: {{ Chart.Name }}\n"),
        )
        .write(dir)
        .unwrap()
        .display()
        .to_string()
}

fn names(objects: &[Object]) -> Vec<&str> {
    objects.iter().map(Object::name).collect()
}

async fn render(chart: &str, process_dependencies: bool, values: serde_json::Value) -> Vec<Object> {
    let source = Source::new(chart, "shop").with_process_dependencies(process_dependencies);
    let renderer = Renderer::new(vec![source], RendererOptions::default()).unwrap();
    renderer.process(&RenderContext::new(), &to_values(values)).await.unwrap()
}

#[tokio::test]
async fn test_subcharts_rendered_with_parent_values() {
    let dir = TempDir::new().unwrap();
    let chart = umbrella(dir.path());

    let objects = render(&chart, true, json!({"global": {"env": "prod"}})).await;
    let db = objects.iter().find(|o| o.name() == "db").unwrap();
    assert_eq!(db.fields()["data"]["port"], json!("5432"));
    assert_eq!(db.fields()["data"]["env"], json!("prod"));
}

#[tokio::test]
async fn test_condition_disables_subchart() {
    let dir = TempDir::new().unwrap();
    let chart = umbrella(dir.path());

    let objects = render(&chart, true, json!({"db": {"enabled": false}})).await;
    assert_eq!(names(&objects), vec!["redis", "shop"]);
}

#[tokio::test]
async fn test_tags_disable_aliased_subchart() {
    let dir = TempDir::new().unwrap();
    let chart = umbrella(dir.path());

    let objects = render(&chart, true, json!({"tags": {"backend": false}})).await;
    assert_eq!(names(&objects), vec!["db", "shop"]);
}

/// Without dependency processing every bundled sub-chart renders under its own name
#[tokio::test]
async fn test_dependency_processing_is_opt_in() {
    let dir = TempDir::new().unwrap();
    let chart = umbrella(dir.path());

    let objects = render(&chart, false, json!({"db": {"enabled": false}})).await;
    assert_eq!(names(&objects), vec!["cache", "db", "shop"]);
}

/// Processing works on a per-render copy, so toggles do not leak between calls
#[tokio::test]
async fn test_processing_does_not_mutate_loaded_chart() {
    let dir = TempDir::new().unwrap();
    let chart = umbrella(dir.path());
    let source = Source::new(chart, "shop").with_process_dependencies(true);
    let renderer = Renderer::new(vec![source], RendererOptions::default()).unwrap();
    let ctx = RenderContext::new();

    let off = renderer.process(&ctx, &to_values(json!({"db": {"enabled": false}}))).await.unwrap();
    assert!(!names(&off).contains(&"db"));

    let on = renderer.process(&ctx, &Values::new()).await.unwrap();
    assert!(names(&on).contains(&"db"));
}

#[tokio::test]
async fn test_missing_subchart_is_dependency_error() {
    let dir = TempDir::new().unwrap();
    let chart = ChartFixture::new("shop", "1.0.0")
        .chart_yaml("dependencies:\n  - name: db\n    version: 0.2.0\n")
        .write(dir.path())
        .unwrap();

    let source = Source::new(chart.display().to_string(), "shop").with_process_dependencies(true);
    let renderer = Renderer::new(vec![source], RendererOptions::default()).unwrap();

    let err = renderer.process(&RenderContext::new(), &Values::new()).await.unwrap_err();
    assert!(matches!(err.root(), RenderError::Dependencies { .. }));
}
