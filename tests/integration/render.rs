use chart_render::config::Settings;
use chart_render::constants::{ANNOTATION_SOURCE_FILE, ANNOTATION_SOURCE_PATH, ANNOTATION_SOURCE_TYPE};
use chart_render::core::{RenderContext, RenderError};
use chart_render::pipeline::{filters, transformers};
use chart_render::renderer::{Renderer, RendererOptions, Source};
use chart_render::test_utils::{ChartFixture, init_test_logging};
use chart_render::values::{Values, to_values, values};
use serde_json::json;
use std::collections::BTreeMap;
use tempfile::TempDir;

use crate::common::{find, fixture_ref, fixture_source, kinds};

/// The fixture chart renders CRDs first, then templates in name order; NOTES.txt is skipped
#[tokio::test]
async fn test_render_fixture_chart() {
    init_test_logging(None);

    let renderer = Renderer::new(vec![fixture_source("web")], RendererOptions::default()).unwrap();
    let objects = renderer.process(&RenderContext::new(), &Values::new()).await.unwrap();

    assert_eq!(kinds(&objects), vec!["CustomResourceDefinition", "Deployment", "Service"]);

    let deployment = find(&objects, "Deployment");
    assert_eq!(deployment.name(), "web-simple-app");
    assert_eq!(deployment.namespace(), "default");

    let labels = deployment.labels();
    assert_eq!(labels.get("app.kubernetes.io/version").map(String::as_str), Some("2.4.1"));
    assert_eq!(labels.get("app.kubernetes.io/managed-by").map(String::as_str), Some("Helm"));
    assert_eq!(labels.get("tier").map(String::as_str), Some("web"));

    let spec = &deployment.fields()["spec"];
    assert_eq!(spec["replicas"], json!(1));
    assert_eq!(spec["template"]["spec"]["containers"][0]["image"], json!("nginx:1.25"));

    let service = find(&objects, "Service");
    assert_eq!(service.fields()["spec"]["ports"][0]["port"], json!(80));
}

/// Chart defaults < source values < call-time values
#[tokio::test]
async fn test_value_layers() {
    let source = fixture_source("web").with_values(values(to_values(json!({
        "replicaCount": 2,
        "image": {"tag": "1.26"},
    }))));
    let renderer = Renderer::new(vec![source], RendererOptions::default()).unwrap();

    let overrides = to_values(json!({"replicaCount": 5}));
    let objects = renderer.process(&RenderContext::new(), &overrides).await.unwrap();

    let spec = &find(&objects, "Deployment").fields()["spec"];
    assert_eq!(spec["replicas"], json!(5));
    assert_eq!(spec["template"]["spec"]["containers"][0]["image"], json!("nginx:1.26"));
    assert_eq!(
        spec["template"]["spec"]["containers"][0]["imagePullPolicy"],
        json!("IfNotPresent")
    );
}

#[tokio::test]
async fn test_namespace_comes_from_settings() {
    let options = RendererOptions::builder()
        .settings(Settings::default().with_namespace("apps"))
        .build();
    let renderer = Renderer::new(vec![fixture_source("web")], options).unwrap();

    let objects = renderer.process(&RenderContext::new(), &Values::new()).await.unwrap();
    assert_eq!(find(&objects, "Service").namespace(), "apps");
}

#[tokio::test]
async fn test_source_annotations() {
    let options = RendererOptions::builder().source_annotations(true).build();
    let renderer = Renderer::new(vec![fixture_source("web")], options).unwrap();

    let objects = renderer.process(&RenderContext::new(), &Values::new()).await.unwrap();
    let chart_ref = fixture_ref();

    let crd = find(&objects, "CustomResourceDefinition").annotations();
    assert_eq!(crd[ANNOTATION_SOURCE_TYPE], "helm");
    assert_eq!(crd[ANNOTATION_SOURCE_PATH], chart_ref);
    assert_eq!(crd[ANNOTATION_SOURCE_FILE], "simple-app/crds/application.yaml");

    let deployment = find(&objects, "Deployment").annotations();
    assert_eq!(deployment[ANNOTATION_SOURCE_FILE], "simple-app/templates/deployment.yaml");
}

#[tokio::test]
async fn test_annotations_off_by_default() {
    let renderer = Renderer::new(vec![fixture_source("web")], RendererOptions::default()).unwrap();
    let objects = renderer.process(&RenderContext::new(), &Values::new()).await.unwrap();
    assert!(objects.iter().all(|o| o.annotations().is_empty()));
}

/// Source annotations are added next to the chart's own, whatever their value types
#[tokio::test]
async fn test_source_annotations_keep_chart_annotations() {
    let dir = TempDir::new().unwrap();
    let chart = ChartFixture::new("annotated", "0.1.0")
        .template(
            "cm.yaml",
            "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: cfg\n  annotations:\n    revision: 7\n    owner: ops\n",
        )
        .write(dir.path())
        .unwrap();

    let renderer = Renderer::new(
        vec![Source::new(chart.display().to_string(), "cfg")],
        RendererOptions::builder()
            .source_annotations(true)
            .transformer(transformers::annotations(BTreeMap::from([(
                "team".to_string(),
                "platform".to_string(),
            )])))
            .build(),
    )
    .unwrap();

    let objects = renderer.process(&RenderContext::new(), &Values::new()).await.unwrap();
    let annotations = &objects[0].fields()["metadata"]["annotations"];
    assert_eq!(annotations["revision"], json!(7));
    assert_eq!(annotations["owner"], json!("ops"));
    assert_eq!(annotations["team"], json!("platform"));
    assert_eq!(annotations[ANNOTATION_SOURCE_TYPE], json!("helm"));
}

/// Renderer-level filters and transformers apply per source
#[tokio::test]
async fn test_renderer_pipeline() {
    let options = RendererOptions::builder()
        .filter(filters::exclude_kinds(["CustomResourceDefinition"]))
        .transformer(transformers::labels(BTreeMap::from([(
            "team".to_string(),
            "platform".to_string(),
        )])))
        .build();
    let renderer = Renderer::new(vec![fixture_source("web")], options).unwrap();

    let objects = renderer.process(&RenderContext::new(), &Values::new()).await.unwrap();
    assert_eq!(kinds(&objects), vec!["Deployment", "Service"]);
    assert!(objects.iter().all(|o| o.labels()["team"] == "platform"));
}

/// Several sources are concatenated in declaration order
#[tokio::test]
async fn test_multiple_sources_in_order() {
    let renderer = Renderer::new(
        vec![fixture_source("first"), fixture_source("second")],
        RendererOptions::builder().filter(filters::kinds(["Service"])).build(),
    )
    .unwrap();

    let objects = renderer.process(&RenderContext::new(), &Values::new()).await.unwrap();
    let names: Vec<&str> = objects.iter().map(|o| o.name()).collect();
    assert_eq!(names, vec!["first-simple-app", "second-simple-app"]);
}

#[tokio::test]
async fn test_version_constraint() {
    let matching = Renderer::new(
        vec![fixture_source("web").with_version("^1.2")],
        RendererOptions::default(),
    )
    .unwrap();
    assert!(matching.process(&RenderContext::new(), &Values::new()).await.is_ok());

    let mismatched = Renderer::new(
        vec![fixture_source("web").with_version("2.0.0")],
        RendererOptions::default(),
    )
    .unwrap();
    let err = mismatched.process(&RenderContext::new(), &Values::new()).await.unwrap_err();
    assert!(matches!(err.root(), RenderError::Locate { .. }), "{err:?}");
}

/// A bare version pins the chart exactly instead of acting as a caret range
#[tokio::test]
async fn test_bare_version_pins_exactly() {
    let older = Renderer::new(
        vec![fixture_source("web").with_version("1.0.0")],
        RendererOptions::default(),
    )
    .unwrap();
    let err = older.process(&RenderContext::new(), &Values::new()).await.unwrap_err();
    assert!(matches!(err.root(), RenderError::Locate { .. }), "{err:?}");

    let exact = Renderer::new(
        vec![fixture_source("web").with_version("1.2.0")],
        RendererOptions::default(),
    )
    .unwrap();
    assert!(exact.process(&RenderContext::new(), &Values::new()).await.is_ok());
}

/// Relative chart paths resolve against the configured base directory
#[tokio::test]
async fn test_relative_chart_path() {
    let base = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures");
    let options = RendererOptions::builder()
        .settings(Settings::default().with_base_dir(base))
        .build();
    let renderer = Renderer::new(vec![Source::new("./charts/simple-app", "web")], options).unwrap();

    let objects = renderer.process(&RenderContext::new(), &Values::new()).await.unwrap();
    assert_eq!(objects.len(), 3);
}
