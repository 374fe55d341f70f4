use chart_render::core::{CancelCause, RenderContext, RenderError};
use chart_render::renderer::{Renderer, RendererOptions, Source};
use chart_render::test_utils::{ChartFixture, CountingLoader, FlakyLocator};
use chart_render::values::{Values, values_fn};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use crate::common::fixture_source;

#[test]
fn test_release_name_boundary() {
    let at_limit = "a".repeat(53);
    assert!(Renderer::new(vec![fixture_source(&at_limit)], RendererOptions::default()).is_ok());

    let over_limit = "a".repeat(54);
    let err = Renderer::new(vec![fixture_source(&over_limit)], RendererOptions::default()).unwrap_err();
    assert!(matches!(
        err,
        RenderError::ReleaseNameTooLong {
            max: 53,
            actual: 54
        }
    ));

    for name in ["-abc", "abc-", "ABC", "a_b", "a.b"] {
        let err = Renderer::new(vec![fixture_source(name)], RendererOptions::default()).unwrap_err();
        assert!(matches!(err, RenderError::ReleaseNameInvalidFormat { .. }), "{name}: {err}");
    }
}

#[test]
fn test_one_invalid_source_rejects_renderer() {
    let err = Renderer::new(
        vec![fixture_source("web"), Source::new("   ", "db")],
        RendererOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, RenderError::ChartEmpty));
    assert_eq!(err.to_string(), "chart cannot be empty or whitespace-only");
}

/// A failing second source discards the first source's objects
#[tokio::test]
async fn test_fail_fast_names_failing_source() {
    let renderer = Renderer::new(
        vec![fixture_source("web"), Source::new("/nonexistent/chart", "broken")],
        RendererOptions::default(),
    )
    .unwrap();

    let err = renderer.process(&RenderContext::new(), &Values::new()).await.unwrap_err();
    match &err {
        RenderError::Source {
            chart,
            release,
            ..
        } => {
            assert_eq!(chart, "/nonexistent/chart");
            assert_eq!(release, "broken");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(matches!(err.root(), RenderError::Locate { .. }));
    assert_eq!(
        err.to_string(),
        "error rendering helm chart /nonexistent/chart (release: broken)"
    );
}

/// Failed loads are not remembered: the next call retries
#[tokio::test]
async fn test_load_failure_is_retried() {
    let locator = Arc::new(FlakyLocator::new(1));
    let renderer = Renderer::new(
        vec![fixture_source("web")],
        RendererOptions::builder().locator(locator.clone()).build(),
    )
    .unwrap();
    let ctx = RenderContext::new();

    let err = renderer.process(&ctx, &Values::new()).await.unwrap_err();
    assert!(format!("{:?}", err.root()).contains("transient failure"));

    let objects = renderer.process(&ctx, &Values::new()).await.unwrap();
    assert_eq!(objects.len(), 3);
    assert_eq!(locator.calls(), 2);

    renderer.process(&ctx, &Values::new()).await.unwrap();
    assert_eq!(locator.calls(), 2);
}

#[tokio::test]
async fn test_values_provider_error() {
    let source = fixture_source("web")
        .with_values(values_fn(|_ctx| Err("vault unreachable".into())));
    let renderer = Renderer::new(vec![source], RendererOptions::default()).unwrap();

    let err = renderer.process(&RenderContext::new(), &Values::new()).await.unwrap_err();
    let root = err.root();
    assert!(matches!(root, RenderError::Values { .. }));
    assert_eq!(
        std::error::Error::source(root).map(ToString::to_string).as_deref(),
        Some("vault unreachable")
    );
}

#[tokio::test]
async fn test_cancelled_before_load() {
    let loader = Arc::new(CountingLoader::new());
    let renderer = Renderer::new(
        vec![fixture_source("web")],
        RendererOptions::builder().loader(loader.clone()).build(),
    )
    .unwrap();

    let ctx = RenderContext::new();
    ctx.cancel();

    let err = renderer.process(&ctx, &Values::new()).await.unwrap_err();
    assert!(err.is_cancelled());
    assert_eq!(err.cancel_cause(), Some(CancelCause::Cancelled));
    assert_eq!(loader.loads(), 0);
}

/// A loaded chart is reused, but the render checkpoint still honours cancellation
#[tokio::test]
async fn test_cancelled_before_render() {
    let renderer = Renderer::new(vec![fixture_source("web")], RendererOptions::default()).unwrap();
    renderer.process(&RenderContext::new(), &Values::new()).await.unwrap();

    let ctx = RenderContext::new();
    ctx.cancel();
    let err = renderer.process(&ctx, &Values::new()).await.unwrap_err();
    assert!(matches!(
        err.root(),
        RenderError::Cancelled {
            stage: "before render",
            ..
        }
    ));
}

#[tokio::test]
async fn test_deadline_exceeded() {
    let renderer = Renderer::new(vec![fixture_source("web")], RendererOptions::default()).unwrap();

    let ctx = RenderContext::with_timeout(Duration::from_millis(10));
    tokio::time::sleep(Duration::from_millis(30)).await;

    let err = renderer.process(&ctx, &Values::new()).await.unwrap_err();
    assert_eq!(err.cancel_cause(), Some(CancelCause::DeadlineExceeded));
    assert!(format!("{:#}", anyhow::Error::from(err)).contains("context deadline exceeded"));
}

#[tokio::test]
async fn test_template_error_is_render_error() {
    let dir = TempDir::new().unwrap();
    let chart = ChartFixture::new("broken", "0.1.0")
        .template("cm.yaml", "kind: ConfigMap\nname: {{ Values.name | required(msg=\"name is required\") }}\n")
        .write(dir.path())
        .unwrap();

    let renderer = Renderer::new(
        vec![Source::new(chart.display().to_string(), "broken")],
        RendererOptions::default(),
    )
    .unwrap();
    let err = renderer.process(&RenderContext::new(), &Values::new()).await.unwrap_err();
    assert!(matches!(err.root(), RenderError::Render { .. }));

    let lint = Renderer::new(
        vec![Source::new(chart.display().to_string(), "broken")],
        RendererOptions::builder().lint_mode(true).build(),
    )
    .unwrap();
    assert!(lint.process(&RenderContext::new(), &Values::new()).await.is_ok());
}

#[tokio::test]
async fn test_non_mapping_output_is_decode_error() {
    let dir = TempDir::new().unwrap();
    let chart = ChartFixture::new("lists", "0.1.0")
        .template("list.yaml", "- a\n- b\n")
        .write(dir.path())
        .unwrap();

    let renderer = Renderer::new(
        vec![Source::new(chart.display().to_string(), "lists")],
        RendererOptions::default(),
    )
    .unwrap();
    let err = renderer.process(&RenderContext::new(), &Values::new()).await.unwrap_err();
    match err.root() {
        RenderError::Decode { file, .. } => assert_eq!(file, "lists/templates/list.yaml"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_remote_reference_needs_registry_locator() {
    let renderer = Renderer::new(
        vec![Source::new("oci://registry-1.docker.io/bitnamicharts/nginx", "nginx")],
        RendererOptions::default(),
    )
    .unwrap();

    let err = renderer.process(&RenderContext::new(), &Values::new()).await.unwrap_err();
    assert!(matches!(err.root(), RenderError::Locate { .. }));
    assert!(format!("{:?}", err.root()).contains("registry-capable locator"));
}
