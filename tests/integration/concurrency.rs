use chart_render::cache::CacheOptions;
use chart_render::core::RenderContext;
use chart_render::renderer::{Renderer, RendererOptions};
use chart_render::test_utils::CountingLoader;
use chart_render::values::{Values, to_values};
use futures::future::join_all;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use crate::common::{find, fixture_source};

/// Parallel first calls share a single chart load
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_chart_loaded_exactly_once_under_contention() {
    let loader = Arc::new(CountingLoader::with_delay(Duration::from_millis(50)));
    let renderer = Arc::new(
        Renderer::new(
            vec![fixture_source("web")],
            RendererOptions::builder().loader(loader.clone()).build(),
        )
        .unwrap(),
    );

    let tasks: Vec<_> = (0..16)
        .map(|_| {
            let renderer = Arc::clone(&renderer);
            tokio::spawn(async move {
                renderer.process(&RenderContext::new(), &Values::new()).await
            })
        })
        .collect();

    let results = join_all(tasks).await;
    let first = results[0].as_ref().unwrap().as_ref().unwrap().clone();
    for result in results {
        let objects = result.unwrap().unwrap();
        assert_eq!(objects, first);
    }

    assert_eq!(loader.loads(), 1);
}

/// Concurrent calls with different values each see their own values
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_renders_with_shared_cache() {
    let renderer = Arc::new(
        Renderer::new(
            vec![fixture_source("web")],
            RendererOptions::builder().cache(CacheOptions::new()).build(),
        )
        .unwrap(),
    );

    let tasks: Vec<_> = (1..=8)
        .map(|replicas| {
            let renderer = Arc::clone(&renderer);
            tokio::spawn(async move {
                let values = to_values(json!({"replicaCount": replicas}));
                let objects = renderer.process(&RenderContext::new(), &values).await.unwrap();
                (replicas, objects)
            })
        })
        .collect();

    for task in join_all(tasks).await {
        let (replicas, objects) = task.unwrap();
        assert_eq!(find(&objects, "Deployment").fields()["spec"]["replicas"], json!(replicas));
    }

    assert_eq!(renderer.cache().unwrap().len(), 8);
}
