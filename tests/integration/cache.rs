use chart_render::cache::CacheOptions;
use chart_render::core::RenderContext;
use chart_render::renderer::{Renderer, RendererOptions};
use chart_render::values::{Values, to_values};
use serde_json::json;
use std::time::Duration;

use crate::common::{find, fixture_source};

fn renderer(cache: CacheOptions) -> Renderer {
    Renderer::new(
        vec![fixture_source("web")],
        RendererOptions::builder().cache(cache).build(),
    )
    .unwrap()
}

#[tokio::test]
async fn test_repeated_render_hits_cache() {
    let renderer = renderer(CacheOptions::new());
    let ctx = RenderContext::new();

    let first = renderer.process(&ctx, &Values::new()).await.unwrap();
    let second = renderer.process(&ctx, &Values::new()).await.unwrap();
    assert_eq!(first, second);

    let stats = renderer.cache().unwrap().stats();
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.entries, 1);
}

/// The full key includes values, so different overrides are separate entries
#[tokio::test]
async fn test_full_key_discriminates_values() {
    let renderer = renderer(CacheOptions::new());
    let ctx = RenderContext::new();

    let one = renderer.process(&ctx, &to_values(json!({"replicaCount": 1}))).await.unwrap();
    let three = renderer.process(&ctx, &to_values(json!({"replicaCount": 3}))).await.unwrap();

    assert_eq!(find(&one, "Deployment").fields()["spec"]["replicas"], json!(1));
    assert_eq!(find(&three, "Deployment").fields()["spec"]["replicas"], json!(3));
    assert_eq!(renderer.cache().unwrap().stats().misses, 2);
}

/// The fast key ignores values: a second call with other values is served stale
#[tokio::test]
async fn test_fast_key_ignores_values() {
    let renderer = renderer(CacheOptions::new().fast());
    let ctx = RenderContext::new();

    renderer.process(&ctx, &to_values(json!({"replicaCount": 1}))).await.unwrap();
    let cached = renderer.process(&ctx, &to_values(json!({"replicaCount": 3}))).await.unwrap();

    assert_eq!(find(&cached, "Deployment").fields()["spec"]["replicas"], json!(1));
    assert_eq!(renderer.cache().unwrap().stats().hits, 1);
}

#[tokio::test]
async fn test_entries_expire_after_ttl() {
    let renderer = renderer(CacheOptions::new().with_ttl(Duration::from_millis(50)));
    let ctx = RenderContext::new();

    renderer.process(&ctx, &Values::new()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(120)).await;
    renderer.process(&ctx, &Values::new()).await.unwrap();

    let stats = renderer.cache().unwrap().stats();
    assert_eq!(stats.hits, 0);
    assert_eq!(stats.misses, 2);
}

/// Objects handed out by the renderer are copies of what the cache holds
#[tokio::test]
async fn test_cached_objects_are_isolated() {
    let renderer = renderer(CacheOptions::new());
    let ctx = RenderContext::new();

    let mut first = renderer.process(&ctx, &Values::new()).await.unwrap();
    for object in &mut first {
        object.set_namespace("mutated");
    }

    let second = renderer.process(&ctx, &Values::new()).await.unwrap();
    assert!(second.iter().all(|o| o.namespace() != "mutated"));
}

/// A cache hit skips rendering, so a cancelled context still gets cached objects
#[tokio::test]
async fn test_cache_hit_skips_render_checkpoint() {
    let renderer = renderer(CacheOptions::new());
    renderer.process(&RenderContext::new(), &Values::new()).await.unwrap();

    let cancelled = RenderContext::new();
    cancelled.cancel();
    let objects = renderer.process(&cancelled, &Values::new()).await.unwrap();
    assert_eq!(objects.len(), 3);
}
