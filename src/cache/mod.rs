//! Render result cache.
//!
//! [`RenderCache`] maps a key derived from a [`ChartSpec`] to the objects one
//! source rendered to. Entries expire after a TTL and are swept lazily by
//! [`RenderCache::sync`]; there is no background task.
//!
//! # Key Strategies
//!
//! | strategy | key | trade-off |
//! |---|---|---|
//! | [`full_key`] (default) | SHA-256 over chart, release, version and values | any value change misses |
//! | [`fast_key`] | `chart:release:version` | value changes return stale results |
//! | [`identity_key`] | `chart:version` | shared across release names too |
//!
//! Full keys are hashes, so logging them never exposes values.
//!
//! # Isolation
//!
//! [`RenderCache::set`] stores its own copy and [`RenderCache::get`] hands out a
//! fresh copy on every call, so callers may mutate results freely.

use dashmap::DashMap;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use crate::constants::DEFAULT_CACHE_TTL;
use crate::core::Object;
use crate::values::Values;

/// Input to cache key derivation for one source render.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSpec {
    /// Chart reference
    pub chart: String,
    /// Release name
    pub release_name: String,
    /// Version constraint, possibly empty
    pub release_version: String,
    /// Values after merging and dependency processing
    pub values: Values,
}

/// Key derivation function.
pub type KeyFn = Arc<dyn Fn(&ChartSpec) -> String + Send + Sync>;

/// Key over the complete spec, values included.
///
/// Values are serialized with keys sorted at every level, so equal trees
/// always produce equal keys.
#[must_use]
pub fn full_key(spec: &ChartSpec) -> String {
    let mut hasher = Sha256::new();
    for (label, field) in [
        ("chart", &spec.chart),
        ("release", &spec.release_name),
        ("version", &spec.release_version),
    ] {
        hasher.update(label.as_bytes());
        hasher.update(b"=");
        hasher.update(field.as_bytes());
        hasher.update(b"\n");
    }

    let mut canonical = String::new();
    write_canonical(&Value::Object(spec.values.clone()), &mut canonical);
    hasher.update(b"values=");
    hasher.update(canonical.as_bytes());

    format!("sha256:{}", hex::encode(hasher.finalize()))
}

/// Key over chart, release and version only; values are ignored.
#[must_use]
pub fn fast_key(spec: &ChartSpec) -> String {
    format!("{}:{}:{}", spec.chart, spec.release_name, spec.release_version)
}

/// Key over chart and version only; release name and values are ignored.
#[must_use]
pub fn identity_key(spec: &ChartSpec) -> String {
    format!("{}:{}", spec.chart, spec.release_version)
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                if let Some(child) = map.get(key) {
                    write_canonical(child, out);
                }
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

/// Cache configuration; its presence enables caching.
#[derive(Clone)]
pub struct CacheOptions {
    /// Entry lifetime; [`Duration::ZERO`] means entries never expire
    pub ttl: Duration,
    /// Key derivation strategy
    pub key_fn: KeyFn,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_CACHE_TTL,
            key_fn: Arc::new(full_key),
        }
    }
}

impl fmt::Debug for CacheOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheOptions").field("ttl", &self.ttl).finish_non_exhaustive()
    }
}

impl CacheOptions {
    /// Default TTL with the full key strategy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the entry lifetime.
    #[must_use]
    pub const fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Use a custom key derivation function.
    #[must_use]
    pub fn with_key_fn<F>(mut self, key_fn: F) -> Self
    where
        F: Fn(&ChartSpec) -> String + Send + Sync + 'static,
    {
        self.key_fn = Arc::new(key_fn);
        self
    }

    /// Use [`fast_key`].
    #[must_use]
    pub fn fast(self) -> Self {
        self.with_key_fn(fast_key)
    }

    /// Use [`identity_key`].
    #[must_use]
    pub fn identity(self) -> Self {
        self.with_key_fn(identity_key)
    }
}

/// Hit/miss counters and current size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    /// Lookups that returned an entry
    pub hits: usize,
    /// Lookups that found nothing
    pub misses: usize,
    /// Entries currently stored, expired ones included until the next sweep
    pub entries: usize,
}

impl CacheStats {
    /// Hit rate as a percentage.
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

#[derive(Debug)]
struct CacheEntry {
    objects: Vec<Object>,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// Thread-safe TTL cache of rendered objects.
pub struct RenderCache {
    entries: DashMap<String, CacheEntry>,
    ttl: Duration,
    key_fn: KeyFn,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl fmt::Debug for RenderCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderCache")
            .field("entries", &self.entries.len())
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl RenderCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new(options: CacheOptions) -> Self {
        Self {
            entries: DashMap::new(),
            ttl: options.ttl,
            key_fn: options.key_fn,
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        }
    }

    /// Derive the key for `spec`.
    #[must_use]
    pub fn key(&self, spec: &ChartSpec) -> String {
        let key = (self.key_fn)(spec);
        tracing::trace!("Cache key for {} ({}): {}", spec.chart, spec.release_name, key);
        key
    }

    /// A copy of the cached objects for `spec`, if present and not expired.
    #[must_use]
    pub fn get(&self, spec: &ChartSpec) -> Option<Vec<Object>> {
        let key = self.key(spec);
        let now = Instant::now();

        let found = self
            .entries
            .get(&key)
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| entry.objects.clone());

        match found {
            Some(objects) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(objects)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                self.entries.remove_if(&key, |_, entry| entry.is_expired(now));
                None
            }
        }
    }

    /// Store a copy of `objects` for `spec`, replacing any existing entry.
    pub fn set(&self, spec: &ChartSpec, objects: &[Object]) {
        let key = self.key(spec);
        let expires_at = if self.ttl.is_zero() {
            None
        } else {
            Instant::now().checked_add(self.ttl)
        };

        self.entries.insert(
            key,
            CacheEntry {
                objects: objects.to_vec(),
                expires_at,
            },
        );
    }

    /// Evict every expired entry.
    pub fn sync(&self) {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        let evicted = before.saturating_sub(self.entries.len());
        if evicted > 0 {
            tracing::debug!("Evicted {} expired render cache entries", evicted);
        }
    }

    /// Number of stored entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop all entries and reset statistics.
    pub fn clear(&self) {
        self.entries.clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }

    /// Current statistics.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.entries.len(),
        }
    }
}
