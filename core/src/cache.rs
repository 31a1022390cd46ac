//! C2 — Two-Tier Cache.
//!
//! Two independently-TTL'd `moka` caches — one for rewritten manifest text,
//! one for raw segment bytes — plus a third for extraction payloads. Each
//! tier's `get_or_fill` is a thin wrapper over `moka::future::Cache::try_get_with`,
//! which gives single-flight semantics for free: concurrent callers for a
//! key that's currently being filled share one in-flight computation and
//! all observe its result, and a failed fill does not poison the entry.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use moka::future::Cache;

use crate::error::GatewayError;

/// A single cache tier: a name-keyed `moka` cache with one TTL.
#[derive(Clone)]
pub struct CacheTier<V: Clone + Send + Sync + 'static> {
    inner: Cache<String, V>,
}

impl<V: Clone + Send + Sync + 'static> CacheTier<V> {
    pub fn new(max_entries: u64, ttl: Duration) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(max_entries)
                .time_to_live(ttl)
                .build(),
        }
    }

    /// Returns the cached value for `key`, or runs `filler` exactly once
    /// across all concurrent callers and caches its success.
    pub async fn get_or_fill<F, Fut>(&self, key: &str, filler: F) -> Result<V, GatewayError>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<V, GatewayError>>,
    {
        self.inner
            .try_get_with(key.to_string(), filler())
            .await
            .map_err(|arc_err| match Arc::try_unwrap(arc_err) {
                Ok(e) => e,
                Err(shared) => GatewayError::Internal(shared.to_string()),
            })
    }

    pub fn invalidate(&self, key: &str) {
        self.inner.invalidate(key);
    }

    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }
}

/// Bundles the three cache tiers the gateway needs.
pub struct GatewayCache {
    pub manifests: CacheTier<Arc<str>>,
    pub segments: CacheTier<Bytes>,
    pub extractions: CacheTier<Arc<serde_json::Value>>,
}

impl GatewayCache {
    pub fn new(settings: &crate::config::CacheSettings) -> Self {
        Self {
            manifests: CacheTier::new(settings.max_manifest_entries, settings.ttl_m3u8),
            segments: CacheTier::new(settings.max_segment_entries, settings.ttl_segment),
            extractions: CacheTier::new(1_000, settings.ttl_extraction),
        }
    }
}

/// Builds the cache key the pipeline uses everywhere: a namespace, a kind
/// tag, and the upstream URL the entry is keyed on.
pub fn cache_key(namespace: &str, kind: &str, upstream_url: &str) -> String {
    format!("{namespace}:{kind}:{upstream_url}")
}
