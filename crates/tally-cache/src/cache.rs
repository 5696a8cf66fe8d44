//! Fail-open cache adapter.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::connection::ConnectionState;
use crate::entry::CacheEntry;
use crate::metrics::CacheMetrics;
use crate::store::KvStore;

/// TTL applied by [`Cache::set`] (one hour).
pub const DEFAULT_TTL_SECS: u64 = 3600;

/// A value obtained through [`Cache::get_or_compute`].
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched<T> {
    pub value: T,
    /// True if the value came from the cache rather than the source.
    pub hit: bool,
}

/// JSON cache over a [`KvStore`].
///
/// No method returns an error. A store that is down, slow, misconfigured or
/// holding garbage makes reads miss and writes return `false`; the failure is
/// logged and counted, never propagated.
///
/// Cloning is cheap and clones share the store and metrics.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use tally_cache::{Cache, MemoryStore};
///
/// # #[tokio::main]
/// # async fn main() {
/// let cache = Cache::new(Arc::new(MemoryStore::new()));
///
/// assert!(cache.set_with_ttl("company:1:summary", &42u32, 60).await);
/// let summary: Option<u32> = cache.get("company:1:summary").await;
/// assert_eq!(summary, Some(42));
/// # }
/// ```
#[derive(Clone)]
pub struct Cache {
    store: Arc<dyn KvStore>,
    default_ttl: Duration,
    metrics: CacheMetrics,
}

impl Cache {
    /// Creates a cache over the given store with the default one hour TTL.
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self {
            store,
            default_ttl: Duration::from_secs(DEFAULT_TTL_SECS),
            metrics: CacheMetrics::new(),
        }
    }

    /// Overrides the TTL used by [`set`](Self::set).
    pub fn with_default_ttl(mut self, ttl_secs: u64) -> Self {
        self.default_ttl = Duration::from_secs(ttl_secs);
        self
    }

    /// Returns the default TTL.
    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Returns the store's connection state.
    pub fn state(&self) -> ConnectionState {
        self.store.state()
    }

    /// Returns the store backend name.
    pub fn backend(&self) -> &str {
        self.store.name()
    }

    /// Returns the metrics recorder.
    pub fn metrics(&self) -> &CacheMetrics {
        &self.metrics
    }

    /// Closes the store connection, waiting at most `grace`.
    ///
    /// Called once from the process shutdown path.
    pub async fn shutdown(&self, grace: Duration) {
        self.store.shutdown(grace).await;
        self.metrics.record_state(self.store.state());
    }

    /// Stores `value` under `key` with the default TTL.
    pub async fn set<T>(&self, key: &str, value: &T) -> bool
    where
        T: Serialize + ?Sized,
    {
        self.write(key, value, self.default_ttl).await
    }

    /// Stores `value` under `key`, expiring after `ttl_secs` seconds.
    ///
    /// A zero TTL is refused and nothing is written.
    pub async fn set_with_ttl<T>(&self, key: &str, value: &T, ttl_secs: u64) -> bool
    where
        T: Serialize + ?Sized,
    {
        if ttl_secs == 0 {
            warn!(key, "Refusing cache write with zero TTL");
            return false;
        }
        self.write(key, value, Duration::from_secs(ttl_secs)).await
    }

    async fn write<T>(&self, key: &str, value: &T, ttl: Duration) -> bool
    where
        T: Serialize + ?Sized,
    {
        let start = Instant::now();

        let payload = match serde_json::to_string(&CacheEntry::new(value, ttl)) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(key, error = %e, "Failed to serialize cache value");
                return false;
            },
        };

        let result = self.store.set_ex(key, &payload, ttl).await;
        self.metrics.record_operation_duration("set", start.elapsed());

        match result {
            Ok(()) => {
                debug!(key, ttl_secs = ttl.as_secs(), "Cache entry written");
                true
            },
            Err(e) => {
                self.metrics.record_error("set");
                warn!(key, backend = self.store.name(), error = %e, "Cache write failed");
                false
            },
        }
    }

    /// Reads `key`, returning `None` on a miss, an expired entry, an
    /// unreachable store or a value that does not deserialize as `T`.
    pub async fn get<T>(&self, key: &str) -> Option<T>
    where
        T: DeserializeOwned,
    {
        let start = Instant::now();
        let result = self.store.get(key).await;
        self.metrics.record_operation_duration("get", start.elapsed());

        let raw = match result {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                self.metrics.record_miss();
                return None;
            },
            Err(e) => {
                self.metrics.record_error("get");
                self.metrics.record_miss();
                warn!(key, backend = self.store.name(), error = %e, "Cache read failed");
                return None;
            },
        };

        let value = match serde_json::from_str::<CacheEntry<T>>(&raw) {
            Ok(entry) => entry.into_fresh(),
            Err(e) => {
                self.metrics.record_decode_failure();
                debug!(key, error = %e, "Discarding undecodable cache value");
                None
            },
        };

        if value.is_some() {
            self.metrics.record_hit();
        } else {
            self.metrics.record_miss();
        }
        value
    }

    /// Removes `key`.
    pub async fn delete(&self, key: &str) -> bool {
        let start = Instant::now();
        let result = self.store.delete(&[key.to_string()]).await;
        self.metrics.record_operation_duration("delete", start.elapsed());

        match result {
            Ok(removed) => {
                self.metrics.record_invalidations(removed);
                debug!(key, removed, "Cache entry deleted");
                true
            },
            Err(e) => {
                self.metrics.record_error("delete");
                warn!(key, backend = self.store.name(), error = %e, "Cache delete failed");
                false
            },
        }
    }

    /// Removes every key matching a glob pattern in one batch.
    ///
    /// Zero matches is a successful no-op.
    pub async fn delete_by_pattern(&self, pattern: &str) -> bool {
        let start = Instant::now();

        let keys = match self.store.keys(pattern).await {
            Ok(keys) => keys,
            Err(e) => {
                self.metrics.record_error("delete_by_pattern");
                warn!(pattern, backend = self.store.name(), error = %e, "Cache key scan failed");
                return false;
            },
        };

        if keys.is_empty() {
            debug!(pattern, "No cache entries matched pattern");
            return true;
        }

        let result = self.store.delete(&keys).await;
        self.metrics
            .record_operation_duration("delete_by_pattern", start.elapsed());

        match result {
            Ok(removed) => {
                self.metrics.record_invalidations(removed);
                debug!(pattern, removed, "Cache entries deleted by pattern");
                true
            },
            Err(e) => {
                self.metrics.record_error("delete_by_pattern");
                warn!(pattern, matched = keys.len(), error = %e, "Cache pattern delete failed");
                false
            },
        }
    }

    /// Read-through lookup.
    ///
    /// Returns the cached value on a hit. On a miss, `init` is awaited
    /// against the authoritative source and a successful result is written
    /// back with `ttl_secs` before being returned. Errors from `init` are
    /// returned untouched and nothing is cached; cache failures only cost
    /// the write-back.
    ///
    /// Concurrent misses on the same key each run `init`.
    pub async fn get_or_compute<T, E, F, Fut>(
        &self,
        key: &str,
        ttl_secs: u64,
        init: F,
    ) -> Result<Fetched<T>, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(value) = self.get::<T>(key).await {
            return Ok(Fetched { value, hit: true });
        }

        let value = init().await?;
        self.set_with_ttl(key, &value, ttl_secs).await;

        Ok(Fetched { value, hit: false })
    }
}
