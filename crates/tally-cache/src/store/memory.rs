//! In-process store backed by Moka.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use glob::Pattern;
use moka::Expiry;
use moka::future::Cache;

use super::KvStore;
use crate::connection::ConnectionState;
use crate::error::StoreError;

/// Default maximum number of entries.
const DEFAULT_CAPACITY: u64 = 10_000;

#[derive(Debug, Clone)]
struct Stored {
    payload: Arc<str>,
    ttl: Duration,
}

/// Expires each entry after the TTL it was written with.
struct PerEntryTtl;

impl Expiry<String, Stored> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &Stored,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &Stored,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// Key-value store held in process memory.
///
/// Honors per-key TTLs and glob key listing like Redis does. It can be marked
/// unreachable to exercise the fail-open paths of the cache.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use tally_cache::{KvStore, MemoryStore};
///
/// # #[tokio::main]
/// # async fn main() {
/// let store = MemoryStore::new();
/// store.set_ex("k", "v", Duration::from_secs(60)).await.unwrap();
/// assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));
///
/// store.set_available(false);
/// assert!(store.get("k").await.is_err());
/// # }
/// ```
pub struct MemoryStore {
    inner: Cache<String, Stored>,
    available: AtomicBool,
}

impl MemoryStore {
    /// Creates a store holding up to 10 000 entries.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Creates a store with the given maximum number of entries.
    pub fn with_capacity(max_capacity: u64) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(max_capacity)
                .expire_after(PerEntryTtl)
                .build(),
            available: AtomicBool::new(true),
        }
    }

    /// Simulates the store becoming reachable or unreachable.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Returns the approximate number of entries.
    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }

    /// Returns true if `key` is present, bypassing the availability switch.
    pub async fn contains(&self, key: &str) -> bool {
        self.inner.get(key).await.is_some()
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::connection("memory store marked unreachable"))
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.check()?;
        Ok(self.inner.get(key).await.map(|s| s.payload.to_string()))
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        self.check()?;
        self.inner
            .insert(
                key.to_string(),
                Stored {
                    payload: Arc::from(value),
                    ttl,
                },
            )
            .await;
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> Result<u64, StoreError> {
        self.check()?;
        let mut removed = 0;
        for key in keys {
            if self.inner.remove(key.as_str()).await.is_some() {
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, StoreError> {
        self.check()?;
        let pattern = Pattern::new(pattern)
            .map_err(|e| StoreError::command(format!("invalid pattern '{}': {}", pattern, e)))?;

        let mut matched: Vec<String> = self
            .inner
            .iter()
            .filter(|(key, _)| pattern.matches(key))
            .map(|(key, _)| (*key).clone())
            .collect();
        matched.sort();
        Ok(matched)
    }

    fn state(&self) -> ConnectionState {
        if self.available.load(Ordering::SeqCst) {
            ConnectionState::Ready
        } else {
            ConnectionState::Failed
        }
    }

    fn name(&self) -> &str {
        "memory"
    }
}
