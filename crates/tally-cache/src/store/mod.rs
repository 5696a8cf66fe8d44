//! Key-value store backends.
//!
//! A store deals in raw strings; JSON handling, expiry envelopes and the
//! fail-open policy live in [`Cache`](crate::Cache).

mod memory;
mod redis_store;

use std::time::Duration;

use async_trait::async_trait;

use crate::connection::ConnectionState;
use crate::error::StoreError;

pub use self::memory::MemoryStore;
pub use self::redis_store::{RedisConnector, RedisStore};

/// A networked (or fake) key-value store with per-key expiry.
///
/// # Implementors
///
/// - `RedisStore` - Redis over a lazily managed multiplexed connection
/// - `MemoryStore` - in-process store for tests and single-node runs
/// - `DisabledStore` - refuses everything, for running without a cache
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Reads the raw value for `key`.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Writes `value` under `key`, expiring after `ttl`.
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError>;

    /// Deletes the given keys in one batch and returns how many existed.
    async fn delete(&self, keys: &[String]) -> Result<u64, StoreError>;

    /// Lists keys matching a glob-style pattern.
    async fn keys(&self, pattern: &str) -> Result<Vec<String>, StoreError>;

    /// Returns the connection state.
    fn state(&self) -> ConnectionState;

    /// Releases the connection. The default does nothing.
    async fn shutdown(&self, _grace: Duration) {}

    /// Returns the backend name for logging and health output.
    fn name(&self) -> &str;
}

/// Store used when caching is turned off or misconfigured.
///
/// Every operation fails, so the cache behaves as always-miss.
#[derive(Debug, Default, Clone)]
pub struct DisabledStore {
    reason: String,
}

impl DisabledStore {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    fn refuse(&self) -> StoreError {
        StoreError::unavailable(format!("cache disabled: {}", self.reason))
    }
}

#[async_trait]
impl KvStore for DisabledStore {
    async fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
        Err(self.refuse())
    }

    async fn set_ex(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<(), StoreError> {
        Err(self.refuse())
    }

    async fn delete(&self, _keys: &[String]) -> Result<u64, StoreError> {
        Err(self.refuse())
    }

    async fn keys(&self, _pattern: &str) -> Result<Vec<String>, StoreError> {
        Err(self.refuse())
    }

    fn state(&self) -> ConnectionState {
        ConnectionState::Disconnected
    }

    fn name(&self) -> &str {
        "disabled"
    }
}
