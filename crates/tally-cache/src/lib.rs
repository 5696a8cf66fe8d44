//! # Tally Cache
//!
//! Fail-open read-through cache for the Tally backend.
//!
//! The crate wraps a networked key-value store (Redis) behind a small adapter
//! whose operations never fail the caller: every store or serialization error
//! degrades to a cache miss or a `false` return, and is logged and counted.
//!
//! ## Features
//!
//! - JSON envelopes with an absolute expiry, so stale entries read as misses
//! - Lazy connection with a bounded linear backoff and a hard retry budget
//! - Explicit connection state machine driven by a single event entry point
//! - Glob-pattern bulk invalidation over colon-delimited keys
//! - An in-memory store for tests and single-node deployments
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tally_cache::{Cache, CacheKey, MemoryStore};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let cache = Cache::new(Arc::new(MemoryStore::new()));
//! let key = CacheKey::new("company").push("42").push("accounts");
//!
//! cache.set(key.as_str(), &vec!["cash", "receivables"]).await;
//! let accounts: Option<Vec<String>> = cache.get(key.as_str()).await;
//!
//! cache.delete_by_pattern(&CacheKey::new("company").push("42").pattern()).await;
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod connection;
pub mod entry;
pub mod error;
pub mod invalidation;
pub mod keys;
pub mod metrics;
pub mod store;

// Re-exports
pub use cache::{Cache, DEFAULT_TTL_SECS, Fetched};
pub use config::StoreConfig;
pub use connection::{
    ConnectionEvent, ConnectionLifecycle, ConnectionManager, ConnectionState, Connector,
    RetryBudget, RetryPolicy, Transition,
};
pub use entry::CacheEntry;
pub use error::StoreError;
pub use invalidation::{Invalidation, Target};
pub use keys::CacheKey;
pub use self::metrics::{CacheMetrics, register_cache_metrics};
pub use store::{DisabledStore, KvStore, MemoryStore, RedisConnector, RedisStore};
