//! System-of-record abstraction.
//!
//! The cache never substitutes for the source: every miss is answered from a
//! [`RecordSource`], and every write goes through it before the cache is
//! invalidated.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Errors raised by a record source.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The source could not be reached.
    #[error("record source unavailable: {0}")]
    Unavailable(String),

    /// The write was rejected.
    #[error("record rejected: {0}")]
    Rejected(String),
}

/// Identity of a stored document.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordId {
    pub company: String,
    pub collection: String,
    pub id: String,
}

impl RecordId {
    pub fn new(
        company: impl Into<String>,
        collection: impl Into<String>,
        id: impl Into<String>,
    ) -> Self {
        Self {
            company: company.into(),
            collection: collection.into(),
            id: id.into(),
        }
    }
}

/// A stored JSON document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    pub data: Value,
}

/// Authoritative storage for company documents.
///
/// # Implementors
///
/// - `MemoryRecords` - in-process map, used for tests and local runs
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Fetches one document.
    async fn fetch(&self, id: &RecordId) -> Result<Option<Record>, SourceError>;

    /// Lists documents of a collection ordered by id.
    async fn list(&self, company: &str, collection: &str) -> Result<Vec<Record>, SourceError>;

    /// Inserts or replaces a document. Returns true if it already existed.
    async fn upsert(&self, id: &RecordId, data: Value) -> Result<bool, SourceError>;

    /// Removes a document. Returns true if it existed.
    async fn remove(&self, id: &RecordId) -> Result<bool, SourceError>;

    /// Returns the name of this source for logging.
    fn name(&self) -> &str;
}

/// In-memory [`RecordSource`].
///
/// Counts reads so tests can tell a cache hit from a source round trip.
#[derive(Debug, Default)]
pub struct MemoryRecords {
    records: RwLock<BTreeMap<RecordId, Value>>,
    reads: AtomicU64,
}

impl MemoryRecords {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns how many fetch/list calls reached this source.
    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl RecordSource for MemoryRecords {
    async fn fetch(&self, id: &RecordId) -> Result<Option<Record>, SourceError> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        Ok(self.records.read().get(id).map(|data| Record {
            id: id.id.clone(),
            data: data.clone(),
        }))
    }

    async fn list(&self, company: &str, collection: &str) -> Result<Vec<Record>, SourceError> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        Ok(self
            .records
            .read()
            .iter()
            .filter(|(key, _)| key.company == company && key.collection == collection)
            .map(|(key, data)| Record {
                id: key.id.clone(),
                data: data.clone(),
            })
            .collect())
    }

    async fn upsert(&self, id: &RecordId, data: Value) -> Result<bool, SourceError> {
        if data.is_null() {
            return Err(SourceError::Rejected("document cannot be null".to_string()));
        }
        Ok(self.records.write().insert(id.clone(), data).is_some())
    }

    async fn remove(&self, id: &RecordId) -> Result<bool, SourceError> {
        Ok(self.records.write().remove(id).is_some())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
