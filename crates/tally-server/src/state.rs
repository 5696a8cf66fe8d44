//! Application state.

use std::sync::Arc;

use tally_cache::Cache;

use crate::source::{MemoryRecords, RecordSource};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    cache: Cache,
    records: Arc<dyn RecordSource>,
}

impl AppState {
    pub fn new(cache: Cache, records: Arc<dyn RecordSource>) -> Self {
        Self { cache, records }
    }

    /// Creates an AppState backed by an empty [`MemoryRecords`].
    pub fn with_memory_records(cache: Cache) -> Self {
        Self::new(cache, Arc::new(MemoryRecords::new()))
    }

    pub fn cache(&self) -> &Cache {
        &self.cache
    }

    /// Returns the system of record.
    pub fn records(&self) -> &dyn RecordSource {
        self.records.as_ref()
    }
}
