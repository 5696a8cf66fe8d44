#![allow(dead_code)]
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use tally_cache::{Cache, Connector, MemoryStore, StoreError};

/// Cache over a fresh in-memory store, returning both.
pub fn memory_cache() -> (Cache, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    (Cache::new(store.clone()), store)
}

/// Connector that always refuses and counts attempts.
#[derive(Clone, Default)]
pub struct RefusingConnector {
    pub attempts: Arc<AtomicU32>,
}

impl RefusingConnector {
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for RefusingConnector {
    type Connection = ();

    async fn connect(&self) -> Result<(), StoreError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(StoreError::connection("connection refused"))
    }

    fn name(&self) -> &str {
        "refusing"
    }
}
