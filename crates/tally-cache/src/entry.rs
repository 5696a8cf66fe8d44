//! Stored cache entry envelope.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// The JSON document actually written to the store.
///
/// The absolute expiry travels with the value, so an entry past its TTL is
/// treated as absent even if the store hands it back (clock skew, a store
/// without eviction, a restored snapshot).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry<T> {
    /// The cached value.
    pub value: T,
    /// Expiry as milliseconds since the Unix epoch.
    pub expires_at: u64,
}

impl<T> CacheEntry<T> {
    /// Wraps a value that expires `ttl` from now.
    pub fn new(value: T, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: now_millis().saturating_add(ttl.as_millis() as u64),
        }
    }

    /// Returns true if the entry is past its expiry.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(now_millis())
    }

    /// Returns true if the entry is expired at the given epoch milliseconds.
    pub fn is_expired_at(&self, now_ms: u64) -> bool {
        now_ms >= self.expires_at
    }

    /// Unwraps the value if it is still fresh.
    pub fn into_fresh(self) -> Option<T> {
        if self.is_expired() {
            None
        } else {
            Some(self.value)
        }
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_wire_format() {
        let entry = CacheEntry {
            value: serde_json::json!({"balance": 10}),
            expires_at: 1_700_000_000_000,
        };
        let json = serde_json::to_string(&entry).unwrap();
        assert_eq!(json, r#"{"value":{"balance":10},"expiresAt":1700000000000}"#);
    }

    #[test]
    fn test_entry_expiry() {
        let entry = CacheEntry::new("x", Duration::from_secs(60));
        assert!(!entry.is_expired());
        assert!(entry.is_expired_at(entry.expires_at));
        assert!(!entry.is_expired_at(entry.expires_at - 1));
        assert_eq!(entry.into_fresh(), Some("x"));
    }

    #[test]
    fn test_stale_entry_is_not_fresh() {
        let entry = CacheEntry {
            value: 5,
            expires_at: 1,
        };
        assert!(entry.is_expired());
        assert_eq!(entry.into_fresh(), None);
    }
}
