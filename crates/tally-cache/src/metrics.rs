//! Cache metrics recording.

use metrics::{counter, gauge, histogram};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::connection::ConnectionState;

/// Registers metric descriptions. Call once at startup.
pub fn register_cache_metrics() {
    metrics::describe_counter!("tally_cache_hits_total", "Total number of cache hits");
    metrics::describe_counter!("tally_cache_misses_total", "Total number of cache misses");
    metrics::describe_counter!(
        "tally_cache_errors_total",
        "Store failures swallowed by the cache adapter"
    );
    metrics::describe_counter!(
        "tally_cache_decode_failures_total",
        "Cached values that could not be deserialized"
    );
    metrics::describe_counter!(
        "tally_cache_invalidations_total",
        "Keys removed by explicit or pattern invalidation"
    );
    metrics::describe_gauge!(
        "tally_cache_connection_state",
        "Store connection state (0=disconnected 1=connecting 2=ready 3=reconnecting 4=failed)"
    );
    metrics::describe_histogram!(
        "tally_cache_operation_seconds",
        "Time spent on cache operations"
    );
}

/// Recorder for cache metrics.
///
/// Keeps local atomic counters alongside the global `metrics` facade so hit
/// rate and error counts can be read back without a recorder installed.
#[derive(Debug, Clone, Default)]
pub struct CacheMetrics {
    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
    errors: Arc<AtomicU64>,
}

impl CacheMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a cache hit
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
        counter!("tally_cache_hits_total").increment(1);
    }

    /// Records a cache miss
    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
        counter!("tally_cache_misses_total").increment(1);
    }

    /// Records a store failure that was degraded to a miss/false.
    pub fn record_error(&self, operation: &'static str) {
        self.errors.fetch_add(1, Ordering::Relaxed);
        counter!("tally_cache_errors_total", "operation" => operation).increment(1);
    }

    /// Records a value that failed to deserialize.
    pub fn record_decode_failure(&self) {
        counter!("tally_cache_decode_failures_total").increment(1);
    }

    /// Records removed keys.
    pub fn record_invalidations(&self, count: u64) {
        counter!("tally_cache_invalidations_total").increment(count);
    }

    /// Publishes the connection state gauge.
    pub fn record_state(&self, state: ConnectionState) {
        gauge!("tally_cache_connection_state").set(state.as_gauge());
    }

    /// Records the duration of an operation
    pub fn record_operation_duration(&self, operation: &'static str, duration: Duration) {
        histogram!("tally_cache_operation_seconds", "operation" => operation)
            .record(duration.as_secs_f64());
    }

    /// Hit rate over the lifetime of this recorder.
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits.load(Ordering::Relaxed) as f64;
        let misses = self.misses.load(Ordering::Relaxed) as f64;
        let total = hits + misses;
        if total == 0.0 { 0.0 } else { hits / total }
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_metrics_hit_rate() {
        let metrics = CacheMetrics::new();

        // 3 hits, 1 miss = 75% hit rate
        metrics.record_hit();
        metrics.record_hit();
        metrics.record_hit();
        metrics.record_miss();

        let rate = metrics.hit_rate();
        assert!((rate - 0.75).abs() < 0.001);
    }

    #[test]
    fn test_counters_shared_between_clones() {
        let metrics = CacheMetrics::new();
        let clone = metrics.clone();

        clone.record_hit();
        clone.record_error("get");
        metrics.record_miss();

        assert_eq!(metrics.hits(), 1);
        assert_eq!(metrics.misses(), 1);
        assert_eq!(metrics.errors(), 1);
    }

    #[test]
    fn test_empty_hit_rate() {
        assert_eq!(CacheMetrics::new().hit_rate(), 0.0);
    }
}
