//! Lock-free running counters for the mapping pipeline.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;

use crate::transform::CacheStats;

/// Running counters, updated with relaxed atomics from any thread.
#[derive(Debug, Default)]
pub struct MapperStats {
    processed: AtomicU64,
    matched: AtomicU64,
    unmatched: AtomicU64,
    failed: AtomicU64,
    allocations: AtomicU64,
    reuses: AtomicU64,
    processing_nanos: AtomicU64,
}

impl MapperStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_unmatched(&self) {
        self.unmatched.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_matched(&self) {
        self.matched.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_allocation(&self) {
        self.allocations.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_reuse(&self) {
        self.reuses.fetch_add(1, Ordering::Relaxed);
    }

    /// One matched item finished, successfully or not.
    pub(crate) fn record_processed(&self, elapsed: Duration) {
        self.processed.fetch_add(1, Ordering::Relaxed);
        let nanos = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        self.processing_nanos.fetch_add(nanos, Ordering::Relaxed);
    }

    /// Point-in-time copy; transform cache counters are supplied by the caller.
    pub fn snapshot(&self, cache: CacheStats) -> StatsSnapshot {
        StatsSnapshot {
            processed: self.processed.load(Ordering::Relaxed),
            matched: self.matched.load(Ordering::Relaxed),
            unmatched: self.unmatched.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            cache_hits: cache.hits,
            cache_misses: cache.misses,
            allocations: self.allocations.load(Ordering::Relaxed),
            reuses: self.reuses.load(Ordering::Relaxed),
            processing_nanos: self.processing_nanos.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        for counter in [
            &self.processed,
            &self.matched,
            &self.unmatched,
            &self.failed,
            &self.allocations,
            &self.reuses,
            &self.processing_nanos,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

/// Copy of the pipeline counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    /// Matched items that ran to completion or failure
    pub processed: u64,
    pub matched: u64,
    /// Paths no pattern routed
    pub unmatched: u64,
    /// Transform or setter failures
    pub failed: u64,
    /// Transform result cache hits
    pub cache_hits: u64,
    /// Transform result cache misses
    pub cache_misses: u64,
    /// Instances built by a type factory
    pub allocations: u64,
    /// Instances taken from the pool
    pub reuses: u64,
    pub processing_nanos: u64,
}

impl StatsSnapshot {
    /// Mean time per processed item, in nanoseconds.
    pub fn avg_latency_nanos(&self) -> u64 {
        self.processing_nanos.checked_div(self.processed).unwrap_or(0)
    }

    /// Transform cache hit rate in percent.
    pub fn cache_hit_rate(&self) -> f64 {
        percent(self.cache_hits, self.cache_hits + self.cache_misses)
    }

    /// Pool reuse rate in percent.
    pub fn reuse_rate(&self) -> f64 {
        percent(self.reuses, self.allocations + self.reuses)
    }
}

fn percent(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 * 100.0 / total as f64
    }
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.processed == 0 && self.unmatched == 0 {
            return f.write_str("Stats: no data processed");
        }
        write!(
            f,
            "Stats: {} processed, {} matched, {} unmatched, {} failed | \
             Cache: {} hits, {} misses ({:.1}% hit rate) | \
             Memory: {} allocs, {} reused ({:.1}% reuse rate) | \
             Avg latency: {}ns",
            self.processed,
            self.matched,
            self.unmatched,
            self.failed,
            self.cache_hits,
            self.cache_misses,
            self.cache_hit_rate(),
            self.allocations,
            self.reuses,
            self.reuse_rate(),
            self.avg_latency_nanos(),
        )
    }
}
