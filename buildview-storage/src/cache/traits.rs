//! Cache store trait and statistics.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use buildview_core::{CacheKey, StoreError};

/// Low-latency key/value tier.
///
/// Implementations must be safe for concurrent use by many in-flight
/// resolutions. A clean miss is `Ok(None)`; `Err` is reserved for failures
/// of the backend itself, so callers can tell "not there" from "could not
/// ask".
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Get the value stored under `key`.
    async fn get(&self, key: &CacheKey) -> Result<Option<Vec<u8>>, StoreError>;

    /// Read a time-ordered index most-recent-first.
    ///
    /// `start` and `stop` are inclusive positions in the descending order,
    /// matching a sorted-set reverse range. A missing index, or a range past
    /// its end, yields an empty sequence.
    async fn rev_range(
        &self,
        key: &CacheKey,
        start: usize,
        stop: usize,
    ) -> Result<Vec<String>, StoreError>;
}

/// Statistics about cache usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of lookups that found a value.
    pub hits: u64,
    /// Number of lookups that found nothing.
    pub misses: u64,
    /// Number of lookups that failed.
    pub errors: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0) over successful lookups.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Lock-free counters behind [`CacheStats`].
#[derive(Debug, Default)]
pub(crate) struct StatsCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    errors: AtomicU64,
}

impl StatsCounters {
    pub(crate) fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

/// Apply an inclusive reverse-range window to an already descending list.
pub(crate) fn window<T>(descending: Vec<T>, start: usize, stop: usize) -> Vec<T> {
    if start > stop {
        return Vec::new();
    }
    descending
        .into_iter()
        .skip(start)
        .take((stop - start).saturating_add(1))
        .collect()
}
