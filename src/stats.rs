//! Cache statistics snapshot

use std::fmt;

use serde::{Deserialize, Serialize};

/// Point-in-time statistics snapshot for the cache.
///
/// `hit_count` and `miss_count` are monotonically non-decreasing for the
/// cache's lifetime; removal never alters them. `size`,
/// `active_context_count` and `parent_context_count` are structural counts
/// recomputed from the current storage state under the cache lock, so every
/// snapshot is consistent as of one serialization point.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Number of distinct keys currently stored
    pub size: usize,

    /// Number of stored keys whose usage counter is > 0
    pub active_context_count: usize,

    /// Total number of cache hits
    pub hit_count: u64,

    /// Total number of cache misses
    pub miss_count: u64,

    /// Number of stored keys that parent at least one other stored key
    pub parent_context_count: usize,
}

impl CacheStats {
    /// Cache hit rate as a ratio between 0.0 and 1.0.
    ///
    /// Returns 0.0 if there have been no lookups.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hit_count + self.miss_count;
        if total == 0 {
            0.0
        } else {
            self.hit_count as f64 / total as f64
        }
    }

    /// Total number of lookups (hits + misses).
    pub fn total_accesses(&self) -> u64 {
        self.hit_count + self.miss_count
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CacheStats {{ size: {}, active: {}, hits: {}, misses: {}, hit_rate: {:.2}%, parents: {} }}",
            self.size,
            self.active_context_count,
            self.hit_count,
            self.miss_count,
            self.hit_rate() * 100.0,
            self.parent_context_count
        )
    }
}
