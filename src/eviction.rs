//! Pluggable eviction policies
//!
//! A policy is consulted by the store after every successful acquire or
//! release and may nominate keys for removal to enforce a size bound.
//! Victims are removed through the same subtree-removal path as an explicit
//! `remove`, so eviction never orphans reachable descendants. The store
//! enforces the safety rule: a victim whose subtree contains any in-use
//! entry is skipped.

use chrono::{DateTime, Utc};

use crate::key::ContextKey;

/// Snapshot of one stored entry offered to the eviction policy
#[derive(Debug, Clone)]
pub struct EvictionCandidate {
    /// Key of the stored entry
    pub key: ContextKey,

    /// Current usage counter
    pub usage: u64,

    /// Last access time
    pub accessed_at: DateTime<Utc>,
}

/// Strategy that bounds the cache size
pub trait EvictionPolicy: Send + Sync {
    /// Nominate keys for removal given the current size and a snapshot of
    /// every stored entry. Nominating a key with usage > 0 has no effect;
    /// the store refuses such victims.
    fn select_victims(&self, size: usize, candidates: &[EvictionCandidate]) -> Vec<ContextKey>;
}

/// Leaves the cache unbounded
#[derive(Debug, Default)]
pub struct NoEviction;

impl EvictionPolicy for NoEviction {
    fn select_victims(&self, _size: usize, _candidates: &[EvictionCandidate]) -> Vec<ContextKey> {
        Vec::new()
    }
}

/// Evicts least-recently-used inactive contexts once the cache exceeds
/// `max_contexts` entries.
#[derive(Debug)]
pub struct LruEviction {
    max_contexts: usize,
}

impl LruEviction {
    pub fn new(max_contexts: usize) -> Self {
        Self { max_contexts }
    }
}

impl EvictionPolicy for LruEviction {
    fn select_victims(&self, size: usize, candidates: &[EvictionCandidate]) -> Vec<ContextKey> {
        if size <= self.max_contexts {
            return Vec::new();
        }

        let mut idle: Vec<&EvictionCandidate> =
            candidates.iter().filter(|c| c.usage == 0).collect();
        idle.sort_by_key(|c| c.accessed_at);

        let excess = size - self.max_contexts;
        idle.into_iter()
            .take(excess)
            .map(|c| c.key.clone())
            .collect()
    }
}
