//! Cache entry management
//!
//! One [`CacheEntry`] binds a key to its constructed context, its immediate
//! parent key, and a usage counter. Children are not stored on the entry;
//! the [`HierarchyIndex`](crate::hierarchy::HierarchyIndex) maintains them
//! centrally so removal and traversal logic lives in one place.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::key::ContextKey;

/// A cached context with its hierarchy link and usage state
#[derive(Debug)]
pub struct CacheEntry<C> {
    /// The constructed context. The cache is the sole owner of this binding
    /// until the entry is removed or evicted.
    context: Arc<C>,

    /// Key of the immediate parent entry, if part of a hierarchy
    parent: Option<ContextKey>,

    /// Number of outstanding in-use chains passing through this key
    usage: u64,

    /// Entry metadata
    metadata: EntryMetadata,
}

impl<C> CacheEntry<C> {
    /// Create a new entry. The usage counter starts at 0; the store marks
    /// the entry in use as part of the acquire that created it.
    pub fn new(context: C, parent: Option<ContextKey>) -> Self {
        let now = Utc::now();
        Self {
            context: Arc::new(context),
            parent,
            usage: 0,
            metadata: EntryMetadata {
                created_at: now,
                accessed_at: now,
                access_count: 0,
            },
        }
    }

    /// Shared handle to the stored context.
    pub fn context(&self) -> Arc<C> {
        Arc::clone(&self.context)
    }

    /// Key of the immediate parent entry, if any.
    pub fn parent(&self) -> Option<&ContextKey> {
        self.parent.as_ref()
    }

    /// Current usage counter.
    pub fn usage(&self) -> u64 {
        self.usage
    }

    /// Whether this entry is part of an outstanding in-use chain.
    pub fn is_active(&self) -> bool {
        self.usage > 0
    }

    /// Entry metadata.
    pub fn metadata(&self) -> &EntryMetadata {
        &self.metadata
    }

    /// Record an acquire for this key: bumps the usage counter and the
    /// access metadata.
    pub fn mark_in_use(&mut self) {
        self.usage += 1;
        self.mark_accessed();
    }

    /// Update access metadata without touching the usage counter.
    pub fn mark_accessed(&mut self) {
        self.metadata.accessed_at = Utc::now();
        self.metadata.access_count += 1;
    }

    /// Decrement the usage counter. Returns `false` if the counter is
    /// already 0; the counter is never clamped below zero.
    pub fn try_release(&mut self) -> bool {
        if self.usage == 0 {
            return false;
        }
        self.usage -= 1;
        true
    }
}

/// Metadata associated with a cache entry
#[derive(Debug, Clone)]
pub struct EntryMetadata {
    /// When the entry was created
    pub created_at: DateTime<Utc>,

    /// Last access time (drives least-recently-used eviction order)
    pub accessed_at: DateTime<Utc>,

    /// Number of acquires served by this entry
    pub access_count: u64,
}
