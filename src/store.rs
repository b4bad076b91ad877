//! Main cache store: acquire, release, hierarchical removal and statistics
//!
//! The cache is an explicitly constructed component handed to the
//! orchestrator; there is no global instance. All mutation and every
//! statistics read serialize on one mutex scoped to the whole cache:
//! construction cost dominates by orders of magnitude, so coarse locking is
//! the intended discipline. The lock is held across the factory future on a
//! miss, which makes the at-most-one-construction guarantee structural -
//! a second concurrent acquire for the same key parks on the lock and then
//! observes the committed entry as a hit.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::CacheConfig;
use crate::entry::CacheEntry;
use crate::error::{CacheError, Result};
use crate::eviction::{EvictionCandidate, EvictionPolicy, LruEviction, NoEviction};
use crate::hierarchy::HierarchyIndex;
use crate::key::ContextKey;
use crate::stats::CacheStats;

/// Scope of a hierarchical removal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HierarchyMode {
    /// Remove the key and every reachable descendant. Ancestors are left
    /// untouched, even if the removed key was their only remaining child.
    CurrentLevel,

    /// Remove the entire connected tree containing the key: climb to the
    /// root ancestor, then remove that root and every descendant of it.
    Exhaustive,
}

/// A binding deleted from the cache.
///
/// The cache does not know how to tear a context down; disposal of the
/// underlying resources belongs to whoever receives this.
#[derive(Debug)]
pub struct RemovedContext<C> {
    pub key: ContextKey,
    pub context: Arc<C>,
}

impl<C> Clone for RemovedContext<C> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            context: Arc::clone(&self.context),
        }
    }
}

type Disposer<C> = Arc<dyn Fn(&ContextKey, &Arc<C>) + Send + Sync>;

/// Hierarchy-aware context cache
///
/// Generic over the context type `C`, which is opaque to the cache: stored
/// contexts are shared read-only handles, never mutated, only mapped and
/// unmapped.
pub struct ContextCache<C> {
    /// Cache configuration
    config: CacheConfig,

    /// Internal storage
    store: Arc<Mutex<CacheStore<C>>>,

    /// Eviction policy, consulted after every successful acquire/release
    eviction_policy: Arc<dyn EvictionPolicy>,

    /// Optional disposal callback, invoked once per deleted binding on
    /// every deletion path (remove, eviction, clear), after the cache
    /// lock has been released
    disposer: Option<Disposer<C>>,
}

/// Internal cache storage
struct CacheStore<C> {
    /// Main storage: key -> entry
    entries: HashMap<ContextKey, CacheEntry<C>>,

    /// Central parent/child index over stored keys
    hierarchy: HierarchyIndex,

    /// Total cache hits, monotonic for the cache lifetime
    hit_count: u64,

    /// Total cache misses, monotonic for the cache lifetime
    miss_count: u64,
}

impl<C> ContextCache<C> {
    /// Create a new cache. A `max_contexts` bound in the configuration
    /// wires the least-recently-used eviction policy; otherwise the cache
    /// is unbounded.
    pub fn new(config: CacheConfig) -> Self {
        let policy: Arc<dyn EvictionPolicy> = match config.max_contexts {
            Some(max) => Arc::new(LruEviction::new(max)),
            None => Arc::new(NoEviction),
        };
        Self::with_eviction_policy(config, policy)
    }

    /// Create a cache with a custom eviction policy.
    pub fn with_eviction_policy(config: CacheConfig, policy: Arc<dyn EvictionPolicy>) -> Self {
        info!(max_contexts = ?config.max_contexts, "initializing context cache");
        Self {
            config,
            store: Arc::new(Mutex::new(CacheStore {
                entries: HashMap::new(),
                hierarchy: HierarchyIndex::new(),
                hit_count: 0,
                miss_count: 0,
            })),
            eviction_policy: policy,
            disposer: None,
        }
    }

    /// Register a disposal callback, invoked once for every binding the
    /// cache deletes, whether through `remove`, eviction, or `clear`.
    ///
    /// The callback runs after the internal lock is released, so it may
    /// itself call back into the cache.
    pub fn on_removal(
        mut self,
        disposer: impl Fn(&ContextKey, &Arc<C>) + Send + Sync + 'static,
    ) -> Self {
        self.disposer = Some(Arc::new(disposer));
        self
    }

    /// Cache configuration.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Get the context for `key`, constructing it on a miss.
    ///
    /// On a hit the stored context is returned, the hit counter moves, and
    /// the usage counter of `key` is incremented; the `parent` argument is
    /// ignored since the stored linkage is authoritative. On a miss the
    /// factory runs exactly once under the cache lock; its failure
    /// propagates as [`CacheError::Construction`] with no entry committed
    /// (the miss is still counted - the lookup did miss).
    ///
    /// `parent` must name a context acquired earlier: the orchestrator
    /// resolves ancestors top-down before requesting a descendant. A
    /// non-cached parent is [`CacheError::UnknownParent`].
    pub async fn acquire<F, Fut>(
        &self,
        key: &ContextKey,
        parent: Option<&ContextKey>,
        factory: F,
    ) -> Result<Arc<C>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<C>>,
    {
        let mut guard = self.store.lock().await;
        let store = &mut *guard;

        if let Some(entry) = store.entries.get_mut(key) {
            store.hit_count += 1;
            entry.mark_in_use();
            let context = entry.context();
            debug!(%key, usage = entry.usage(), "context cache hit");
            let evicted = self.apply_eviction(store);
            drop(guard);
            self.dispose_all(&evicted);
            return Ok(context);
        }

        if let Some(parent) = parent {
            if !store.entries.contains_key(parent) {
                return Err(CacheError::UnknownParent {
                    parent: parent.clone(),
                });
            }
        }

        store.miss_count += 1;
        debug!(%key, "context cache miss, constructing");

        let context = factory().await.map_err(CacheError::Construction)?;

        let mut entry = CacheEntry::new(context, parent.cloned());
        entry.mark_in_use();
        let handle = entry.context();
        if let Some(parent) = parent {
            store.hierarchy.link(parent, key);
        }
        store.entries.insert(key.clone(), entry);
        let evicted = self.apply_eviction(store);
        drop(guard);
        self.dispose_all(&evicted);
        Ok(handle)
    }

    /// Release one in-use chain: decrements the usage counter of `key` and
    /// of every stored ancestor on its chain.
    ///
    /// Never removes entries. Releasing a key that is not cached, or a
    /// chain with any counter already at 0, is
    /// [`CacheError::UsageUnderflow`]; in that case no counter is modified.
    pub async fn release(&self, key: &ContextKey) -> Result<()> {
        let mut guard = self.store.lock().await;
        let store = &mut *guard;

        let Some(first) = store.entries.get(key) else {
            warn!(%key, "release of a context that is not cached");
            return Err(CacheError::UsageUnderflow { key: key.clone() });
        };

        // Collect the chain: the key plus every ancestor still stored. A
        // missing ancestor terminates the walk (dangling parent references
        // are tolerated transiently during teardown).
        let mut chain = vec![key.clone()];
        let mut parent = first.parent().cloned();
        while let Some(next) = parent {
            match store.entries.get(&next) {
                Some(entry) => {
                    parent = entry.parent().cloned();
                    chain.push(next);
                }
                None => break,
            }
        }

        // Verify the whole chain before touching any counter.
        let underflow = chain
            .iter()
            .find(|k| store.entries.get(*k).map_or(true, |e| e.usage() == 0));
        if let Some(offender) = underflow {
            warn!(key = %offender, "usage underflow on release");
            return Err(CacheError::UsageUnderflow {
                key: offender.clone(),
            });
        }

        for k in &chain {
            if let Some(entry) = store.entries.get_mut(k) {
                entry.try_release();
            }
        }
        debug!(%key, chain = chain.len(), "released usage chain");

        let evicted = self.apply_eviction(store);
        drop(guard);
        self.dispose_all(&evicted);
        Ok(())
    }

    /// Remove cached contexts reachable from `key` under the given mode.
    ///
    /// Removing a key that is not cached is a no-op. Hit/miss counters are
    /// never altered by removal. Every deleted binding is returned, and the
    /// registered disposer (if any) has already been invoked for it.
    pub async fn remove(&self, key: &ContextKey, mode: HierarchyMode) -> Vec<RemovedContext<C>> {
        let mut guard = self.store.lock().await;
        let store = &mut *guard;

        if !store.entries.contains_key(key) {
            return Vec::new();
        }

        let root = match mode {
            HierarchyMode::CurrentLevel => key.clone(),
            HierarchyMode::Exhaustive => Self::root_of(store, key),
        };

        let removed = Self::remove_tree(store, &root);
        debug!(%key, ?mode, removed = removed.len(), "removed context hierarchy");
        drop(guard);
        self.dispose_all(&removed);
        removed
    }

    /// Consistent statistics snapshot as of one serialization point.
    pub async fn statistics(&self) -> CacheStats {
        let store = self.store.lock().await;
        CacheStats {
            size: store.entries.len(),
            active_context_count: store.entries.values().filter(|e| e.is_active()).count(),
            hit_count: store.hit_count,
            miss_count: store.miss_count,
            parent_context_count: store.hierarchy.parent_count(),
        }
    }

    /// Check whether a key is cached, without touching counters.
    pub async fn contains(&self, key: &ContextKey) -> bool {
        self.store.lock().await.entries.contains_key(key)
    }

    /// Number of cached contexts.
    pub async fn len(&self) -> usize {
        self.store.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.store.lock().await.entries.is_empty()
    }

    /// Remove every cached context. Hit/miss counters are not reset.
    pub async fn clear(&self) -> Vec<RemovedContext<C>> {
        let mut guard = self.store.lock().await;
        let store = &mut *guard;

        let keys: Vec<ContextKey> = store.entries.keys().cloned().collect();
        let mut removed = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(entry) = store.entries.remove(&key) {
                let context = entry.context();
                removed.push(RemovedContext { key, context });
            }
        }
        store.hierarchy.clear();
        info!(cleared = removed.len(), "cleared context cache");
        drop(guard);
        self.dispose_all(&removed);
        removed
    }

    /// Walk stored parent links up to the root ancestor of `key`.
    fn root_of(store: &CacheStore<C>, key: &ContextKey) -> ContextKey {
        let mut current = key.clone();
        loop {
            let parent = store
                .entries
                .get(&current)
                .and_then(|entry| entry.parent().cloned());
            match parent {
                Some(p) if store.entries.contains_key(&p) => current = p,
                _ => return current,
            }
        }
    }

    /// Delete `root` and every reachable descendant as one operation,
    /// unlinking the hierarchy index. Disposal happens at the caller once
    /// the lock is released.
    fn remove_tree(store: &mut CacheStore<C>, root: &ContextKey) -> Vec<RemovedContext<C>> {
        let doomed = store.hierarchy.collect_tree(root);
        let mut removed = Vec::with_capacity(doomed.len());
        for key in doomed {
            if let Some(entry) = store.entries.remove(&key) {
                store.hierarchy.remove_key(&key, entry.parent());
                let context = entry.context();
                removed.push(RemovedContext { key, context });
            }
        }
        removed
    }

    /// Consult the eviction policy and apply its victims through the
    /// subtree-removal path, returning every evicted binding for disposal
    /// after the lock drops. A victim whose subtree contains any in-use
    /// entry is refused regardless of what the policy nominated.
    fn apply_eviction(&self, store: &mut CacheStore<C>) -> Vec<RemovedContext<C>> {
        let mut all_evicted = Vec::new();
        loop {
            let candidates: Vec<EvictionCandidate> = store
                .entries
                .iter()
                .map(|(key, entry)| EvictionCandidate {
                    key: key.clone(),
                    usage: entry.usage(),
                    accessed_at: entry.metadata().accessed_at,
                })
                .collect();

            let victims = self
                .eviction_policy
                .select_victims(store.entries.len(), &candidates);
            if victims.is_empty() {
                return all_evicted;
            }

            let mut evicted_any = false;
            for victim in victims {
                if !store.entries.contains_key(&victim) {
                    continue;
                }
                if !Self::subtree_inactive(store, &victim) {
                    continue;
                }
                let evicted = Self::remove_tree(store, &victim);
                debug!(key = %victim, evicted = evicted.len(), "evicted context subtree");
                evicted_any = evicted_any || !evicted.is_empty();
                all_evicted.extend(evicted);
            }

            // Subtree eviction can remove more than the policy saw; consult
            // again until it has nothing further to say.
            if !evicted_any {
                return all_evicted;
            }
        }
    }

    fn subtree_inactive(store: &CacheStore<C>, key: &ContextKey) -> bool {
        store
            .hierarchy
            .collect_tree(key)
            .iter()
            .all(|k| store.entries.get(k).map_or(true, |e| !e.is_active()))
    }

    fn dispose_all(&self, removed: &[RemovedContext<C>]) {
        if let Some(disposer) = &self.disposer {
            for binding in removed {
                disposer(&binding.key, &binding.context);
            }
        }
    }
}

impl<C> Clone for ContextCache<C> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            store: Arc::clone(&self.store),
            eviction_policy: Arc::clone(&self.eviction_policy),
            disposer: self.disposer.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::ContextDescriptor;

    fn key(name: &str) -> ContextKey {
        ContextDescriptor::builder()
            .loader("AnnotationConfigLoader")
            .component(name)
            .build()
            .derive_key()
    }

    async fn build(name: &str) -> anyhow::Result<String> {
        Ok(format!("context:{name}"))
    }

    #[tokio::test]
    async fn test_acquire_miss_then_hit() {
        let cache = ContextCache::new(CacheConfig::default());
        let root = key("root");

        let first = cache.acquire(&root, None, || build("root")).await.unwrap();
        assert_eq!(*first, "context:root");

        let second = cache.acquire(&root, None, || build("other")).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        let stats = cache.statistics().await;
        assert_eq!(stats.size, 1);
        assert_eq!(stats.hit_count, 1);
        assert_eq!(stats.miss_count, 1);
        assert_eq!(stats.active_context_count, 1);
    }

    #[tokio::test]
    async fn test_factory_failure_commits_nothing() {
        let cache: ContextCache<String> = ContextCache::new(CacheConfig::default());
        let root = key("root");

        let result = cache
            .acquire(&root, None, || async { anyhow::bail!("wiring failed") })
            .await;
        assert!(matches!(result, Err(CacheError::Construction(_))));

        let stats = cache.statistics().await;
        assert_eq!(stats.size, 0);
        assert_eq!(stats.miss_count, 1);
        assert!(!cache.contains(&root).await);

        // The key is buildable afterwards.
        cache.acquire(&root, None, || build("root")).await.unwrap();
        let stats = cache.statistics().await;
        assert_eq!(stats.size, 1);
        assert_eq!(stats.miss_count, 2);
    }

    #[tokio::test]
    async fn test_unknown_parent_is_rejected() {
        let cache: ContextCache<String> = ContextCache::new(CacheConfig::default());
        let child = key("child");
        let ghost = key("ghost");

        let result = cache
            .acquire(&child, Some(&ghost), || build("child"))
            .await;
        assert!(matches!(result, Err(CacheError::UnknownParent { .. })));

        // An invalid call is not a lookup; no counters moved.
        let stats = cache.statistics().await;
        assert_eq!(stats.miss_count, 0);
        assert_eq!(stats.size, 0);
    }

    #[tokio::test]
    async fn test_release_decrements_whole_chain() {
        let cache = ContextCache::new(CacheConfig::default());
        let root = key("root");
        let leaf = key("leaf");

        cache.acquire(&root, None, || build("root")).await.unwrap();
        cache
            .acquire(&leaf, Some(&root), || build("leaf"))
            .await
            .unwrap();
        assert_eq!(cache.statistics().await.active_context_count, 2);

        cache.release(&leaf).await.unwrap();
        let stats = cache.statistics().await;
        assert_eq!(stats.active_context_count, 0);
        assert_eq!(stats.size, 2);
    }

    #[tokio::test]
    async fn test_double_release_is_underflow() {
        let cache = ContextCache::new(CacheConfig::default());
        let root = key("root");

        cache.acquire(&root, None, || build("root")).await.unwrap();
        cache.release(&root).await.unwrap();

        let result = cache.release(&root).await;
        assert!(matches!(result, Err(CacheError::UsageUnderflow { .. })));
        // Counter untouched by the failed release.
        assert_eq!(cache.statistics().await.active_context_count, 0);
    }

    #[tokio::test]
    async fn test_release_of_uncached_key_is_underflow() {
        let cache: ContextCache<String> = ContextCache::new(CacheConfig::default());
        let result = cache.release(&key("ghost")).await;
        assert!(matches!(result, Err(CacheError::UsageUnderflow { .. })));
    }

    #[tokio::test]
    async fn test_partial_underflow_modifies_nothing() {
        let cache = ContextCache::new(CacheConfig::default());
        let root = key("root");
        let leaf = key("leaf");

        cache.acquire(&root, None, || build("root")).await.unwrap();
        cache
            .acquire(&leaf, Some(&root), || build("leaf"))
            .await
            .unwrap();

        // Drain root's own chain, then a leaf release would underflow root.
        cache.release(&root).await.unwrap();
        let result = cache.release(&leaf).await;
        assert!(matches!(result, Err(CacheError::UsageUnderflow { .. })));

        // Leaf's counter was not decremented by the failed release.
        assert_eq!(cache.statistics().await.active_context_count, 1);
    }

    #[tokio::test]
    async fn test_remove_unknown_key_is_noop() {
        let cache: ContextCache<String> = ContextCache::new(CacheConfig::default());
        let removed = cache.remove(&key("ghost"), HierarchyMode::Exhaustive).await;
        assert!(removed.is_empty());
        assert_eq!(cache.statistics().await, CacheStats::default());
    }

    #[tokio::test]
    async fn test_remove_returns_bindings_and_keeps_counters() {
        let cache = ContextCache::new(CacheConfig::default());
        let root = key("root");
        let leaf = key("leaf");

        cache.acquire(&root, None, || build("root")).await.unwrap();
        cache
            .acquire(&leaf, Some(&root), || build("leaf"))
            .await
            .unwrap();

        let removed = cache.remove(&root, HierarchyMode::CurrentLevel).await;
        assert_eq!(removed.len(), 2);
        assert!(removed.iter().any(|r| r.key == root));
        assert!(removed.iter().any(|r| *r.context == "context:leaf"));

        let stats = cache.statistics().await;
        assert_eq!(stats.size, 0);
        assert_eq!(stats.miss_count, 2);
        assert_eq!(stats.hit_count, 0);
    }

    #[tokio::test]
    async fn test_clear_disposes_everything_but_keeps_counters() {
        let cache = ContextCache::new(CacheConfig::default());
        let a = key("a");
        let b = key("b");

        cache.acquire(&a, None, || build("a")).await.unwrap();
        cache.acquire(&b, None, || build("b")).await.unwrap();
        cache.acquire(&a, None, || build("a")).await.unwrap();

        let removed = cache.clear().await;
        assert_eq!(removed.len(), 2);

        let stats = cache.statistics().await;
        assert_eq!(stats.size, 0);
        assert_eq!(stats.hit_count, 1);
        assert_eq!(stats.miss_count, 2);
        assert!(cache.is_empty().await);
    }
}
