//! # Context Cache
//!
//! A hierarchy-aware cache for expensive-to-construct runtime contexts, as
//! used by test-execution frameworks: many test classes share an identical
//! configuration and reuse one constructed context, while configurations can
//! nest into parent/child chains that must be invalidated as whole subtrees.
//!
//! ## Features
//!
//! - **Structural cache keys** derived from a configuration descriptor
//!   (components, loader, resolved active profiles in order, customizers,
//!   parent chain)
//! - **At-most-one construction** per key, with the factory supplied by the
//!   caller and invoked only on a miss
//! - **Usage tracking across ancestor chains** driving the active-context
//!   statistic
//! - **Cascading removal** in two modes: subtree-only or the whole
//!   connected hierarchy tree
//! - **Hit/miss statistics** observed as consistent snapshots
//! - **Pluggable eviction** with a bundled least-recently-used bound
//!
//! ## Example
//!
//! ```rust
//! use context_cache::{CacheConfig, ContextCache, ContextDescriptor, HierarchyMode};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let cache = ContextCache::new(CacheConfig::default());
//!
//! let key = ContextDescriptor::builder()
//!     .loader("AnnotationConfigLoader")
//!     .component("AppConfig")
//!     .profiles(vec!["integration".to_string()])
//!     .build()
//!     .derive_key();
//!
//! // Construct on first acquire, reuse afterwards.
//! let context = cache
//!     .acquire(&key, None, || async { Ok("expensive container".to_string()) })
//!     .await?;
//!
//! // Hand the context back once the test class is done with it.
//! cache.release(&key).await?;
//!
//! // A test dirtied the context: rebuild it next time.
//! for removed in cache.remove(&key, HierarchyMode::CurrentLevel).await {
//!     drop(removed.context); // disposal belongs to the orchestrator
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod descriptor;
pub mod entry;
pub mod error;
pub mod eviction;
pub mod hierarchy;
pub mod key;
pub mod stats;
pub mod store;

// Re-export main types for convenience
pub use config::{CacheConfig, CacheConfigBuilder};
pub use descriptor::{
    ActiveProfilesResolver, ContextDescriptor, ContextDescriptorBuilder, ProfileSource,
};
pub use entry::{CacheEntry, EntryMetadata};
pub use error::{CacheError, Result};
pub use eviction::{EvictionCandidate, EvictionPolicy, LruEviction, NoEviction};
pub use hierarchy::HierarchyIndex;
pub use key::ContextKey;
pub use stats::CacheStats;
pub use store::{ContextCache, HierarchyMode, RemovedContext};
