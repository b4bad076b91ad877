//! Error types for cache operations
//!
//! This module defines custom error types for the context-cache library.
//! Every error is surfaced to the immediate caller; the cache performs no
//! internal retries and never swallows a condition to keep statistics clean.

use thiserror::Error;

use crate::key::ContextKey;

/// Main error type for cache operations
#[derive(Error, Debug)]
pub enum CacheError {
    /// Context construction failed - the factory raised during a miss.
    /// No entry is committed; the miss is still counted.
    #[error("context construction failed: {0}")]
    Construction(#[source] anyhow::Error),

    /// Usage underflow - release() called more times than acquire() for a
    /// key's chain, or release() of a key that is not cached. Signals a
    /// lifecycle bug in the orchestrator.
    #[error("usage underflow for context {key}: released more times than acquired")]
    UsageUnderflow { key: ContextKey },

    /// A parent key passed to acquire() is not currently stored. Ancestors
    /// must be acquired before their descendants.
    #[error("parent context {parent} is not cached; ancestors must be acquired before descendants")]
    UnknownParent { parent: ContextKey },

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type alias for cache operations
pub type Result<T> = std::result::Result<T, CacheError>;
