//! Configuration for the cache

use serde::{Deserialize, Serialize};

use crate::error::{CacheError, Result};

/// Configuration for the context cache
///
/// The cache is unbounded by default: context construction dominates cost,
/// and test runs are expected to reuse a small number of configurations.
/// Setting `max_contexts` bounds the number of cached contexts through the
/// least-recently-used eviction policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of cached contexts, enforced by eviction.
    /// `None` leaves the cache unbounded.
    pub max_contexts: Option<usize>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { max_contexts: None }
    }
}

impl CacheConfig {
    /// Create a new builder for cache configuration
    pub fn builder() -> CacheConfigBuilder {
        CacheConfigBuilder::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_contexts == Some(0) {
            return Err(CacheError::Config(
                "max_contexts must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for cache configuration
#[derive(Debug, Default)]
pub struct CacheConfigBuilder {
    max_contexts: Option<usize>,
}

impl CacheConfigBuilder {
    /// Bound the number of cached contexts
    pub fn max_contexts(mut self, max: usize) -> Self {
        self.max_contexts = Some(max);
        self
    }

    /// Build the cache configuration
    pub fn build(self) -> CacheConfig {
        CacheConfig {
            max_contexts: self.max_contexts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_unbounded() {
        let config = CacheConfig::default();
        assert_eq!(config.max_contexts, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = CacheConfig::builder().max_contexts(32).build();
        assert_eq!(config.max_contexts, Some(32));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_bound_is_rejected() {
        let config = CacheConfig::builder().max_contexts(0).build();
        assert!(matches!(config.validate(), Err(CacheError::Config(_))));
    }
}
