//! Cache key type derived from a resolved configuration descriptor
//!
//! A [`ContextKey`] is the immutable, hashable identity of a constructed
//! context. Two keys are equal iff all fields are structurally equal,
//! including the order of active profiles: `["foo", "bar"]` and
//! `["bar", "foo"]` are distinct keys. Profiles are always stored in their
//! resolved form, so a descriptor using a dynamic resolver collides with a
//! statically declared descriptor that resolves to the same sequence.

use std::fmt;
use std::sync::Arc;

/// Immutable composite identity of a cached context.
///
/// Built exclusively through [`ContextDescriptor::derive_key`]; the fields
/// are the resolved configuration inputs that deterministically identify
/// what the context contains.
///
/// [`ContextDescriptor::derive_key`]: crate::descriptor::ContextDescriptor::derive_key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContextKey {
    /// Ordered configuration component identifiers
    components: Vec<String>,

    /// Loader-implementation identity
    loader: String,

    /// Resolved active profiles, order-sensitive
    profiles: Vec<String>,

    /// Ordered configuration customizer identities
    customizers: Vec<String>,

    /// Key of the parent configuration, if this context is part of a hierarchy
    parent: Option<Arc<ContextKey>>,
}

impl ContextKey {
    pub(crate) fn new(
        components: Vec<String>,
        loader: String,
        profiles: Vec<String>,
        customizers: Vec<String>,
        parent: Option<Arc<ContextKey>>,
    ) -> Self {
        Self {
            components,
            loader,
            profiles,
            customizers,
            parent,
        }
    }

    /// Component identifiers, in declaration order.
    pub fn components(&self) -> &[String] {
        &self.components
    }

    /// Loader-implementation identity.
    pub fn loader(&self) -> &str {
        &self.loader
    }

    /// Resolved active profiles, in resolution order.
    pub fn profiles(&self) -> &[String] {
        &self.profiles
    }

    /// Customizer identities, in declaration order.
    pub fn customizers(&self) -> &[String] {
        &self.customizers
    }

    /// Key of the parent configuration, if any.
    pub fn parent(&self) -> Option<&ContextKey> {
        self.parent.as_deref()
    }

    /// Number of levels above this key in its configuration hierarchy.
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut current = self.parent.as_deref();
        while let Some(key) = current {
            depth += 1;
            current = key.parent.as_deref();
        }
        depth
    }
}

impl fmt::Display for ContextKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}[{}]",
            self.loader,
            self.components.join(","),
        )?;
        if !self.profiles.is_empty() {
            write!(f, "@{}", self.profiles.join(","))?;
        }
        if self.parent.is_some() {
            write!(f, " (child, depth {})", self.depth())?;
        }
        Ok(())
    }
}
