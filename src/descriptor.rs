//! Configuration descriptors and key derivation
//!
//! A [`ContextDescriptor`] captures the resolved inputs that deterministically
//! identify what a context should contain: component identifiers, loader
//! identity, active profiles, customizer identities, and an optional parent
//! descriptor for nested configurations. [`ContextDescriptor::derive_key`] is
//! the pure key-derivation function consumed by the orchestrator.

use std::fmt;
use std::sync::Arc;

use crate::key::ContextKey;

/// Resolves active profiles at key-derivation time.
///
/// Keys are always compared against the *resolved* profile sequence, so a
/// resolver returning `["foo", "bar"]` yields the same key as a declared
/// `["foo", "bar"]` list, all other fields being equal.
pub trait ActiveProfilesResolver: Send + Sync {
    /// Produce the ordered list of active profiles.
    fn resolve(&self) -> Vec<String>;
}

/// Source of the active-profile sequence for a descriptor.
#[derive(Clone)]
pub enum ProfileSource {
    /// Profiles declared statically, in order.
    Declared(Vec<String>),

    /// Profiles produced by a dynamic resolver.
    Resolver(Arc<dyn ActiveProfilesResolver>),
}

impl ProfileSource {
    /// Resolve the ordered profile sequence.
    pub fn resolve(&self) -> Vec<String> {
        match self {
            ProfileSource::Declared(profiles) => profiles.clone(),
            ProfileSource::Resolver(resolver) => resolver.resolve(),
        }
    }
}

impl Default for ProfileSource {
    fn default() -> Self {
        ProfileSource::Declared(Vec::new())
    }
}

impl fmt::Debug for ProfileSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProfileSource::Declared(profiles) => {
                f.debug_tuple("Declared").field(profiles).finish()
            }
            ProfileSource::Resolver(_) => f.debug_tuple("Resolver").field(&"..").finish(),
        }
    }
}

/// Resolved configuration inputs for one context.
///
/// Descriptors nest: a child configuration holds its parent descriptor, and
/// the derived keys mirror that nesting. The relation cannot be circular by
/// construction, since a descriptor owns its parent outright.
#[derive(Debug, Clone)]
pub struct ContextDescriptor {
    components: Vec<String>,
    loader: String,
    profiles: ProfileSource,
    customizers: Vec<String>,
    parent: Option<Box<ContextDescriptor>>,
}

impl ContextDescriptor {
    /// Create a new builder for a descriptor.
    pub fn builder() -> ContextDescriptorBuilder {
        ContextDescriptorBuilder::default()
    }

    /// Parent descriptor, if this configuration is nested.
    pub fn parent(&self) -> Option<&ContextDescriptor> {
        self.parent.as_deref()
    }

    /// Derive the cache key for this descriptor.
    ///
    /// Pure and deterministic: resolves the profile source and the parent
    /// chain, producing structurally equal keys for structurally identical
    /// descriptors.
    pub fn derive_key(&self) -> ContextKey {
        ContextKey::new(
            self.components.clone(),
            self.loader.clone(),
            self.profiles.resolve(),
            self.customizers.clone(),
            self.parent.as_ref().map(|p| Arc::new(p.derive_key())),
        )
    }
}

/// Builder for [`ContextDescriptor`]
#[derive(Debug, Clone, Default)]
pub struct ContextDescriptorBuilder {
    components: Vec<String>,
    loader: Option<String>,
    profiles: ProfileSource,
    customizers: Vec<String>,
    parent: Option<Box<ContextDescriptor>>,
}

impl ContextDescriptorBuilder {
    /// Add a configuration component identifier.
    pub fn component(mut self, component: impl Into<String>) -> Self {
        self.components.push(component.into());
        self
    }

    /// Set the loader-implementation identity.
    pub fn loader(mut self, loader: impl Into<String>) -> Self {
        self.loader = Some(loader.into());
        self
    }

    /// Declare the active profiles statically, in order.
    pub fn profiles(mut self, profiles: impl IntoIterator<Item = String>) -> Self {
        self.profiles = ProfileSource::Declared(profiles.into_iter().collect());
        self
    }

    /// Supply active profiles through a dynamic resolver.
    pub fn profiles_resolver(mut self, resolver: Arc<dyn ActiveProfilesResolver>) -> Self {
        self.profiles = ProfileSource::Resolver(resolver);
        self
    }

    /// Add a configuration customizer identity.
    pub fn customizer(mut self, customizer: impl Into<String>) -> Self {
        self.customizers.push(customizer.into());
        self
    }

    /// Set the parent descriptor for a nested configuration.
    pub fn parent(mut self, parent: ContextDescriptor) -> Self {
        self.parent = Some(Box::new(parent));
        self
    }

    /// Build the descriptor.
    pub fn build(self) -> ContextDescriptor {
        ContextDescriptor {
            components: self.components,
            loader: self.loader.unwrap_or_else(|| "default".to_string()),
            profiles: self.profiles,
            customizers: self.customizers,
            parent: self.parent,
        }
    }
}
