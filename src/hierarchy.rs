//! Central parent/child index over cached keys
//!
//! The index maps every stored parent key to the set of its stored children,
//! enabling ancestor/descendant traversal without rescanning the entry map.
//! Invariant: the map holds only currently stored keys and never an empty
//! child set, so the number of parent contexts is simply the map's length.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::key::ContextKey;

/// Children index for the cached hierarchy
#[derive(Debug, Default)]
pub struct HierarchyIndex {
    children: HashMap<ContextKey, HashSet<ContextKey>>,
}

impl HierarchyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `child` under `parent`.
    pub fn link(&mut self, parent: &ContextKey, child: &ContextKey) {
        self.children
            .entry(parent.clone())
            .or_default()
            .insert(child.clone());
    }

    /// Remove `key` from the index: drops its own child set and unlinks it
    /// from `parent`'s set, discarding the set if it becomes empty.
    pub fn remove_key(&mut self, key: &ContextKey, parent: Option<&ContextKey>) {
        self.children.remove(key);
        if let Some(parent) = parent {
            if let Some(siblings) = self.children.get_mut(parent) {
                siblings.remove(key);
                if siblings.is_empty() {
                    self.children.remove(parent);
                }
            }
        }
    }

    /// Direct children of `key` currently stored, if any.
    pub fn children_of(&self, key: &ContextKey) -> Option<&HashSet<ContextKey>> {
        self.children.get(key)
    }

    /// Collect `root` and every reachable descendant, breadth-first.
    pub fn collect_tree(&self, root: &ContextKey) -> Vec<ContextKey> {
        let mut collected = Vec::new();
        let mut queue = VecDeque::from([root.clone()]);
        while let Some(key) = queue.pop_front() {
            if let Some(children) = self.children.get(&key) {
                queue.extend(children.iter().cloned());
            }
            collected.push(key);
        }
        collected
    }

    /// Number of stored keys that are the parent of at least one other
    /// stored key.
    pub fn parent_count(&self) -> usize {
        self.children.len()
    }

    pub fn clear(&mut self) {
        self.children.clear();
    }
}
