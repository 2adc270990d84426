// registry.rs - Aggregated set of every permission tag declared by actions.
//
// Written during service registration, read for introspection. It only ever
// grows. A `register` batch is applied under one write lock, so a snapshot
// sees either none or all of it.

use std::collections::BTreeSet;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Deduplicated, monotonically growing set of permission tags.
#[derive(Debug, Default)]
pub struct PermissionRegistry {
    tags: RwLock<BTreeSet<String>>,
}

impl PermissionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add every tag, ignoring those already known.
    ///
    /// Returns how many tags were new.
    pub fn register<I, S>(&self, tags: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set = self.write();
        tags.into_iter()
            .map(Into::into)
            .filter(|tag| set.insert(tag.clone()))
            .count()
    }

    /// All known tags, in a stable (sorted) order.
    pub fn snapshot(&self) -> Vec<String> {
        self.read().iter().cloned().collect()
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.read().contains(tag)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    // The set is never left half-updated, so a poisoned lock is still usable.
    fn read(&self) -> RwLockReadGuard<'_, BTreeSet<String>> {
        self.tags.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeSet<String>> {
        self.tags.write().unwrap_or_else(|e| e.into_inner())
    }
}
