//! # Known Identifier Registry
//!
//! Set-membership source for the duplicate-flag stage. Anything that can
//! answer "have we seen this identifier before?" qualifies; plain sets work
//! for static snapshots, and [`IdentifierRegistry`] supports concurrent
//! registration while submissions are being processed.

use dashmap::DashSet;
use std::collections::{BTreeSet, HashSet};

pub trait KnownIdentifiers: Send + Sync {
    fn contains(&self, identifier: &str) -> bool;
}

impl KnownIdentifiers for HashSet<String> {
    fn contains(&self, identifier: &str) -> bool {
        HashSet::contains(self, identifier)
    }
}

impl KnownIdentifiers for BTreeSet<String> {
    fn contains(&self, identifier: &str) -> bool {
        BTreeSet::contains(self, identifier)
    }
}

/// Thread-safe identifier set that can grow while the pipeline runs
#[derive(Debug, Default)]
pub struct IdentifierRegistry {
    identifiers: DashSet<String>,
}

impl IdentifierRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an identifier; returns false if it was already known
    pub fn register(&self, identifier: impl Into<String>) -> bool {
        self.identifiers.insert(identifier.into())
    }

    pub fn len(&self) -> usize {
        self.identifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identifiers.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for IdentifierRegistry {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let registry = Self::new();
        for identifier in iter {
            registry.register(identifier);
        }
        registry
    }
}

impl KnownIdentifiers for IdentifierRegistry {
    fn contains(&self, identifier: &str) -> bool {
        self.identifiers.contains(identifier)
    }
}
