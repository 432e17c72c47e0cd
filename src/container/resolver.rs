//! Relationship resolution between a main document and its siblings
//!
//! Pass one registers the ids of every sibling document, pass two matches
//! the main document's relationship targets against that table.

use std::collections::{BTreeSet, HashMap};

use crate::metadata::{Document, DocumentId};

#[derive(Debug)]
pub struct ReferenceResolver<K> {
    index: HashMap<DocumentId, Vec<K>>,
}

/// Result of matching one main document against the registered siblings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution<K: Ord> {
    /// Siblings carrying at least one referenced id
    pub referenced: BTreeSet<K>,
    /// Relationship targets no sibling carries, with their position among
    /// all relationship targets
    pub unresolved: Vec<(usize, DocumentId)>,
}

impl<K: Clone + Ord> ReferenceResolver<K> {
    pub fn new() -> Self {
        Self { index: HashMap::new() }
    }

    /// Register every id of `document` under `key`.
    pub fn register(&mut self, key: K, document: &Document) {
        for id in document.all_ids() {
            let keys = self.index.entry(id.clone()).or_default();
            if !keys.contains(&key) {
                keys.push(key.clone());
            }
        }
    }

    /// Siblings registered for `id`.
    pub fn lookup(&self, id: &DocumentId) -> &[K] {
        self.index.get(id).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn resolve(&self, main: &Document) -> Resolution<K> {
        let mut referenced = BTreeSet::new();
        let mut unresolved = Vec::new();

        for (index, target) in main.relationship_targets().enumerate() {
            let keys = self.lookup(target);
            if keys.is_empty() {
                unresolved.push((index, target.clone()));
            } else {
                referenced.extend(keys.iter().cloned());
            }
        }

        Resolution { referenced, unresolved }
    }
}

impl<K: Clone + Ord> Default for ReferenceResolver<K> {
    fn default() -> Self {
        Self::new()
    }
}
