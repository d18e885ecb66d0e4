// THEORY:
// The `identity_tracker` module gives the merge engine its memory within a frame.
// When two sunspots are spliced together, neither of their ids is reused: a fresh
// id is allocated for the merged region and both inputs are re-parented to it.
// The tracker is the ledger of those re-parentings, a union-find forest.
//
// Key architectural principles:
// 1.  **Explicit Ownership**: The ledger is an arena of parent links owned by one
//     frame's pipeline run. Nothing else mutates it.
// 2.  **Monotonic Ids**: `union` always allocates `len()` as the new id, so a merged
//     id is strictly greater than every id that existed before it. Since a parent
//     is always younger than its child, parent chains are strictly increasing and
//     can never form a cycle.
// 3.  **Canonical Lookup**: `root` follows parent links until it reaches a
//     self-parented id, the sunspot that currently represents the whole merged
//     group. `find` does the same and compresses the path it walked; roots are
//     unchanged by compression.

use crate::core_modules::error::MergeError;
use crate::core_modules::sunspot::SunspotId;

/// Union-find ledger mapping every sunspot id ever issued to its parent.
#[derive(Debug, Clone, Default)]
pub struct IdentityTracker {
    parents: Vec<SunspotId>,
}

impl IdentityTracker {
    /// Creates a ledger with ids `0..count`, each its own root.
    pub fn with_roots(count: usize) -> Self {
        Self {
            parents: (0..count).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.parents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }

    /// The parent table, indexed by id.
    pub fn parents(&self) -> &[SunspotId] {
        &self.parents
    }

    pub fn is_root(&self, id: SunspotId) -> bool {
        self.parents.get(id) == Some(&id)
    }

    /// Canonical id of `id`, without modifying the ledger.
    pub fn root(&self, id: SunspotId) -> Result<SunspotId, MergeError> {
        let mut current = *self.parents.get(id).ok_or(MergeError::UnknownId(id))?;
        let mut previous = id;
        while current != previous {
            previous = current;
            current = self.parents[current];
        }
        Ok(current)
    }

    /// Canonical id of `id`, compressing the walked path onto the root.
    pub fn find(&mut self, id: SunspotId) -> Result<SunspotId, MergeError> {
        let root = self.root(id)?;

        let mut current = id;
        while current != root {
            let next = self.parents[current];
            self.parents[current] = root;
            current = next;
        }
        Ok(root)
    }

    /// Re-parents two canonical ids onto a freshly allocated id and returns it.
    pub fn union(&mut self, a: SunspotId, b: SunspotId) -> Result<SunspotId, MergeError> {
        for id in [a, b] {
            if id >= self.parents.len() {
                return Err(MergeError::UnknownId(id));
            }
            if !self.is_root(id) {
                return Err(MergeError::NotCanonical(id));
            }
        }
        if a == b {
            return Err(MergeError::SameRoot(a));
        }

        let merged = self.parents.len();
        self.parents.push(merged);
        self.parents[a] = merged;
        self.parents[b] = merged;
        Ok(merged)
    }

    /// Every id that is currently its own root, in ascending order.
    pub fn roots(&self) -> impl Iterator<Item = SunspotId> + '_ {
        self.parents
            .iter()
            .enumerate()
            .filter(|(id, parent)| id == *parent)
            .map(|(id, _)| id)
    }
}
