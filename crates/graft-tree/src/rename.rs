//! Rename maps and cascading subtree renames
//!
//! A [`RenameMap`] is built functionally for one insertion and then applied
//! uniformly to every view. [`rename_subtree`] re-derives every descendant id
//! from its new ancestor path.

use crate::error::TreeError;
use crate::tree::OutlineTree;
use graft_ident::{compose, NodeId};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Injective mapping from old identifiers to new identifiers
///
/// # Invariants
/// - No two old ids map to the same new id
/// - Identity pairs are never stored
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RenameMap {
    forward: BTreeMap<NodeId, NodeId>,
    #[serde(skip)]
    targets: BTreeMap<NodeId, NodeId>,
}

impl RenameMap {
    /// Create empty map
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `old → new`
    ///
    /// # Errors
    /// Returns [`TreeError::RenameCollision`] if `old` is already mapped
    /// elsewhere or `new` is already claimed by another old id
    pub fn insert(&mut self, old: NodeId, new: NodeId) -> Result<(), TreeError> {
        if old == new {
            return Ok(());
        }
        if let Some(existing) = self.forward.get(&old) {
            if *existing == new {
                return Ok(());
            }
            return Err(TreeError::collision(
                old.clone(),
                format!("already renamed to '{existing}', cannot also rename to '{new}'"),
            ));
        }
        if let Some(claimant) = self.targets.get(&new) {
            return Err(TreeError::collision(
                new.clone(),
                format!("target of both '{claimant}' and '{old}'"),
            ));
        }
        self.targets.insert(new.clone(), old.clone());
        self.forward.insert(old, new);
        Ok(())
    }

    /// Merge another map into this one
    ///
    /// # Errors
    /// Returns [`TreeError::RenameCollision`] if the union is not injective
    pub fn merge(&mut self, other: RenameMap) -> Result<(), TreeError> {
        for (old, new) in other.forward {
            self.insert(old, new)?;
        }
        Ok(())
    }

    /// New id for `old`, if renamed
    #[inline]
    #[must_use]
    pub fn get(&self, old: &NodeId) -> Option<&NodeId> {
        self.forward.get(old)
    }

    /// Renamed id, or the id itself when untouched
    #[inline]
    #[must_use]
    pub fn apply(&self, id: &NodeId) -> NodeId {
        self.forward.get(id).unwrap_or(id).clone()
    }

    /// Apply to a whole id set
    #[must_use]
    pub fn apply_to_set<'a>(&self, ids: impl IntoIterator<Item = &'a NodeId>) -> BTreeSet<NodeId> {
        ids.into_iter().map(|id| self.apply(id)).collect()
    }

    /// Inverse mapping (new → old)
    #[must_use]
    pub fn inverse(&self) -> Self {
        Self {
            forward: self.targets.clone(),
            targets: self.forward.clone(),
        }
    }

    /// Check the map against the live id set
    ///
    /// A target that is live but not itself being renamed would merge two
    /// nodes into one.
    ///
    /// # Errors
    /// Returns [`TreeError::RenameCollision`] on the first such target
    pub fn validate_against(&self, live: &BTreeSet<NodeId>) -> Result<(), TreeError> {
        for (old, new) in &self.forward {
            if live.contains(new) && !self.forward.contains_key(new) {
                return Err(TreeError::collision(
                    new.clone(),
                    format!("'{old}' would be renamed onto an existing node"),
                ));
            }
        }
        Ok(())
    }

    /// Number of renamed ids
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.forward.len()
    }

    /// Check if nothing is renamed
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    /// Iterate `(old, new)` pairs in ascending old-id order
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (&NodeId, &NodeId)> {
        self.forward.iter()
    }
}

impl<'a> IntoIterator for &'a RenameMap {
    type Item = (&'a NodeId, &'a NodeId);
    type IntoIter = std::collections::btree_map::Iter<'a, NodeId, NodeId>;

    fn into_iter(self) -> Self::IntoIter {
        self.forward.iter()
    }
}

/// Rename `node` to `new_id` and re-derive its whole subtree
///
/// The child at 1-based position `k` becomes `new_id.k`, regardless of its
/// previous sequence number.
///
/// # Errors
/// - [`TreeError::SourceNodeNotFound`] if `node` is not in the tree
/// - [`TreeError::RenameCollision`] if the result is not injective
pub fn rename_subtree(
    tree: &OutlineTree,
    node: &NodeId,
    new_id: NodeId,
) -> Result<RenameMap, TreeError> {
    if !tree.contains(node) {
        return Err(TreeError::SourceNodeNotFound(node.clone()));
    }

    let mut map = RenameMap::new();
    let mut pending = vec![(node.clone(), new_id)];

    while let Some((old, new)) = pending.pop() {
        for (position, child) in (1u32..).zip(tree.children_of(&old)) {
            pending.push((child.clone(), compose(Some(&new), position)?));
        }
        map.insert(old, new)?;
    }

    Ok(map)
}
