//! Outline tree built from a flat identifier set
//!
//! Provides [`OutlineTree`], an arena of [`OutlineNode`]s keyed by
//! [`NodeId`]. Parent links are lookup keys into the arena, so the tree has
//! no ownership cycles and is cheap to rebuild for every operation.

use crate::error::TreeError;
use graft_ident::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// What to do with an identifier whose parent prefix is not in the id set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DanglingPrefixPolicy {
    /// Treat the node as top-level and log a warning
    #[default]
    Promote,

    /// Fail the build with [`TreeError::DanglingParentPrefix`]
    Reject,
}

/// Node in the outline arena
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineNode {
    id: NodeId,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl OutlineNode {
    fn new(id: NodeId) -> Self {
        Self {
            id,
            parent: None,
            children: Vec::new(),
        }
    }

    /// Node identifier
    #[inline]
    #[must_use]
    pub fn id(&self) -> &NodeId {
        &self.id
    }

    /// Parent key, `None` for top-level nodes
    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<&NodeId> {
        self.parent.as_ref()
    }

    /// Children sorted ascending by sequence
    #[inline]
    #[must_use]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Check if node has no children
    #[inline]
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Outline tree reconstructed from the node table's identifier set
///
/// Top-level nodes behave as children of a virtual root: [`roots`] is their
/// sorted sibling list.
///
/// [`roots`]: OutlineTree::roots
#[derive(Debug, Clone, Default)]
pub struct OutlineTree {
    nodes: BTreeMap<NodeId, OutlineNode>,
    roots: Vec<NodeId>,
    promoted: Vec<NodeId>,
}

impl OutlineTree {
    /// Build tree with the default [`DanglingPrefixPolicy::Promote`]
    ///
    /// # Errors
    /// Never fails under the promote policy; the signature matches
    /// [`build_with_policy`](Self::build_with_policy).
    pub fn build(ids: impl IntoIterator<Item = NodeId>) -> Result<Self, TreeError> {
        Self::build_with_policy(ids, DanglingPrefixPolicy::Promote)
    }

    /// Build tree from raw identifier strings
    ///
    /// # Errors
    /// Returns [`TreeError::InvalidIdentifier`] for malformed identifiers
    pub fn from_strs<'a>(ids: impl IntoIterator<Item = &'a str>) -> Result<Self, TreeError> {
        let ids = ids
            .into_iter()
            .map(str::parse)
            .collect::<Result<Vec<NodeId>, _>>()?;
        Self::build(ids)
    }

    /// Build tree, attaching every id under its parent prefix
    ///
    /// Duplicate ids collapse into one node. An id whose prefix is absent
    /// from the set is registered as top-level under
    /// [`DanglingPrefixPolicy::Promote`].
    ///
    /// # Errors
    /// Returns [`TreeError::DanglingParentPrefix`] under
    /// [`DanglingPrefixPolicy::Reject`]
    pub fn build_with_policy(
        ids: impl IntoIterator<Item = NodeId>,
        policy: DanglingPrefixPolicy,
    ) -> Result<Self, TreeError> {
        let ids: BTreeSet<NodeId> = ids.into_iter().collect();

        let mut nodes: BTreeMap<NodeId, OutlineNode> = ids
            .iter()
            .map(|id| (id.clone(), OutlineNode::new(id.clone())))
            .collect();
        let mut roots = Vec::new();
        let mut promoted = Vec::new();

        for id in &ids {
            match id.prefix() {
                None => roots.push(id.clone()),
                Some(prefix) if ids.contains(&prefix) => {
                    if let Some(node) = nodes.get_mut(id) {
                        node.parent = Some(prefix.clone());
                    }
                    if let Some(parent) = nodes.get_mut(&prefix) {
                        parent.children.push(id.clone());
                    }
                }
                Some(prefix) => match policy {
                    DanglingPrefixPolicy::Promote => {
                        tracing::warn!(
                            id = %id,
                            prefix = %prefix,
                            "parent prefix missing, treating node as top-level"
                        );
                        roots.push(id.clone());
                        promoted.push(id.clone());
                    }
                    DanglingPrefixPolicy::Reject => {
                        return Err(TreeError::DanglingParentPrefix {
                            id: id.clone(),
                            prefix,
                        });
                    }
                },
            }
        }

        for node in nodes.values_mut() {
            sort_siblings(&mut node.children);
        }
        sort_siblings(&mut roots);

        tracing::debug!(nodes = nodes.len(), roots = roots.len(), "outline tree built");

        Ok(Self {
            nodes,
            roots,
            promoted,
        })
    }

    /// Lookup node by id
    #[inline]
    #[must_use]
    pub fn get(&self, id: &NodeId) -> Option<&OutlineNode> {
        self.nodes.get(id)
    }

    /// Check if node exists
    #[inline]
    #[must_use]
    pub fn contains(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Sorted top-level nodes
    #[inline]
    #[must_use]
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Ids registered as top-level because their parent prefix was missing
    #[inline]
    #[must_use]
    pub fn promoted(&self) -> &[NodeId] {
        &self.promoted
    }

    /// Parent of a node (`None` for top-level or unknown nodes)
    #[inline]
    #[must_use]
    pub fn parent_of(&self, id: &NodeId) -> Option<&NodeId> {
        self.nodes.get(id).and_then(OutlineNode::parent)
    }

    /// Sorted children of a node (empty for unknown nodes)
    #[inline]
    #[must_use]
    pub fn children_of(&self, id: &NodeId) -> &[NodeId] {
        self.nodes.get(id).map(OutlineNode::children).unwrap_or(&[])
    }

    /// Full sibling list the node belongs to, itself included
    ///
    /// For top-level nodes this is the virtual root's child list.
    #[must_use]
    pub fn sibling_list(&self, id: &NodeId) -> &[NodeId] {
        match self.parent_of(id) {
            Some(parent) => self.children_of(parent),
            None => &self.roots,
        }
    }

    /// Ordered siblings excluding the node itself
    #[must_use]
    pub fn siblings_of(&self, id: &NodeId) -> Vec<NodeId> {
        if !self.contains(id) {
            return Vec::new();
        }
        self.sibling_list(id)
            .iter()
            .filter(|sibling| *sibling != id)
            .cloned()
            .collect()
    }

    /// Position of the node within its sorted sibling list
    ///
    /// # Errors
    /// Returns [`TreeError::SourceNodeNotFound`] if the node is unknown
    pub fn index_in_parent(&self, id: &NodeId) -> Result<usize, TreeError> {
        if !self.contains(id) {
            return Err(TreeError::SourceNodeNotFound(id.clone()));
        }
        self.sibling_list(id)
            .iter()
            .position(|sibling| sibling == id)
            .ok_or_else(|| TreeError::SourceNodeNotFound(id.clone()))
    }

    /// All descendants of a node in pre-order (node excluded)
    #[must_use]
    pub fn descendants(&self, id: &NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<&NodeId> = self.children_of(id).iter().rev().collect();
        while let Some(next) = stack.pop() {
            out.push(next.clone());
            stack.extend(self.children_of(next).iter().rev());
        }
        out
    }

    /// All ids in the tree
    #[inline]
    pub fn ids(&self) -> impl Iterator<Item = &NodeId> {
        self.nodes.keys()
    }

    /// Id set as an owned collection
    #[must_use]
    pub fn id_set(&self) -> BTreeSet<NodeId> {
        self.nodes.keys().cloned().collect()
    }

    /// Number of nodes
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if tree is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Ascending by sequence; full id breaks ties between promoted roots
fn sort_siblings(ids: &mut [NodeId]) {
    ids.sort_by(|a, b| a.sequence().cmp(&b.sequence()).then_with(|| a.cmp(b)));
}
