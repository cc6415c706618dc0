//! Node metadata table
//!
//! Maps outline ids to the snippet, paragraph references and semantic role
//! recorded for each node. Entry order is preserved across renames.

use crate::error::SyncError;
use crate::synchronizer::ViewSynchronizer;
use graft_ident::NodeId;
use graft_tree::{InsertionPlan, RenameMap};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Role given to entries created by an insertion
pub const DEFAULT_ADDED_ROLE: &str = "added node";

/// Metadata attached to one outline node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeEntry {
    /// Short summary or title
    #[serde(default)]
    pub text_snippet: String,
    /// Paragraph tags (`para-N`) belonging to the node
    #[serde(default)]
    pub paragraph_ids: Vec<String>,
    /// Free-form role, e.g. "thesis" or "example"
    #[serde(default)]
    pub semantic_role: String,
    /// Fields this crate does not interpret, kept verbatim
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl NodeEntry {
    /// Create entry with snippet and role
    #[must_use]
    pub fn new(text_snippet: impl Into<String>, semantic_role: impl Into<String>) -> Self {
        Self {
            text_snippet: text_snippet.into(),
            semantic_role: semantic_role.into(),
            ..Self::default()
        }
    }

    /// Builder: set paragraph references
    #[must_use]
    pub fn with_paragraphs<I, S>(mut self, paragraphs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.paragraph_ids = paragraphs.into_iter().map(Into::into).collect();
        self
    }
}

/// Ordered id → entry table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeTable(IndexMap<NodeId, NodeEntry>);

impl NodeTable {
    /// Create empty table
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up an entry
    #[inline]
    #[must_use]
    pub fn get(&self, id: &NodeId) -> Option<&NodeEntry> {
        self.0.get(id)
    }

    /// Check for an entry
    #[inline]
    #[must_use]
    pub fn contains(&self, id: &NodeId) -> bool {
        self.0.contains_key(id)
    }

    /// Append or replace an entry, returning the previous one
    pub fn insert(&mut self, id: NodeId, entry: NodeEntry) -> Option<NodeEntry> {
        self.0.insert(id, entry)
    }

    /// Entries in table order
    pub fn iter(&self) -> impl Iterator<Item = (&NodeId, &NodeEntry)> {
        self.0.iter()
    }

    /// Set of keys
    #[must_use]
    pub fn id_set(&self) -> BTreeSet<NodeId> {
        self.0.keys().cloned().collect()
    }

    /// Number of entries
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(NodeId, NodeEntry)> for NodeTable {
    fn from_iter<T: IntoIterator<Item = (NodeId, NodeEntry)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Synchronizer for [`NodeTable`]
#[derive(Debug, Clone)]
pub struct TableSynchronizer {
    added_role: String,
}

impl TableSynchronizer {
    /// Create table synchronizer tagging new entries with `added_role`
    #[must_use]
    pub fn new(added_role: impl Into<String>) -> Self {
        Self {
            added_role: added_role.into(),
        }
    }
}

impl Default for TableSynchronizer {
    fn default() -> Self {
        Self::new(DEFAULT_ADDED_ROLE)
    }
}

impl ViewSynchronizer for TableSynchronizer {
    type View = NodeTable;

    fn name(&self) -> &'static str {
        "table"
    }

    fn apply_renames(&self, view: &NodeTable, renames: &RenameMap) -> Result<NodeTable, SyncError> {
        let renamed: NodeTable = view
            .iter()
            .map(|(id, entry)| (renames.apply(id), entry.clone()))
            .collect();

        if renamed.len() != view.len() {
            return Err(SyncError::RenameCollapsed {
                view: self.name(),
                expected: view.len(),
                actual: renamed.len(),
            });
        }
        Ok(renamed)
    }

    fn insert(&self, view: &NodeTable, plan: &InsertionPlan) -> Result<NodeTable, SyncError> {
        if view.contains(&plan.new_id) {
            return Err(SyncError::AlreadyPresent {
                view: self.name(),
                id: plan.new_id.clone(),
            });
        }

        let mut updated = view.clone();
        updated.insert(
            plan.new_id.clone(),
            NodeEntry::new(plan.label.clone(), self.added_role.clone()),
        );
        Ok(updated)
    }

    fn node_ids(&self, view: &NodeTable) -> BTreeSet<NodeId> {
        view.id_set()
    }
}
