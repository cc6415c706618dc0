//! View synchronizer trait
//!
//! Provides the [`ViewSynchronizer`] contract shared by the text, table and
//! graph appliers.

use crate::error::SyncError;
use graft_ident::NodeId;
use graft_tree::{InsertionPlan, RenameMap};
use std::collections::BTreeSet;

/// Applies one insertion to one view
///
/// # Contract
/// - `apply_renames` maps every id through the [`RenameMap`] in a single
///   pass, so the result does not depend on map iteration order
/// - `insert` adds the new node at the location the plan's placement names
/// - Neither step mutates its input view
pub trait ViewSynchronizer: Send + Sync + std::fmt::Debug {
    /// The representation this synchronizer maintains
    type View: Clone;

    /// View name (for diagnostics)
    fn name(&self) -> &'static str;

    /// Apply every rename in the map
    ///
    /// # Errors
    /// Returns [`SyncError::RenameCollapsed`] if two entries end up sharing an id
    fn apply_renames(&self, view: &Self::View, renames: &RenameMap)
        -> Result<Self::View, SyncError>;

    /// Insert the new node into an already-renamed view
    ///
    /// # Errors
    /// View-specific; see each implementation
    fn insert(&self, view: &Self::View, plan: &InsertionPlan) -> Result<Self::View, SyncError>;

    /// Outline ids present in the view
    fn node_ids(&self, view: &Self::View) -> BTreeSet<NodeId>;

    /// Check that the view holds exactly `expected`
    ///
    /// # Errors
    /// Returns [`SyncError::IdSetMismatch`] listing the differences
    fn verify(&self, view: &Self::View, expected: &BTreeSet<NodeId>) -> Result<(), SyncError> {
        let actual = self.node_ids(view);
        if &actual == expected {
            return Ok(());
        }
        Err(SyncError::IdSetMismatch {
            view: self.name(),
            missing: expected.difference(&actual).cloned().collect(),
            unexpected: actual.difference(expected).cloned().collect(),
        })
    }

    /// Apply renames then insert
    ///
    /// # Errors
    /// Propagates errors from either step
    fn synchronize(&self, view: &Self::View, plan: &InsertionPlan) -> Result<Self::View, SyncError> {
        let renamed = self.apply_renames(view, &plan.renames)?;
        self.insert(&renamed, plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{NodeEntry, NodeTable, TableSynchronizer};

    fn id(s: &str) -> NodeId {
        s.parse().unwrap()
    }

    #[test]
    fn verify_reports_both_directions() {
        let table: NodeTable = [("1", "a"), ("2", "b")]
            .into_iter()
            .map(|(key, snippet)| (id(key), NodeEntry::new(snippet, "r")))
            .collect();
        let sync = TableSynchronizer::default();

        assert!(sync.verify(&table, &BTreeSet::from([id("1"), id("2")])).is_ok());

        let err = sync
            .verify(&table, &BTreeSet::from([id("1"), id("3")]))
            .unwrap_err();
        assert_eq!(
            err,
            SyncError::IdSetMismatch {
                view: "table",
                missing: vec![id("3")],
                unexpected: vec![id("2")],
            }
        );
    }
}
