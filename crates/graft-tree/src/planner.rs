//! Insertion planning
//!
//! Given a source node and a [`Direction`], [`InsertionPlanner`] computes the
//! new node's id and the complete [`RenameMap`] (sibling shifts plus their
//! cascaded subtrees). Planning is pure: the tree is never mutated.

use crate::error::TreeError;
use crate::rename::{rename_subtree, RenameMap};
use crate::tree::OutlineTree;
use graft_ident::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Where the new node goes relative to the source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Direction {
    /// Last child of the source
    Child,

    /// Sibling immediately before the source
    LeftSibling,

    /// Sibling immediately after the source
    RightSibling,
}

impl Direction {
    /// Wire name (`child`, `left-sibling`, `right-sibling`)
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Child => "child",
            Self::LeftSibling => "left-sibling",
            Self::RightSibling => "right-sibling",
        }
    }
}

impl Display for Direction {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "child" => Ok(Self::Child),
            "left-sibling" | "left" => Ok(Self::LeftSibling),
            "right-sibling" | "right" => Ok(Self::RightSibling),
            other => Err(format!(
                "unsupported direction '{other}' (expected child, left-sibling or right-sibling)"
            )),
        }
    }
}

/// Placement of the new node, expressed with post-rename ids
///
/// Each variant carries exactly the anchor its view appliers need.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "direction", rename_all = "kebab-case")]
pub enum Placement {
    /// New node is the last child of `parent`
    Child {
        /// Source node (never renamed by a child insertion)
        parent: NodeId,
    },

    /// New node goes directly before `before`
    LeftSibling {
        /// Source node after its own shift
        before: NodeId,
    },

    /// New node goes directly after `after` and its subtree
    RightSibling {
        /// Source node (never renamed by a right insertion)
        after: NodeId,
    },
}

impl Placement {
    /// Direction this placement was planned for
    #[inline]
    #[must_use]
    pub fn direction(&self) -> Direction {
        match self {
            Self::Child { .. } => Direction::Child,
            Self::LeftSibling { .. } => Direction::LeftSibling,
            Self::RightSibling { .. } => Direction::RightSibling,
        }
    }

    /// The source node's id after renames
    #[inline]
    #[must_use]
    pub fn anchor(&self) -> &NodeId {
        match self {
            Self::Child { parent } => parent,
            Self::LeftSibling { before } => before,
            Self::RightSibling { after } => after,
        }
    }
}

/// Complete description of one insertion
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InsertionPlan {
    /// Source id as given in the request (pre-rename)
    pub source: NodeId,

    /// Id assigned to the new node
    pub new_id: NodeId,

    /// Label of the new node
    pub label: String,

    /// Anchor for the view appliers
    pub placement: Placement,

    /// Every rename the insertion triggers
    pub renames: RenameMap,
}

impl InsertionPlan {
    /// Requested direction
    #[inline]
    #[must_use]
    pub fn direction(&self) -> Direction {
        self.placement.direction()
    }

    /// Number of renamed nodes
    #[inline]
    #[must_use]
    pub fn rename_count(&self) -> usize {
        self.renames.len()
    }
}

/// Computes insertion plans against a tree snapshot
#[derive(Debug, Clone, Copy)]
pub struct InsertionPlanner<'a> {
    tree: &'a OutlineTree,
}

impl<'a> InsertionPlanner<'a> {
    /// Create planner over a tree
    #[inline]
    #[must_use]
    pub fn new(tree: &'a OutlineTree) -> Self {
        Self { tree }
    }

    /// Plan an insertion
    ///
    /// # Workflow
    /// 1. Locate the source and its sibling list
    /// 2. Shift the affected siblings by one, cascading their subtrees
    /// 3. Derive the new id
    /// 4. Check the renames and the new id against the live id set
    ///
    /// # Errors
    /// - [`TreeError::SourceNodeNotFound`] if `source` is not in the tree
    /// - [`TreeError::RenameCollision`] if the plan would merge two nodes
    pub fn plan(
        &self,
        source: &NodeId,
        direction: Direction,
        label: impl Into<String>,
    ) -> Result<InsertionPlan, TreeError> {
        if !self.tree.contains(source) {
            return Err(TreeError::SourceNodeNotFound(source.clone()));
        }

        let (new_id, renames, placement) = match direction {
            Direction::Child => {
                let count = self.tree.children_of(source).len();
                let sequence = u32::try_from(count + 1).map_err(|_| {
                    TreeError::collision(source.clone(), "child sequence overflow")
                })?;
                let new_id = source.child(sequence)?;
                let placement = Placement::Child {
                    parent: source.clone(),
                };
                (new_id, RenameMap::new(), placement)
            }
            Direction::RightSibling => {
                let index = self.tree.index_in_parent(source)?;
                let renames = self.shift_siblings(source, index + 1)?;
                let new_id = source.shifted(1)?;
                let placement = Placement::RightSibling {
                    after: source.clone(),
                };
                (new_id, renames, placement)
            }
            Direction::LeftSibling => {
                let index = self.tree.index_in_parent(source)?;
                let renames = self.shift_siblings(source, index)?;
                let placement = Placement::LeftSibling {
                    before: renames.apply(source),
                };
                (source.clone(), renames, placement)
            }
        };

        let live = self.tree.id_set();
        renames.validate_against(&live)?;
        let mut after = renames.apply_to_set(&live);
        if !after.insert(new_id.clone()) {
            return Err(TreeError::collision(
                new_id,
                "new node id is still taken after renaming",
            ));
        }
        self.check_promoted_stay_detached(&renames, &after)?;

        tracing::debug!(
            source = %source,
            direction = %direction,
            new_id = %new_id,
            renames = renames.len(),
            "insertion planned"
        );

        Ok(InsertionPlan {
            source: source.clone(),
            new_id,
            label: label.into(),
            placement,
            renames,
        })
    }

    /// Promoted nodes must not gain a parent through this insertion
    ///
    /// Shifting keeps a promoted node's missing prefix, so a new or renamed
    /// id equal to that prefix would silently adopt it.
    fn check_promoted_stay_detached(
        &self,
        renames: &RenameMap,
        after: &BTreeSet<NodeId>,
    ) -> Result<(), TreeError> {
        for promoted in self.tree.promoted() {
            let renamed = renames.apply(promoted);
            if let Some(prefix) = renamed.prefix().filter(|p| after.contains(p)) {
                return Err(TreeError::collision(
                    prefix,
                    format!("would become the parent of promoted node {renamed}"),
                ));
            }
        }
        Ok(())
    }

    /// Shift every sibling of `source` from `start` onwards by one
    ///
    /// Proceeds in ascending index order; each shifted sibling carries its
    /// whole subtree.
    fn shift_siblings(&self, source: &NodeId, start: usize) -> Result<RenameMap, TreeError> {
        let mut renames = RenameMap::new();
        for sibling in self.tree.sibling_list(source).iter().skip(start) {
            let shifted = sibling.shifted(1)?;
            renames.merge(rename_subtree(self.tree, sibling, shifted)?)?;
        }
        Ok(renames)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn id(s: &str) -> NodeId {
        s.parse().unwrap()
    }

    /// Top-level 1, 2, 3; node 2 has children 2.1, 2.2
    fn scenario_tree() -> OutlineTree {
        OutlineTree::from_strs(["1", "2", "3", "2.1", "2.2"]).unwrap()
    }

    fn plan(tree: &OutlineTree, source: &str, direction: Direction) -> InsertionPlan {
        InsertionPlanner::new(tree)
            .plan(&id(source), direction, "New node")
            .unwrap()
    }

    #[test]
    fn right_sibling_shifts_later_siblings() {
        let tree = scenario_tree();
        let plan = plan(&tree, "2.1", Direction::RightSibling);

        assert_eq!(plan.new_id, id("2.2"));
        assert_eq!(plan.rename_count(), 1);
        assert_eq!(plan.renames.apply(&id("2.1")), id("2.1"));
        assert_eq!(plan.renames.apply(&id("2.2")), id("2.3"));
        assert_eq!(plan.placement, Placement::RightSibling { after: id("2.1") });
    }

    #[test]
    fn left_sibling_takes_source_position() {
        let tree = scenario_tree();
        let plan = plan(&tree, "2.2", Direction::LeftSibling);

        assert_eq!(plan.new_id, id("2.2"));
        assert_eq!(plan.rename_count(), 1);
        assert_eq!(plan.renames.apply(&id("2.1")), id("2.1"));
        assert_eq!(plan.renames.apply(&id("2.2")), id("2.3"));
        assert_eq!(plan.placement, Placement::LeftSibling { before: id("2.3") });
    }

    #[test]
    fn child_of_leaf_has_no_renames() {
        let tree = scenario_tree();
        let plan = plan(&tree, "2.1", Direction::Child);

        assert_eq!(plan.new_id, id("2.1.1"));
        assert!(plan.renames.is_empty());
    }

    #[test]
    fn child_appends_after_existing_children() {
        let tree = scenario_tree();
        let plan = plan(&tree, "2", Direction::Child);
        assert_eq!(plan.new_id, id("2.3"));
        assert!(plan.renames.is_empty());
    }

    #[test]
    fn right_sibling_of_last_root_has_no_renames() {
        let tree = OutlineTree::from_strs(["1", "2", "3"]).unwrap();
        let plan = plan(&tree, "3", Direction::RightSibling);

        assert_eq!(plan.new_id, id("4"));
        assert!(plan.renames.is_empty());
    }

    #[test]
    fn left_sibling_of_first_root_shifts_everything() {
        let tree = OutlineTree::from_strs(["1", "2", "3", "1.1", "3.1", "3.1.1"]).unwrap();
        let plan = plan(&tree, "1", Direction::LeftSibling);

        assert_eq!(plan.new_id, id("1"));
        assert_eq!(plan.renames.apply(&id("1")), id("2"));
        assert_eq!(plan.renames.apply(&id("2")), id("3"));
        assert_eq!(plan.renames.apply(&id("3")), id("4"));
        assert_eq!(plan.renames.apply(&id("1.1")), id("2.1"));
        assert_eq!(plan.renames.apply(&id("3.1")), id("4.1"));
        assert_eq!(plan.renames.apply(&id("3.1.1")), id("4.1.1"));
        assert_eq!(plan.rename_count(), 6);
    }

    #[test]
    fn shifted_subtrees_cascade() {
        let tree = OutlineTree::from_strs(["1", "1.1", "1.2", "1.2.1", "1.2.2"]).unwrap();
        let plan = plan(&tree, "1.1", Direction::RightSibling);

        assert_eq!(plan.new_id, id("1.2"));
        assert_eq!(plan.renames.apply(&id("1.2")), id("1.3"));
        assert_eq!(plan.renames.apply(&id("1.2.1")), id("1.3.1"));
        assert_eq!(plan.renames.apply(&id("1.2.2")), id("1.3.2"));
    }

    #[test]
    fn unknown_source_rejected() {
        let tree = scenario_tree();
        let result = InsertionPlanner::new(&tree).plan(&id("9"), Direction::Child, "x");
        assert!(matches!(result, Err(TreeError::SourceNodeNotFound(_))));
    }

    #[test]
    fn child_into_gapped_list_collides() {
        // 2 has children 2.1 and 2.3; count + 1 = 3 is taken
        let tree = OutlineTree::from_strs(["2", "2.1", "2.3"]).unwrap();
        let result = InsertionPlanner::new(&tree).plan(&id("2"), Direction::Child, "x");
        assert!(matches!(result, Err(TreeError::RenameCollision { .. })));
    }

    #[test]
    fn promoted_node_never_gains_a_parent() {
        // 2.5 is promoted; creating 2 would make it a child of 2
        let tree = OutlineTree::from_strs(["1", "2.5"]).unwrap();
        let planner = InsertionPlanner::new(&tree);

        for direction in [Direction::RightSibling, Direction::LeftSibling] {
            let err = planner.plan(&id("1"), direction, "x").unwrap_err();
            assert_eq!(
                err,
                TreeError::collision(id("2"), "would become the parent of promoted node 2.6"),
                "{direction}"
            );
        }
    }

    #[test]
    fn promoted_node_may_grow_siblings() {
        let tree = OutlineTree::from_strs(["1", "3.1"]).unwrap();
        let sibling = plan(&tree, "3.1", Direction::RightSibling);
        assert_eq!(sibling.new_id, id("3.2"));
        assert!(sibling.renames.is_empty());

        let child = plan(&tree, "3.1", Direction::Child);
        assert_eq!(child.new_id, id("3.1.1"));
    }

    #[test]
    fn new_id_unique_after_renames() {
        let tree = scenario_tree();
        for source in ["1", "2", "3", "2.1", "2.2"] {
            for direction in [Direction::Child, Direction::LeftSibling, Direction::RightSibling] {
                let plan = plan(&tree, source, direction);
                let after: BTreeSet<_> = plan.renames.apply_to_set(tree.ids());
                assert!(!after.contains(&plan.new_id), "{source} {direction}");
                assert_eq!(after.len(), tree.len());
            }
        }
    }

    #[test]
    fn direction_parses_wire_names() {
        assert_eq!("child".parse::<Direction>().unwrap(), Direction::Child);
        assert_eq!(
            "left-sibling".parse::<Direction>().unwrap(),
            Direction::LeftSibling
        );
        assert_eq!(
            "right-sibling".parse::<Direction>().unwrap(),
            Direction::RightSibling
        );
        assert!("above".parse::<Direction>().is_err());
        assert_eq!(Direction::LeftSibling.to_string(), "left-sibling");
    }

    #[test]
    fn direction_serde_is_kebab_case() {
        let json = serde_json::to_string(&Direction::RightSibling).unwrap();
        assert_eq!(json, "\"right-sibling\"");
    }
}
