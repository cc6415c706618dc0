//! Outline Graft Tree
//!
//! In-memory outline tree rebuilt from a flat identifier set, plus the
//! insertion planner and the cascading rename engine.
//!
//! # Overview
//!
//! - **OutlineTree**: arena of nodes keyed by [`NodeId`]; parents are lookup keys
//! - **RenameMap**: injective old-id → new-id mapping for one operation
//! - **InsertionPlanner**: computes the new id and every rename an insertion needs
//!
//! # Example
//!
//! ```rust
//! use graft_tree::{Direction, InsertionPlanner, OutlineTree};
//!
//! let tree = OutlineTree::from_strs(["1", "2", "2.1", "2.2", "3"]).unwrap();
//! let plan = InsertionPlanner::new(&tree)
//!     .plan(&"2.1".parse().unwrap(), Direction::RightSibling, "New node")
//!     .unwrap();
//!
//! assert_eq!(plan.new_id.to_string(), "2.2");
//! assert_eq!(plan.renames.apply(&"2.2".parse().unwrap()).to_string(), "2.3");
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod error;
pub mod planner;
pub mod rename;
pub mod tree;

// Re-exports
pub use error::TreeError;
pub use graft_ident::{compose, parse, IdentError, NodeId};
pub use planner::{Direction, InsertionPlan, InsertionPlanner, Placement};
pub use rename::{rename_subtree, RenameMap};
pub use tree::{DanglingPrefixPolicy, OutlineNode, OutlineTree};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for tree operations
    pub use crate::{
        DanglingPrefixPolicy, Direction, InsertionPlan, InsertionPlanner, NodeId, OutlineTree,
        Placement, RenameMap, TreeError,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
