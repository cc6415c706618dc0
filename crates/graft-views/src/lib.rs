//! Outline Graft Views
//!
//! The three representations of an outline and the synchronizers that keep
//! them consistent after an insertion.
//!
//! # Core Concepts
//!
//! - [`ViewSynchronizer`]: Shared contract (apply renames, then insert)
//! - [`TextSynchronizer`]: Marker-annotated source text
//! - [`TableSynchronizer`]: Node id → metadata table
//! - [`GraphSynchronizer`]: Node/edge presentation graph (Mermaid)
//!
//! Synchronizers are pure: they return a new view and leave their input
//! untouched, so a failed operation never leaves a half-updated view behind.
//!
//! # Example
//!
//! ```rust
//! use graft_tree::{Direction, InsertionPlanner, OutlineTree};
//! use graft_views::{AnnotatedDocument, SiblingAnchor, TextSynchronizer, ViewSynchronizer};
//!
//! let doc = AnnotatedDocument::parse("--- 1 ---\nIntro\n--- 2 ---\nBody\n");
//! let tree = OutlineTree::build(doc.ids()).unwrap();
//! let plan = InsertionPlanner::new(&tree)
//!     .plan(&"1".parse().unwrap(), Direction::RightSibling, "Aside")
//!     .unwrap();
//!
//! let sync = TextSynchronizer::new(SiblingAnchor::SubtreeEnd);
//! let updated = sync.synchronize(&doc, &plan).unwrap();
//! assert!(updated.render().contains("--- 3 ---\nBody"));
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod assembly;
pub mod error;
pub mod graph;
pub mod synchronizer;
pub mod table;
pub mod text;

// Re-exports
pub use error::SyncError;
pub use graph::{GraphEdge, GraphNode, GraphSynchronizer, OutlineGraph, DEFAULT_TOP_LEVEL_ANCHOR};
pub use synchronizer::ViewSynchronizer;
pub use table::{NodeEntry, NodeTable, TableSynchronizer, DEFAULT_ADDED_ROLE};
pub use text::{marker, parse_marker, AnnotatedDocument, Section, SiblingAnchor, TextSynchronizer};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with views
    pub use crate::{
        AnnotatedDocument, GraphSynchronizer, NodeEntry, NodeTable, OutlineGraph, SiblingAnchor,
        SyncError, TableSynchronizer, TextSynchronizer, ViewSynchronizer,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
