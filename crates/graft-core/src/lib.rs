//! Outline Graft Core
//!
//! Transactional node insertion over stored documents. Each document is the
//! triple (annotated text, node table, presentation graph); an insertion
//! plans the new id and every cascading rename, synchronizes all three views,
//! verifies them, and commits them together or not at all.
//!
//! # Concurrency
//!
//! One writer per document: insertions on the same document are serialized
//! by a per-document lock, while different documents proceed in parallel.
//!
//! # Example
//!
//! ```rust
//! use graft_core::{
//!     DocumentId, DocumentState, GraftConfig, GraftService, InsertRequest, MemoryDocumentStore,
//! };
//! use graft_ident::NodeId;
//! use graft_tree::Direction;
//! use graft_views::{NodeEntry, NodeTable};
//! use std::sync::Arc;
//!
//! let intro: NodeId = "1".parse().unwrap();
//! let table: NodeTable = std::iter::once((intro, NodeEntry::new("Intro", "intro"))).collect();
//! let state = DocumentState::new("--- 1 ---\nHello\n", table, "graph TD\n    1[Intro]\n");
//! let id: DocumentId = "essay".parse().unwrap();
//!
//! let store = MemoryDocumentStore::new().with_document(id.clone(), state);
//! let service = GraftService::new(GraftConfig::default(), Arc::new(store));
//!
//! let runtime = tokio::runtime::Runtime::new().unwrap();
//! let outcome = runtime
//!     .block_on(service.insert_node(
//!         InsertRequest::new(id, "1", Direction::RightSibling).with_label("Aside"),
//!     ))
//!     .unwrap();
//! assert_eq!(outcome.new_id.to_string(), "2");
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod config;
pub mod error;
pub mod service;
pub mod state;
pub mod store;

// Re-exports
pub use config::{GraftConfig, DEFAULT_LABEL};
pub use error::{ConfigError, ErrorClass, GraftError, StoreError};
pub use service::{GraftService, InsertOutcome, InsertRequest};
pub use state::{ConsistencyReport, Discrepancy, DocumentId, DocumentState, DocumentViews};
pub use store::{DocumentStore, JsonFileStore, MemoryDocumentStore};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for driving the service
    pub use crate::{
        DocumentId, DocumentState, DocumentStore, GraftConfig, GraftError, GraftService,
        InsertOutcome, InsertRequest, MemoryDocumentStore,
    };
    pub use graft_tree::Direction;
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
