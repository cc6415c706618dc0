//! Outline Graft Identifiers
//!
//! Hierarchical dotted-sequence identifiers for outline nodes.
//!
//! # Core Concepts
//!
//! - [`NodeId`]: Validated identifier such as `2.1.3`
//! - [`parse`]: Split an identifier into parent prefix and sequence
//! - [`compose`]: Build an identifier from a prefix and a sequence
//!
//! # Example
//!
//! ```rust
//! use graft_ident::{compose, parse, NodeId};
//!
//! let (prefix, seq) = parse("2.1.3").unwrap();
//! assert_eq!(prefix.unwrap().to_string(), "2.1");
//! assert_eq!(seq, 3);
//!
//! let parent: NodeId = "2.1".parse().unwrap();
//! assert_eq!(compose(Some(&parent), 4).unwrap().to_string(), "2.1.4");
//! assert_eq!(compose(None, 7).unwrap().to_string(), "7");
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod id;

pub use id::{compose, parse, IdentError, NodeId};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
