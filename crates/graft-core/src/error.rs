//! Error types for the insertion service
//!
//! Every failure surfaces as a [`GraftError`]. [`GraftError::class`] tells a
//! transport layer whether the caller sent a bad request or the stored
//! document is inconsistent.

use crate::state::DocumentId;
use graft_ident::{IdentError, NodeId};
use graft_tree::TreeError;
use graft_views::SyncError;
use std::path::PathBuf;

/// Broad failure category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Caller error (4xx-style)
    BadInput,
    /// Stored state or engine inconsistency (5xx-style)
    Internal,
}

/// Main service error type
#[derive(Debug, thiserror::Error)]
pub enum GraftError {
    /// Malformed identifier in the request
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(#[from] IdentError),

    /// Source id absent from the node table
    #[error("source node not found: {0}")]
    SourceNodeNotFound(NodeId),

    /// Text marker for the source missing or ambiguous
    #[error("insertion point not found for '{id}' ({occurrences} markers)")]
    InsertionPointNotFound {
        /// Post-rename source id
        id: NodeId,
        /// Number of markers carrying the id
        occurrences: usize,
    },

    /// Stored id whose parent prefix is absent (reject policy only)
    #[error("identifier '{id}' has dangling parent prefix '{prefix}'")]
    DanglingParentPrefix {
        /// Offending identifier
        id: NodeId,
        /// Missing parent prefix
        prefix: NodeId,
    },

    /// Planned renames would merge two nodes
    #[error("rename collision on '{target}': {reason}")]
    RenameCollision {
        /// Identifier claimed twice
        target: NodeId,
        /// Description
        reason: String,
    },

    /// A view failed to synchronize; every computed view was discarded
    #[error("{view} synchronization failed ({discarded} views discarded): {source}")]
    PartialSynchronizationFailure {
        /// View that failed
        view: &'static str,
        /// Views already computed and thrown away
        discarded: usize,
        /// Underlying failure
        #[source]
        source: SyncError,
    },

    /// Stored view could not be decoded
    #[error("stored {view} view is corrupt: {source}")]
    CorruptDocument {
        /// View that failed to decode
        view: &'static str,
        /// Decoder diagnostic
        #[source]
        source: SyncError,
    },

    /// No document stored under the id
    #[error("document not found: {0}")]
    DocumentNotFound(DocumentId),

    /// Storage failure
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Configuration failure
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl GraftError {
    /// Failure category
    ///
    /// A sequence overflow comes from shifting stored ids, never from
    /// parsing a request, so it counts as internal.
    #[must_use]
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::InvalidIdentifier(IdentError::SequenceOverflow(_)) => ErrorClass::Internal,
            Self::InvalidIdentifier(_)
            | Self::SourceNodeNotFound(_)
            | Self::DocumentNotFound(_)
            | Self::Store(StoreError::InvalidDocumentId(_)) => ErrorClass::BadInput,
            _ => ErrorClass::Internal,
        }
    }

    /// Check if the caller is at fault
    #[inline]
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        self.class() == ErrorClass::BadInput
    }
}

impl From<TreeError> for GraftError {
    fn from(err: TreeError) -> Self {
        match err {
            TreeError::InvalidIdentifier(e) => Self::InvalidIdentifier(e),
            TreeError::SourceNodeNotFound(id) => Self::SourceNodeNotFound(id),
            TreeError::DanglingParentPrefix { id, prefix } => {
                Self::DanglingParentPrefix { id, prefix }
            }
            TreeError::RenameCollision { target, reason } => {
                Self::RenameCollision { target, reason }
            }
        }
    }
}

/// Document store errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Document id unusable as a storage key
    #[error("invalid document id '{0}'")]
    InvalidDocumentId(String),

    /// Filesystem failure
    #[error("io error at {path}: {source}")]
    Io {
        /// Path being accessed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Stored document could not be encoded or decoded
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Create io error for `path`
    #[inline]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("cannot read {path}: {source}")]
    Io {
        /// Config path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Config text is not valid TOML for [`crate::GraftConfig`]
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A setting has an unusable value
    #[error("invalid setting {field}: {reason}")]
    Invalid {
        /// Setting name
        field: &'static str,
        /// Why it was rejected
        reason: String,
    },
}
