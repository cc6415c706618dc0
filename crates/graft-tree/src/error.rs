//! Error types for tree construction and insertion planning

use graft_ident::{IdentError, NodeId};

/// Errors from building the outline tree or planning an insertion
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    /// Malformed identifier string
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(#[from] IdentError),

    /// Source node is not part of the tree
    #[error("source node not found: {0}")]
    SourceNodeNotFound(NodeId),

    /// Identifier whose parent prefix is not in the id set
    #[error("identifier '{id}' has dangling parent prefix '{prefix}'")]
    DanglingParentPrefix {
        /// Offending identifier
        id: NodeId,
        /// Missing parent prefix
        prefix: NodeId,
    },

    /// Rename map would not be a bijection over the live id set
    #[error("rename collision on '{target}': {reason}")]
    RenameCollision {
        /// Identifier claimed twice
        target: NodeId,
        /// Human-readable description
        reason: String,
    },
}

impl TreeError {
    /// Create rename collision error
    #[inline]
    #[must_use]
    pub fn collision(target: NodeId, reason: impl Into<String>) -> Self {
        Self::RenameCollision {
            target,
            reason: reason.into(),
        }
    }

    /// Check if the error was caused by request input rather than state
    #[inline]
    #[must_use]
    pub fn is_bad_input(&self) -> bool {
        match self {
            Self::InvalidIdentifier(IdentError::SequenceOverflow(_)) => false,
            Self::InvalidIdentifier(_) | Self::SourceNodeNotFound(_) => true,
            Self::DanglingParentPrefix { .. } | Self::RenameCollision { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tree_error_display() {
        let err = TreeError::SourceNodeNotFound("4.2".parse().unwrap());
        assert_eq!(err.to_string(), "source node not found: 4.2");
    }

    #[test]
    fn ident_error_converts() {
        let ident = "x".parse::<NodeId>().unwrap_err();
        let err: TreeError = ident.into();
        assert!(matches!(err, TreeError::InvalidIdentifier(_)));
        assert!(err.is_bad_input());
    }

    #[test]
    fn collision_is_not_bad_input() {
        let err = TreeError::collision("2".parse().unwrap(), "claimed twice");
        assert!(!err.is_bad_input());
        assert!(err.to_string().contains("claimed twice"));
    }

    #[test]
    fn overflow_is_not_bad_input() {
        let err = TreeError::from(IdentError::SequenceOverflow("4294967295".to_string()));
        assert!(!err.is_bad_input());
    }
}
