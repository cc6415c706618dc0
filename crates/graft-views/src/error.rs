//! Error types for view synchronization

use graft_ident::NodeId;

/// Errors raised while applying an insertion to a single view
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    /// Source marker missing from the text, or present more than once
    #[error("insertion point not found for '{id}' ({occurrences} markers)")]
    InsertionPointNotFound {
        /// Post-rename source id
        id: NodeId,
        /// How many markers carry the id (0 = missing, >1 = ambiguous)
        occurrences: usize,
    },

    /// The new id is already present in the view
    #[error("{view}: node '{id}' already present")]
    AlreadyPresent {
        /// View name
        view: &'static str,
        /// Conflicting id
        id: NodeId,
    },

    /// Applying renames merged two entries into one
    #[error("{view}: renaming collapsed {expected} entries into {actual}")]
    RenameCollapsed {
        /// View name
        view: &'static str,
        /// Entry count before renaming
        expected: usize,
        /// Entry count after renaming
        actual: usize,
    },

    /// View's id set differs from the expected one after synchronizing
    #[error(
        "{view}: id set mismatch (missing {}, unexpected {})",
        id_list(.missing),
        id_list(.unexpected)
    )]
    IdSetMismatch {
        /// View name
        view: &'static str,
        /// Expected ids absent from the view
        missing: Vec<NodeId>,
        /// Ids present in the view but not expected
        unexpected: Vec<NodeId>,
    },

    /// Stored graph text could not be parsed
    #[error("malformed graph at line {line}: {reason}")]
    MalformedGraph {
        /// 1-based line number
        line: usize,
        /// Parser diagnostic
        reason: String,
    },
}

fn id_list(ids: &[NodeId]) -> String {
    let rendered: Vec<String> = ids.iter().map(ToString::to_string).collect();
    format!("[{}]", rendered.join(", "))
}

impl SyncError {
    /// Create malformed graph error
    #[inline]
    #[must_use]
    pub fn malformed_graph(line: usize, reason: impl Into<String>) -> Self {
        Self::MalformedGraph {
            line,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insertion_point_display() {
        let err = SyncError::InsertionPointNotFound {
            id: "2.1".parse().unwrap(),
            occurrences: 0,
        };
        assert_eq!(
            err.to_string(),
            "insertion point not found for '2.1' (0 markers)"
        );
    }

    #[test]
    fn mismatch_display() {
        let err = SyncError::IdSetMismatch {
            view: "graph",
            missing: vec!["3".parse().unwrap()],
            unexpected: Vec::new(),
        };
        assert_eq!(
            err.to_string(),
            "graph: id set mismatch (missing [3], unexpected [])"
        );
    }

    #[test]
    fn malformed_graph_display() {
        let err = SyncError::malformed_graph(3, "dangling arrow");
        assert_eq!(err.to_string(), "malformed graph at line 3: dangling arrow");
    }
}
