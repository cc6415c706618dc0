//! Stored document state
//!
//! A document is persisted as the triple (annotated text, node table, Mermaid
//! graph text). [`DocumentViews`] is the decoded form the synchronizers work
//! on.

use crate::error::{GraftError, StoreError};
use graft_ident::NodeId;
use graft_views::{AnnotatedDocument, NodeTable, OutlineGraph};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Document key
///
/// Restricted to ASCII letters, digits, `-`, `_` and `.` (not leading), so it
/// is usable as a file name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DocumentId(String);

impl DocumentId {
    /// Validate and wrap a document key
    ///
    /// # Errors
    /// Returns [`StoreError::InvalidDocumentId`] for empty keys, a leading
    /// `.`, or characters outside the allowed set
    pub fn new(id: impl Into<String>) -> Result<Self, StoreError> {
        let id = id.into();
        let valid = !id.is_empty()
            && !id.starts_with('.')
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if valid {
            Ok(Self(id))
        } else {
            Err(StoreError::InvalidDocumentId(id))
        }
    }

    /// Key as a string
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for DocumentId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for DocumentId {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for DocumentId {
    type Error = StoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<DocumentId> for String {
    fn from(id: DocumentId) -> Self {
        id.0
    }
}

/// Persisted form of one document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentState {
    /// Marker-annotated text
    pub text: String,
    /// Node table
    pub table: NodeTable,
    /// Mermaid graph text
    pub graph: String,
    /// Incremented by every successful insertion
    #[serde(default)]
    pub revision: u64,
}

impl DocumentState {
    /// Create state at revision 0
    #[must_use]
    pub fn new(text: impl Into<String>, table: NodeTable, graph: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            table,
            graph: graph.into(),
            revision: 0,
        }
    }

    /// Encode decoded views at `revision`
    #[must_use]
    pub fn from_views(views: &DocumentViews, revision: u64) -> Self {
        Self {
            text: views.text.render(),
            table: views.table.clone(),
            graph: views.graph.to_mermaid(),
            revision,
        }
    }

    /// Decode the text and graph views
    ///
    /// # Errors
    /// Returns [`GraftError::CorruptDocument`] if the graph text does not parse
    pub fn views(&self) -> Result<DocumentViews, GraftError> {
        let graph = OutlineGraph::parse_mermaid(&self.graph)
            .map_err(|source| GraftError::CorruptDocument {
                view: "graph",
                source,
            })?;
        Ok(DocumentViews {
            text: AnnotatedDocument::parse(&self.text),
            table: self.table.clone(),
            graph,
        })
    }

    /// Compare the id sets of the three views
    ///
    /// # Errors
    /// Returns [`GraftError::CorruptDocument`] if the graph text does not parse
    pub fn check_consistency(&self) -> Result<ConsistencyReport, GraftError> {
        Ok(ConsistencyReport::new(&self.views()?))
    }
}

/// Decoded views of one document
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentViews {
    /// Annotated text
    pub text: AnnotatedDocument,
    /// Node table
    pub table: NodeTable,
    /// Presentation graph
    pub graph: OutlineGraph,
}

/// An id that is not present in every view
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Discrepancy {
    /// The id
    pub id: NodeId,
    /// Views lacking it
    pub missing_from: Vec<&'static str>,
}

/// Result of comparing view id sets
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsistencyReport {
    /// Ids appearing in any view but not in all of them
    pub discrepancies: Vec<Discrepancy>,
    /// Ids carried by more than one text marker
    pub duplicate_markers: Vec<NodeId>,
    /// Number of ids present in every view
    pub agreed: usize,
}

impl ConsistencyReport {
    /// Compare decoded views
    #[must_use]
    pub fn new(views: &DocumentViews) -> Self {
        let sets = [
            ("text", views.text.id_set()),
            ("table", views.table.id_set()),
            ("graph", views.graph.outline_ids()),
        ];
        let all: BTreeSet<&NodeId> = sets.iter().flat_map(|(_, ids)| ids.iter()).collect();

        let mut discrepancies = Vec::new();
        let mut agreed = 0;
        for id in all {
            let missing_from: Vec<&'static str> = sets
                .iter()
                .filter(|(_, ids)| !ids.contains(id))
                .map(|(name, _)| *name)
                .collect();
            if missing_from.is_empty() {
                agreed += 1;
            } else {
                discrepancies.push(Discrepancy {
                    id: id.clone(),
                    missing_from,
                });
            }
        }

        Self {
            discrepancies,
            duplicate_markers: views.text.duplicate_ids().into_iter().collect(),
            agreed,
        }
    }

    /// Check if all views agree and no marker is duplicated
    #[inline]
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.discrepancies.is_empty() && self.duplicate_markers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graft_views::NodeEntry;

    fn table(ids: &[&str]) -> NodeTable {
        ids.iter()
            .map(|id| (id.parse::<NodeId>().unwrap(), NodeEntry::new(*id, "role")))
            .collect()
    }

    #[test]
    fn document_id_validation() {
        assert!(DocumentId::new("essay-01_v2.final").is_ok());
        for bad in ["", ".hidden", "../etc", "a/b", "a b", "ü"] {
            assert!(DocumentId::new(bad).is_err(), "{bad:?} accepted");
        }
    }

    #[test]
    fn document_id_serde() {
        let id: DocumentId = serde_json::from_str("\"essay\"").unwrap();
        assert_eq!(id.as_str(), "essay");
        assert!(serde_json::from_str::<DocumentId>("\"a/b\"").is_err());
    }

    #[test]
    fn consistent_document() {
        let state = DocumentState::new(
            "--- 1 ---\nA\n--- 1.1 ---\nB\n",
            table(&["1", "1.1"]),
            "graph TD\n    ROOT --> 1\n    1 --> 1.1\n",
        );
        let report = state.check_consistency().unwrap();
        assert!(report.is_consistent());
        assert_eq!(report.agreed, 2);
    }

    #[test]
    fn discrepancies_name_missing_views() {
        let state = DocumentState::new(
            "--- 1 ---\n--- 2 ---\n--- 2 ---\n",
            table(&["1", "3"]),
            "graph TD\n    1[One]\n",
        );
        let report = state.check_consistency().unwrap();

        assert!(!report.is_consistent());
        assert_eq!(report.duplicate_markers, vec!["2".parse::<NodeId>().unwrap()]);
        assert_eq!(
            report.discrepancies,
            vec![
                Discrepancy {
                    id: "2".parse().unwrap(),
                    missing_from: vec!["table", "graph"],
                },
                Discrepancy {
                    id: "3".parse().unwrap(),
                    missing_from: vec!["text", "graph"],
                },
            ]
        );
    }

    #[test]
    fn corrupt_graph_reported() {
        let state = DocumentState::new("", NodeTable::new(), "pie title x\n");
        let err = state.check_consistency().unwrap_err();
        assert!(matches!(err, GraftError::CorruptDocument { view: "graph", .. }));
    }

    #[test]
    fn views_round_trip_through_state() {
        let state = DocumentState::new(
            "Preamble\n--- 1 ---\nA\n",
            table(&["1"]),
            "graph TD\n    1[One]\n",
        );
        let views = state.views().unwrap();
        let again = DocumentState::from_views(&views, 4);
        assert_eq!(again.text, state.text);
        assert_eq!(again.graph, state.graph);
        assert_eq!(again.revision, 4);
    }
}
