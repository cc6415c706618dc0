//! Testing utilities for the outline graft workspace
//!
//! Shared fixtures, builders and assertions.

#![allow(missing_docs)]

use graft_core::{DocumentId, DocumentState, GraftConfig, GraftService, MemoryDocumentStore};
use graft_ident::NodeId;
use graft_tree::OutlineTree;
use graft_views::{
    AnnotatedDocument, GraphEdge, GraphNode, NodeEntry, NodeTable, OutlineGraph, Section,
    DEFAULT_TOP_LEVEL_ANCHOR,
};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Outline used by the worked scenarios: `1, 2 {2.1, 2.2}, 3`
pub const SAMPLE_IDS: [&str; 5] = ["1", "2", "2.1", "2.2", "3"];

pub fn id(s: &str) -> NodeId {
    s.parse().unwrap()
}

pub fn doc_id(s: &str) -> DocumentId {
    s.parse().unwrap()
}

pub fn ids(list: &[&str]) -> BTreeSet<NodeId> {
    list.iter().map(|s| id(s)).collect()
}

/// Consistent document whose views all hold exactly `list`
///
/// Sections and table entries follow outline order. The graph links each
/// node to its parent prefix, or to `ROOT` at the top level.
pub fn state_from_ids(list: &[&str]) -> DocumentState {
    let sorted: Vec<NodeId> = ids(list).into_iter().collect();

    let text = AnnotatedDocument {
        preamble: String::new(),
        sections: sorted
            .iter()
            .map(|n| Section::new(n.clone(), format!("\nBody of {n}.\n\n")))
            .collect(),
    };

    let table: NodeTable = sorted
        .iter()
        .map(|n| (n.clone(), NodeEntry::new(format!("Node {n}"), "section")))
        .collect();

    let mut graph = OutlineGraph::default();
    for n in &sorted {
        graph.nodes.push(GraphNode::new(n.to_string(), format!("Node {n}")));
    }
    let tree = OutlineTree::build(sorted.iter().cloned()).unwrap();
    for n in &sorted {
        let parent = tree
            .parent_of(n)
            .map_or_else(|| DEFAULT_TOP_LEVEL_ANCHOR.to_string(), ToString::to_string);
        graph.edges.push(GraphEdge::new(parent, n.to_string()));
    }

    DocumentState::new(text.render(), table, graph.to_mermaid())
}

/// The scenario document
pub fn sample_state() -> DocumentState {
    state_from_ids(&SAMPLE_IDS)
}

/// Service over an in-memory store seeded with `state` under `essay`
pub fn memory_service(state: DocumentState) -> (GraftService<MemoryDocumentStore>, DocumentId) {
    memory_service_with(GraftConfig::default(), state)
}

pub fn memory_service_with(
    config: GraftConfig,
    state: DocumentState,
) -> (GraftService<MemoryDocumentStore>, DocumentId) {
    let id = doc_id("essay");
    let store = MemoryDocumentStore::new().with_document(id.clone(), state);
    (GraftService::new(config, Arc::new(store)), id)
}

/// Id sets of (text, table, graph)
pub fn view_id_sets(state: &DocumentState) -> [BTreeSet<NodeId>; 3] {
    let views = state.views().unwrap();
    [
        views.text.id_set(),
        views.table.id_set(),
        views.graph.outline_ids(),
    ]
}

/// Assert all views hold the same ids with no duplicate markers
pub fn assert_views_agree(state: &DocumentState) {
    let report = state.check_consistency().unwrap();
    assert!(report.is_consistent(), "views disagree: {report:?}");
}

/// Assert every sibling list is numbered 1..=N
///
/// Top-level nodes promoted from a dangling prefix are ignored.
pub fn assert_contiguous(set: &BTreeSet<NodeId>) {
    let mut groups: BTreeMap<Option<NodeId>, Vec<u32>> = BTreeMap::new();
    for n in set {
        let prefix = n.prefix();
        if prefix.as_ref().map_or(true, |p| set.contains(p)) {
            groups.entry(prefix).or_default().push(n.sequence());
        }
    }
    for (prefix, mut sequences) in groups {
        sequences.sort_unstable();
        let expected: Vec<u32> = (1..).take(sequences.len()).collect();
        assert_eq!(sequences, expected, "siblings under {prefix:?} not contiguous");
    }
}

/// Marker ids in text order
pub fn text_order(state: &DocumentState) -> Vec<String> {
    AnnotatedDocument::parse(&state.text)
        .ids()
        .map(|n| n.to_string())
        .collect()
}
