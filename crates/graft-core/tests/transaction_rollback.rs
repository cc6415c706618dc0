//! Failure handling: every rejected insertion leaves the stored document
//! exactly as it was, and the error says whose fault it was.

use graft_core::{ErrorClass, GraftConfig, GraftError, InsertRequest};
use graft_test_utils::{id, memory_service, memory_service_with, sample_state, state_from_ids};
use graft_tree::{DanglingPrefixPolicy, Direction};
use graft_views::{AnnotatedDocument, OutlineGraph, Section};

/// Tenet: an unknown source id is the caller's fault.
#[tokio::test]
async fn unknown_source_is_bad_input() {
    let (svc, doc) = memory_service(sample_state());
    let err = svc
        .insert_node(InsertRequest::new(doc.clone(), "7", Direction::Child))
        .await
        .unwrap_err();

    assert!(matches!(err, GraftError::SourceNodeNotFound(ref n) if *n == id("7")));
    assert_eq!(err.class(), ErrorClass::BadInput);
    assert_eq!(svc.document(&doc).await.unwrap(), sample_state());
}

/// Tenet: a missing text marker aborts the whole insertion.
#[tokio::test]
async fn missing_marker_rolls_back() {
    let mut state = sample_state();
    let mut text = AnnotatedDocument::parse(&state.text);
    text.sections.retain(|s| s.id != id("2.1"));
    state.text = text.render();

    let (svc, doc) = memory_service(state.clone());
    let err = svc
        .insert_node(InsertRequest::new(doc.clone(), "2.1", Direction::RightSibling))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        GraftError::InsertionPointNotFound { occurrences: 0, .. }
    ));
    assert_eq!(err.class(), ErrorClass::Internal);
    assert_eq!(svc.document(&doc).await.unwrap(), state);
}

/// Tenet: a duplicated marker is as fatal as a missing one.
#[tokio::test]
async fn duplicate_marker_is_ambiguous() {
    let mut state = sample_state();
    let mut text = AnnotatedDocument::parse(&state.text);
    text.sections.push(Section::new(id("2"), "\ncopy\n"));
    state.text = text.render();

    let (svc, doc) = memory_service(state.clone());
    let err = svc
        .insert_node(InsertRequest::new(doc.clone(), "2", Direction::Child))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        GraftError::InsertionPointNotFound { occurrences: 2, .. }
    ));
    assert_eq!(svc.document(&doc).await.unwrap(), state);
}

/// Tenet: a view that drifted from the table is caught after synchronizing,
/// and the already computed views are discarded.
#[tokio::test]
async fn desynchronized_graph_is_partial_failure() {
    let mut state = sample_state();
    let mut graph = OutlineGraph::parse_mermaid(&state.graph).unwrap();
    graph.nodes.retain(|n| n.id != "2.2");
    graph.edges.retain(|e| e.target != "2.2");
    state.graph = graph.to_mermaid();

    let (svc, doc) = memory_service(state.clone());
    let err = svc
        .insert_node(InsertRequest::new(doc.clone(), "2.1", Direction::RightSibling))
        .await
        .unwrap_err();

    match &err {
        GraftError::PartialSynchronizationFailure {
            view, discarded, ..
        } => {
            assert_eq!(*view, "graph");
            assert_eq!(*discarded, 3);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(err.class(), ErrorClass::Internal);
    assert_eq!(svc.document(&doc).await.unwrap(), state);
}

/// Tenet: relaxing cross-view checks lets a drifted document still accept
/// insertions that each view can apply on its own.
#[tokio::test]
async fn relaxed_consistency_tolerates_drift() {
    let mut state = sample_state();
    let mut graph = OutlineGraph::parse_mermaid(&state.graph).unwrap();
    graph.nodes.retain(|n| n.id != "2.2");
    graph.edges.retain(|e| e.target != "2.2");
    state.graph = graph.to_mermaid();

    let config = GraftConfig::default().with_strict_consistency(false);
    let (svc, doc) = memory_service_with(config, state);
    let outcome = svc
        .insert_node(InsertRequest::new(doc, "2.1", Direction::RightSibling))
        .await
        .unwrap();

    let graph = OutlineGraph::parse_mermaid(&outcome.state.graph).unwrap();
    assert!(graph.node("2.2").is_some());
    assert!(graph.node("2.3").is_none());
}

/// Tenet: a stray marker occupying the planned id is a text failure.
#[tokio::test]
async fn stray_marker_blocks_new_id() {
    let mut state = sample_state();
    let mut text = AnnotatedDocument::parse(&state.text);
    text.sections.push(Section::new(id("2.3"), "\nstray\n"));
    state.text = text.render();

    let (svc, doc) = memory_service(state.clone());
    let err = svc
        .insert_node(InsertRequest::new(doc.clone(), "2", Direction::Child))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        GraftError::PartialSynchronizationFailure {
            view: "text",
            discarded: 0,
            ..
        }
    ));
    assert_eq!(svc.document(&doc).await.unwrap(), state);
}

/// Tenet: under the reject policy a dangling prefix stops the insertion;
/// under the default policy the node is promoted to top level.
#[tokio::test]
async fn dangling_prefix_policy() {
    let state = state_from_ids(&["1", "3.1"]);

    let config = GraftConfig::default().with_dangling_prefix(DanglingPrefixPolicy::Reject);
    let (strict, doc) = memory_service_with(config, state.clone());
    let err = strict
        .insert_node(InsertRequest::new(doc.clone(), "1", Direction::Child))
        .await
        .unwrap_err();
    assert!(matches!(err, GraftError::DanglingParentPrefix { .. }));
    assert_eq!(strict.document(&doc).await.unwrap(), state);

    let (lenient, doc) = memory_service(state);
    let outcome = lenient
        .insert_node(InsertRequest::new(doc, "3.1", Direction::RightSibling))
        .await
        .unwrap();
    assert_eq!(outcome.new_id, id("3.2"));
}

/// Tenet: an insertion that would recreate a promoted node's missing parent
/// is refused, so the node never changes parent behind the graph's back.
#[tokio::test]
async fn promoted_node_is_not_adopted() {
    let state = state_from_ids(&["1", "2.5"]);
    let (svc, doc) = memory_service(state.clone());

    for direction in [Direction::RightSibling, Direction::LeftSibling] {
        let err = svc
            .insert_node(InsertRequest::new(doc.clone(), "1", direction))
            .await
            .unwrap_err();
        assert!(matches!(err, GraftError::RenameCollision { ref target, .. } if *target == id("2")));
        assert_eq!(err.class(), ErrorClass::Internal);
    }
    assert_eq!(svc.document(&doc).await.unwrap(), state);
}

/// Tenet: a corrupt stored graph is reported as such, not as bad input.
#[tokio::test]
async fn corrupt_graph_is_internal() {
    let mut state = sample_state();
    state.graph = "journey\n".to_string();

    let (svc, doc) = memory_service(state);
    let err = svc
        .insert_node(InsertRequest::new(doc, "1", Direction::Child))
        .await
        .unwrap_err();
    assert!(matches!(err, GraftError::CorruptDocument { view: "graph", .. }));
    assert!(!err.is_client_error());
}
