//! Transactional insertion service
//!
//! [`GraftService::insert_node`] runs one insertion as a single transaction:
//!
//! 1. Take the document's lock (one writer per document)
//! 2. Read the stored state once
//! 3. Rebuild the outline tree from the node table and plan the insertion
//! 4. Compute all three synchronized views as new values
//! 5. Verify every view's id set, then write the new state once
//!
//! Any failure before step 5 completes leaves the stored document untouched.

use crate::config::GraftConfig;
use crate::error::GraftError;
use crate::state::{ConsistencyReport, DocumentId, DocumentState, DocumentViews};
use crate::store::DocumentStore;
use dashmap::DashMap;
use graft_ident::NodeId;
use graft_tree::{Direction, InsertionPlan, InsertionPlanner, OutlineTree, RenameMap};
use graft_views::{
    GraphSynchronizer, SyncError, TableSynchronizer, TextSynchronizer, ViewSynchronizer,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Insertion request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertRequest {
    /// Target document
    pub document_id: DocumentId,
    /// Source node id, unparsed
    pub source: String,
    /// Placement relative to the source
    pub direction: Direction,
    /// Label for the new node (blank falls back to the configured default)
    #[serde(default)]
    pub label: String,
}

impl InsertRequest {
    /// Create request with an empty label
    #[must_use]
    pub fn new(document_id: DocumentId, source: impl Into<String>, direction: Direction) -> Self {
        Self {
            document_id,
            source: source.into(),
            direction,
            label: String::new(),
        }
    }

    /// Builder: set label
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }
}

/// Result of a committed insertion
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InsertOutcome {
    /// Id assigned to the new node
    pub new_id: NodeId,
    /// Number of renamed nodes
    pub rename_count: usize,
    /// Every rename applied
    pub renames: RenameMap,
    /// Committed document state
    pub state: DocumentState,
}

/// Insertion service over a document store
#[derive(Debug)]
pub struct GraftService<S> {
    /// Configuration
    config: GraftConfig,
    /// Document storage
    store: Arc<S>,
    /// Per-document write locks
    locks: DashMap<DocumentId, Arc<Mutex<()>>>,
    text: TextSynchronizer,
    table: TableSynchronizer,
    graph: GraphSynchronizer,
}

impl<S: DocumentStore> GraftService<S> {
    /// Create service
    #[must_use]
    pub fn new(config: GraftConfig, store: Arc<S>) -> Self {
        Self {
            text: config.text_synchronizer(),
            table: config.table_synchronizer(),
            graph: config.graph_synchronizer(),
            config,
            store,
            locks: DashMap::new(),
        }
    }

    /// Active configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &GraftConfig {
        &self.config
    }

    /// Underlying store
    #[inline]
    #[must_use]
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Insert a node and synchronize all three views
    ///
    /// # Errors
    /// - [`GraftError::InvalidIdentifier`] for a malformed source id
    /// - [`GraftError::DocumentNotFound`] if the document does not exist
    /// - [`GraftError::SourceNodeNotFound`] if the source is not in the table
    /// - [`GraftError::InsertionPointNotFound`] if the text marker is missing
    ///   or duplicated
    /// - [`GraftError::PartialSynchronizationFailure`] if any view fails to
    ///   synchronize or verify
    /// - [`GraftError::Store`] if reading or writing the document fails
    #[tracing::instrument(
        skip(self, request),
        fields(
            document = %request.document_id,
            source = %request.source,
            direction = %request.direction,
        )
    )]
    pub async fn insert_node(&self, request: InsertRequest) -> Result<InsertOutcome, GraftError> {
        let source: NodeId = request.source.trim().parse()?;
        let label = match request.label.trim() {
            "" => self.config.default_label.clone(),
            label => label.to_string(),
        };

        let lock = self.lock_for(&request.document_id);
        let _guard = lock.lock().await;

        let current = self.load(&request.document_id).await?;
        let views = current.views()?;

        let tree = OutlineTree::build_with_policy(views.table.id_set(), self.config.dangling_prefix)?;
        let plan = InsertionPlanner::new(&tree).plan(&source, request.direction, label)?;

        let updated = self.synchronize(&views, &plan)?;
        let state = DocumentState::from_views(&updated, current.revision + 1);
        self.store.put(&request.document_id, state.clone()).await?;

        tracing::info!(
            new_id = %plan.new_id,
            rename_count = plan.rename_count(),
            revision = state.revision,
            "node inserted"
        );

        Ok(InsertOutcome {
            new_id: plan.new_id,
            rename_count: plan.renames.len(),
            renames: plan.renames,
            state,
        })
    }

    /// Fetch a document
    ///
    /// # Errors
    /// Returns [`GraftError::DocumentNotFound`] if absent
    pub async fn document(&self, id: &DocumentId) -> Result<DocumentState, GraftError> {
        self.load(id).await
    }

    /// Compare a document's view id sets
    ///
    /// # Errors
    /// Returns [`GraftError::DocumentNotFound`] if absent, or
    /// [`GraftError::CorruptDocument`] if its graph does not parse
    pub async fn check(&self, id: &DocumentId) -> Result<ConsistencyReport, GraftError> {
        self.load(id).await?.check_consistency()
    }

    /// Store a document, replacing any existing one
    ///
    /// # Errors
    /// Returns [`GraftError::CorruptDocument`] if the graph does not parse,
    /// or [`GraftError::Store`] on write failure
    pub async fn import(&self, id: &DocumentId, state: DocumentState) -> Result<(), GraftError> {
        state.views()?;

        let lock = self.lock_for(id);
        let _guard = lock.lock().await;
        self.store.put(id, state).await?;
        tracing::info!(document = %id, "document imported");
        Ok(())
    }

    fn lock_for(&self, id: &DocumentId) -> Arc<Mutex<()>> {
        self.locks.entry(id.clone()).or_default().clone()
    }

    async fn load(&self, id: &DocumentId) -> Result<DocumentState, GraftError> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| GraftError::DocumentNotFound(id.clone()))
    }

    /// Compute the three new views; nothing is kept unless all succeed
    fn synchronize(
        &self,
        views: &DocumentViews,
        plan: &InsertionPlan,
    ) -> Result<DocumentViews, GraftError> {
        let text = apply(&self.text, &views.text, plan, 0)?;
        let table = apply(&self.table, &views.table, plan, 1)?;
        let graph = apply(&self.graph, &views.graph, plan, 2)?;

        if self.config.strict_consistency {
            let reference = self.table.node_ids(&table);
            self.text
                .verify(&text, &reference)
                .and_then(|()| self.graph.verify(&graph, &reference))
                .map_err(|source| sync_failure(source, 3))?;
        }

        Ok(DocumentViews { text, table, graph })
    }
}

/// Synchronize one view and check it holds `rename(before) ∪ {new_id}`
fn apply<V: ViewSynchronizer>(
    sync: &V,
    view: &V::View,
    plan: &InsertionPlan,
    completed: usize,
) -> Result<V::View, GraftError> {
    let mut expected: BTreeSet<NodeId> = plan.renames.apply_to_set(&sync.node_ids(view));
    expected.insert(plan.new_id.clone());

    let result = sync
        .synchronize(view, plan)
        .and_then(|updated| sync.verify(&updated, &expected).map(|()| updated));

    result.map_err(|source| match source {
        SyncError::InsertionPointNotFound { id, occurrences } => {
            tracing::error!(view = sync.name(), %id, occurrences, "insertion point not found");
            GraftError::InsertionPointNotFound { id, occurrences }
        }
        other => sync_failure(other, completed),
    })
}

fn sync_failure(source: SyncError, discarded: usize) -> GraftError {
    let view: &'static str = match &source {
        SyncError::AlreadyPresent { view, .. }
        | SyncError::RenameCollapsed { view, .. }
        | SyncError::IdSetMismatch { view, .. } => *view,
        SyncError::InsertionPointNotFound { .. } => "text",
        SyncError::MalformedGraph { .. } => "graph",
    };
    tracing::error!(view, discarded, error = %source, "synchronization failed, discarding views");
    GraftError::PartialSynchronizationFailure {
        view,
        discarded,
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryDocumentStore;
    use graft_views::{NodeEntry, NodeTable};

    fn doc() -> DocumentId {
        "essay".parse().unwrap()
    }

    fn service(state: DocumentState) -> GraftService<MemoryDocumentStore> {
        let store = MemoryDocumentStore::new().with_document(doc(), state);
        GraftService::new(GraftConfig::default(), Arc::new(store))
    }

    fn small() -> DocumentState {
        let table: NodeTable = [("1", "Intro"), ("2", "Body")]
            .into_iter()
            .map(|(id, s)| (id.parse::<NodeId>().unwrap(), NodeEntry::new(s, "role")))
            .collect();
        DocumentState::new(
            "--- 1 ---\nIntro\n--- 2 ---\nBody\n",
            table,
            "graph TD\n    1[Intro]\n    2[Body]\n    ROOT --> 1\n    ROOT --> 2\n",
        )
    }

    #[tokio::test]
    async fn blank_label_uses_default() {
        let svc = service(small());
        let outcome = svc
            .insert_node(InsertRequest::new(doc(), "2", Direction::Child).with_label("   "))
            .await
            .unwrap();

        assert_eq!(outcome.new_id.to_string(), "2.1");
        let entry = outcome.state.table.get(&outcome.new_id).unwrap();
        assert_eq!(entry.text_snippet, "New node");
        assert_eq!(outcome.state.revision, 1);
    }

    #[tokio::test]
    async fn revision_advances_per_commit() {
        let svc = service(small());
        for expected in 1..=3 {
            let outcome = svc
                .insert_node(InsertRequest::new(doc(), "1", Direction::LeftSibling))
                .await
                .unwrap();
            assert_eq!(outcome.state.revision, expected);
        }
        assert_eq!(svc.document(&doc()).await.unwrap().table.len(), 5);
    }

    #[tokio::test]
    async fn malformed_source_is_bad_input() {
        let svc = service(small());
        let err = svc
            .insert_node(InsertRequest::new(doc(), "2.0", Direction::Child))
            .await
            .unwrap_err();
        assert!(matches!(err, GraftError::InvalidIdentifier(_)));
        assert!(err.is_client_error());
    }

    #[tokio::test]
    async fn missing_document() {
        let svc = service(small());
        let other: DocumentId = "other".parse().unwrap();
        let err = svc
            .insert_node(InsertRequest::new(other, "1", Direction::Child))
            .await
            .unwrap_err();
        assert!(matches!(err, GraftError::DocumentNotFound(_)));
    }

    #[tokio::test]
    async fn import_rejects_corrupt_graph() {
        let svc = service(small());
        let mut bad = small();
        bad.graph = "gantt\n".to_string();
        let err = svc.import(&doc(), bad).await.unwrap_err();
        assert!(matches!(err, GraftError::CorruptDocument { .. }));
        assert_eq!(svc.document(&doc()).await.unwrap(), small());
    }

    #[test]
    fn request_wire_format() {
        let request: InsertRequest = serde_json::from_str(
            r#"{"document_id": "essay", "source": "2.1", "direction": "right-sibling"}"#,
        )
        .unwrap();
        assert_eq!(request.direction, Direction::RightSibling);
        assert!(request.label.is_empty());
    }
}
