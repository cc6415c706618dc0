//! Document storage
//!
//! The service reads a document once at the start of an operation and writes
//! it once at the end; stores only need whole-document get and put.

use crate::error::StoreError;
use crate::state::{DocumentId, DocumentState};
use dashmap::DashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

const FILE_EXTENSION: &str = "json";

/// Whole-document key-value store
#[async_trait::async_trait]
pub trait DocumentStore: Send + Sync + std::fmt::Debug {
    /// Fetch a document
    async fn get(&self, id: &DocumentId) -> Result<Option<DocumentState>, StoreError>;

    /// Replace a document
    async fn put(&self, id: &DocumentId, state: DocumentState) -> Result<(), StoreError>;

    /// Stored document ids, sorted
    async fn list(&self) -> Result<Vec<DocumentId>, StoreError>;
}

/// In-memory store
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    documents: DashMap<DocumentId, DocumentState>,
}

impl MemoryDocumentStore {
    /// Create empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: seed a document
    #[must_use]
    pub fn with_document(self, id: DocumentId, state: DocumentState) -> Self {
        self.documents.insert(id, state);
        self
    }

    /// Number of stored documents
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Check if empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

#[async_trait::async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, id: &DocumentId) -> Result<Option<DocumentState>, StoreError> {
        Ok(self.documents.get(id).map(|entry| entry.value().clone()))
    }

    async fn put(&self, id: &DocumentId, state: DocumentState) -> Result<(), StoreError> {
        self.documents.insert(id.clone(), state);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<DocumentId>, StoreError> {
        let mut ids: Vec<DocumentId> = self.documents.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        Ok(ids)
    }
}

/// Directory of `<id>.json` files
///
/// Writes go to a temporary sibling file that is then renamed over the
/// target, so readers never observe a partially written document.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    root: PathBuf,
}

impl JsonFileStore {
    /// Open a store rooted at `root`, creating the directory if needed
    ///
    /// # Errors
    /// Returns [`StoreError::Io`] if the directory cannot be created
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        tokio::fs::create_dir_all(&root)
            .await
            .map_err(|e| StoreError::io(&root, e))?;
        Ok(Self { root })
    }

    /// Store directory
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File backing `id`
    #[must_use]
    pub fn path_for(&self, id: &DocumentId) -> PathBuf {
        self.root.join(format!("{id}.{FILE_EXTENSION}"))
    }
}

#[async_trait::async_trait]
impl DocumentStore for JsonFileStore {
    async fn get(&self, id: &DocumentId) -> Result<Option<DocumentState>, StoreError> {
        let path = self.path_for(id);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::io(path, e)),
        };
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    async fn put(&self, id: &DocumentId, state: DocumentState) -> Result<(), StoreError> {
        let path = self.path_for(id);
        let staging = path.with_extension(format!("{FILE_EXTENSION}.tmp"));
        let bytes = serde_json::to_vec_pretty(&state)?;

        tokio::fs::write(&staging, bytes)
            .await
            .map_err(|e| StoreError::io(&staging, e))?;
        tokio::fs::rename(&staging, &path)
            .await
            .map_err(|e| StoreError::io(&path, e))?;

        tracing::debug!(document = %id, revision = state.revision, "document written");
        Ok(())
    }

    async fn list(&self) -> Result<Vec<DocumentId>, StoreError> {
        let mut entries = tokio::fs::read_dir(&self.root)
            .await
            .map_err(|e| StoreError::io(&self.root, e))?;

        let mut ids = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StoreError::io(&self.root, e))?
        {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(FILE_EXTENSION) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match DocumentId::new(stem) {
                Ok(id) => ids.push(id),
                Err(_) => tracing::warn!(path = %path.display(), "skipping file with invalid document id"),
            }
        }
        ids.sort();
        Ok(ids)
    }
}
