//! Vector store capability.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::Embedding;
use crate::error::BackendError;

/// Metadata kept next to every indexed vector.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseMetadata {
    /// The situation; the stored vector is always derived from this field
    pub context: String,
    /// The counseling action taken
    pub response: String,
}

/// The persisted unit in the vector store.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedEntry {
    pub id: String,
    pub vector: Embedding,
    pub metadata: CaseMetadata,
}

/// A nearest-neighbour hit as reported by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredEntry {
    pub id: String,
    /// The store's own similarity score, not renormalized
    pub score: f32,
    /// Present only when metadata was requested
    pub metadata: Option<CaseMetadata>,
}

/// Nearest-neighbour store holding embedded cases.
///
/// The index is expected to exist already with [`super::EMBEDDING_DIM`]
/// dimensions and the cosine metric.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert or replace a batch of entries. Returns how many were written.
    async fn upsert(&self, entries: Vec<IndexedEntry>) -> Result<usize, BackendError>;

    /// The `top_k` entries closest to `vector`, best first.
    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        include_metadata: bool,
    ) -> Result<Vec<ScoredEntry>, BackendError>;

    /// Backend name used in logs and errors.
    fn name(&self) -> &str;
}
