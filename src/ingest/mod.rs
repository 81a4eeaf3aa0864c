//! Batch ingestion of historical cases into the vector store.
//!
//! Each row is embedded on its `context` only, given a fresh UUID, and
//! stored with both `context` and `response` as metadata. Entries are
//! written in fixed-size batches; a failed batch leaves earlier batches
//! persisted and reports how many made it.
//!
//! Ingestion is not idempotent: running it twice over the same rows stores
//! every case twice under new ids.

mod source;

pub use source::{read_cases, read_cases_from_path, REQUIRED_COLUMNS};

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::DEFAULT_BATCH_SIZE;
use crate::error::{Error, Result};
use crate::search::{CaseMetadata, Embedder, IndexedEntry, VectorStore};

/// One input row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseRow {
    pub context: String,
    pub response: String,
}

impl CaseRow {
    pub fn new(context: impl Into<String>, response: impl Into<String>) -> Self {
        Self {
            context: context.into(),
            response: response.into(),
        }
    }
}

/// A row with its generated identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorpusRecord {
    pub id: String,
    pub context: String,
    pub response: String,
}

impl From<CaseRow> for CorpusRecord {
    fn from(row: CaseRow) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            context: row.context,
            response: row.response,
        }
    }
}

/// Embeds rows and writes them to the store in batches.
pub struct Ingestor {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    batch_size: usize,
}

impl Ingestor {
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<dyn VectorStore>) -> Self {
        Self::with_batch_size(embedder, store, DEFAULT_BATCH_SIZE)
    }

    /// A batch size of zero is treated as one.
    pub fn with_batch_size(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        batch_size: usize,
    ) -> Self {
        Self {
            embedder,
            store,
            batch_size: batch_size.max(1),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Embed every row, then upsert in batches. Returns the total inserted.
    ///
    /// All embedding happens before the first write, so an embedding failure
    /// stores nothing. An upsert failure returns [`Error::Upsert`] with the
    /// count persisted by the batches before it.
    pub async fn ingest(&self, rows: Vec<CaseRow>) -> Result<usize> {
        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            let record = CorpusRecord::from(row);
            let vector = self.embedder.embed(&record.context).await.map_err(|e| {
                tracing::warn!("Embedding failed during ingestion: {}", e);
                Error::Embedding(e)
            })?;
            entries.push(IndexedEntry {
                id: record.id,
                vector,
                metadata: CaseMetadata {
                    context: record.context,
                    response: record.response,
                },
            });
        }

        let total = entries.len();
        let mut inserted = 0;
        let mut pending = entries.into_iter().peekable();
        let mut batch_number = 0;
        while pending.peek().is_some() {
            let batch: Vec<IndexedEntry> = pending.by_ref().take(self.batch_size).collect();
            batch_number += 1;
            tracing::debug!(batch = batch_number, size = batch.len(), "Upserting batch");

            let written = self.store.upsert(batch).await.map_err(|source| {
                tracing::warn!(
                    store = self.store.name(),
                    inserted,
                    total,
                    "Upsert failed on batch {}: {}",
                    batch_number,
                    source
                );
                Error::Upsert { inserted, source }
            })?;
            inserted += written;
            metrics::counter!("counsel_upsert_batches_total").increment(1);
        }

        metrics::counter!("counsel_ingested_entries_total").increment(inserted as u64);
        tracing::info!(inserted, batches = batch_number, "Ingestion complete");
        Ok(inserted)
    }

    /// Read a CSV source and ingest it. Source errors abort before any
    /// embedding work.
    pub async fn ingest_csv<R: std::io::Read>(&self, reader: R) -> Result<usize> {
        let rows = read_cases(reader)?;
        self.ingest(rows).await
    }
}
