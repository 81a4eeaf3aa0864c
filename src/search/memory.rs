//! Process-local vector store with brute-force cosine search.

use std::cmp::Ordering;
use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::store::{IndexedEntry, ScoredEntry, VectorStore};
use crate::error::BackendError;

/// Cosine similarity in [-1, 1]. Zero-magnitude vectors score 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0;
    let mut norm_a = 0.0;
    let mut norm_b = 0.0;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Entries in insertion order plus an id -> position index.
#[derive(Default)]
struct Slots {
    entries: Vec<IndexedEntry>,
    positions: HashMap<String, usize>,
}

impl Slots {
    fn put(&mut self, entry: IndexedEntry) {
        match self.positions.get(&entry.id).copied() {
            Some(position) => self.entries[position] = entry,
            None => {
                self.positions.insert(entry.id.clone(), self.entries.len());
                self.entries.push(entry);
            }
        }
    }
}

/// In-memory store. Entries live in insertion order; upserting an existing
/// id replaces it in place.
#[derive(Default)]
pub struct InMemoryStore {
    dimensions: Option<usize>,
    slots: RwLock<Slots>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that rejects vectors of any other length.
    pub fn with_dimensions(dimensions: usize) -> Self {
        Self {
            dimensions: Some(dimensions),
            slots: RwLock::new(Slots::default()),
        }
    }

    pub async fn len(&self) -> usize {
        self.slots.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.slots.read().await.entries.is_empty()
    }

    /// Snapshot of all stored entries.
    pub async fn entries(&self) -> Vec<IndexedEntry> {
        self.slots.read().await.entries.clone()
    }

    fn check_dimensions(&self, len: usize) -> Result<(), BackendError> {
        match self.dimensions {
            Some(expected) if expected != len => Err(BackendError::request(
                "memory",
                format!("vector dimension mismatch: expected {}, got {}", expected, len),
            )),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl VectorStore for InMemoryStore {
    async fn upsert(&self, batch: Vec<IndexedEntry>) -> Result<usize, BackendError> {
        for entry in &batch {
            self.check_dimensions(entry.vector.len())?;
        }

        let written = batch.len();
        let mut slots = self.slots.write().await;
        for entry in batch {
            slots.put(entry);
        }
        Ok(written)
    }

    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        include_metadata: bool,
    ) -> Result<Vec<ScoredEntry>, BackendError> {
        self.check_dimensions(vector.len())?;

        let slots = self.slots.read().await;
        let mut scored: Vec<(f32, &IndexedEntry)> = slots
            .entries
            .iter()
            .map(|entry| (cosine_similarity(vector, entry.vector.as_slice()), entry))
            .collect();
        // Stable sort keeps insertion order among equal scores.
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));
        scored.truncate(top_k);

        Ok(scored
            .into_iter()
            .map(|(score, entry)| ScoredEntry {
                id: entry.id.clone(),
                score,
                metadata: include_metadata.then(|| entry.metadata.clone()),
            })
            .collect())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
