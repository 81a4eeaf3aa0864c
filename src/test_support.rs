//! Deterministic collaborators for unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::BackendError;
use crate::search::{CaseMetadata, Embedder, Embedding, IndexedEntry, ScoredEntry, VectorStore};
use crate::suggest::Generator;

/// Small fixed-dimension embedder. Each text maps to a vector derived from
/// its bytes, so equal texts always give equal vectors.
pub struct TableEmbedder {
    calls: AtomicUsize,
    texts: Mutex<Vec<String>>,
    fail: bool,
}

impl TableEmbedder {
    pub const DIM: usize = 8;

    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            texts: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every text embedded so far, in call order.
    pub fn texts(&self) -> Vec<String> {
        self.texts.lock().unwrap().clone()
    }

    pub fn vector_for(text: &str) -> Vec<f32> {
        let mut vector = vec![0.0; Self::DIM];
        for (i, byte) in text.bytes().enumerate() {
            vector[i % Self::DIM] += byte as f32 / 255.0;
        }
        vector
    }
}

#[async_trait]
impl Embedder for TableEmbedder {
    async fn embed(&self, text: &str) -> Result<Embedding, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.texts.lock().unwrap().push(text.to_string());
        if self.fail {
            return Err(BackendError::request("table", "model crashed"));
        }
        Ok(Embedding::new(Self::vector_for(text)))
    }

    fn dimensions(&self) -> usize {
        Self::DIM
    }
}

/// A query as seen by [`ScriptedStore`].
#[derive(Debug, Clone)]
pub struct RecordedQuery {
    pub top_k: usize,
    pub include_metadata: bool,
}

/// Store that answers every query with a fixed ranked list and records
/// upserted batches.
pub struct ScriptedStore {
    hits: Vec<ScoredEntry>,
    queries: Mutex<Vec<RecordedQuery>>,
    batches: Mutex<Vec<Vec<IndexedEntry>>>,
    fail_on_batch: Option<usize>,
}

impl ScriptedStore {
    pub fn with_hits(hits: Vec<ScoredEntry>) -> Self {
        Self {
            hits,
            queries: Mutex::new(Vec::new()),
            batches: Mutex::new(Vec::new()),
            fail_on_batch: None,
        }
    }

    pub fn empty() -> Self {
        Self::with_hits(Vec::new())
    }

    /// Fail the upsert call with this zero-based index.
    pub fn failing_on_batch(index: usize) -> Self {
        Self {
            fail_on_batch: Some(index),
            ..Self::empty()
        }
    }

    pub fn queries(&self) -> Vec<RecordedQuery> {
        self.queries.lock().unwrap().clone()
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batches.lock().unwrap().iter().map(Vec::len).collect()
    }

    pub fn stored(&self) -> Vec<IndexedEntry> {
        self.batches.lock().unwrap().concat()
    }
}

#[async_trait]
impl VectorStore for ScriptedStore {
    async fn upsert(&self, entries: Vec<IndexedEntry>) -> Result<usize, BackendError> {
        let mut batches = self.batches.lock().unwrap();
        if self.fail_on_batch == Some(batches.len()) {
            return Err(BackendError::request("scripted", "write rejected"));
        }
        let count = entries.len();
        batches.push(entries);
        Ok(count)
    }

    async fn query(
        &self,
        _vector: &[f32],
        top_k: usize,
        include_metadata: bool,
    ) -> Result<Vec<ScoredEntry>, BackendError> {
        self.queries.lock().unwrap().push(RecordedQuery {
            top_k,
            include_metadata,
        });
        Ok(self.hits.iter().take(top_k).cloned().collect())
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Store whose every call fails.
pub struct FailingStore;

#[async_trait]
impl VectorStore for FailingStore {
    async fn upsert(&self, _entries: Vec<IndexedEntry>) -> Result<usize, BackendError> {
        Err(BackendError::request("failing", "store unavailable"))
    }

    async fn query(
        &self,
        _vector: &[f32],
        _top_k: usize,
        _include_metadata: bool,
    ) -> Result<Vec<ScoredEntry>, BackendError> {
        Err(BackendError::request("failing", "store unavailable"))
    }

    fn name(&self) -> &str {
        "failing"
    }
}

/// Hit with metadata `context <id>` / `response <id>`.
pub fn scored(id: &str, score: f32) -> ScoredEntry {
    ScoredEntry {
        id: id.to_string(),
        score,
        metadata: Some(CaseMetadata {
            context: format!("context {}", id),
            response: format!("response {}", id),
        }),
    }
}

/// A (system, user) prompt pair as sent to [`RecordingGenerator`].
#[derive(Debug, Clone)]
pub struct RecordedPrompt {
    pub system: String,
    pub user: String,
}

/// Generator that records prompts and answers with a fixed reply.
pub struct RecordingGenerator {
    reply: Option<String>,
    prompts: Mutex<Vec<RecordedPrompt>>,
}

impl RecordingGenerator {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            reply: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<RecordedPrompt> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Generator for RecordingGenerator {
    async fn complete(&self, system: &str, user: &str) -> Result<String, BackendError> {
        self.prompts.lock().unwrap().push(RecordedPrompt {
            system: system.to_string(),
            user: user.to_string(),
        });
        self.reply
            .clone()
            .ok_or_else(|| BackendError::request("recording", "rate limited"))
    }
}
