//! Text embedding.
//!
//! The model is opaque to the rest of the pipeline: everything goes through
//! the narrow [`Embedder`] trait so a model change never leaks past this file.

use std::sync::Arc;

use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use tokio::runtime::RuntimeFlavor;
use tokio::sync::Mutex;

use super::EMBEDDING_DIM;
use crate::config::EmbeddingConfig;
use crate::error::{BackendError, Error, Result};

/// A fixed-length embedding vector.
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding(Vec<f32>);

impl Embedding {
    pub fn new(vector: Vec<f32>) -> Self {
        Self(vector)
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_vec(self) -> Vec<f32> {
        self.0
    }
}

impl From<Vec<f32>> for Embedding {
    fn from(vector: Vec<f32>) -> Self {
        Self(vector)
    }
}

/// Turns text into an [`Embedding`].
///
/// Implementations must be deterministic for a fixed model version. Failures
/// are returned as-is; callers never retry.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> std::result::Result<Embedding, BackendError>;

    /// Dimensionality of produced vectors.
    fn dimensions(&self) -> usize;
}

/// Resolve a configured model name to a fastembed model.
///
/// Only 384-dimensional models are accepted so the store's index never
/// sees a mismatched vector.
pub fn model_from_name(name: &str) -> Result<EmbeddingModel> {
    match name {
        "all-MiniLM-L6-v2" | "AllMiniLML6V2" => Ok(EmbeddingModel::AllMiniLML6V2),
        "all-MiniLM-L12-v2" | "AllMiniLML12V2" => Ok(EmbeddingModel::AllMiniLML12V2),
        "bge-small-en-v1.5" | "BGESmallENV15" => Ok(EmbeddingModel::BGESmallENV15),
        other => Err(Error::Config(format!(
            "unsupported embedding model '{}' (expected a {}-dimensional model)",
            other, EMBEDDING_DIM
        ))),
    }
}

/// Local ONNX embedding model via fastembed.
#[derive(Clone)]
pub struct FastEmbedder {
    model: Arc<Mutex<TextEmbedding>>,
}

impl FastEmbedder {
    /// Load the default model (all-MiniLM-L6-v2).
    pub fn new() -> Result<Self> {
        Self::from_config(&EmbeddingConfig::default())
    }

    /// Load the model named in the configuration, downloading it on first use.
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self> {
        let model = model_from_name(&config.model)?;
        let mut options =
            InitOptions::new(model).with_show_download_progress(config.show_download_progress);
        if let Some(dir) = &config.cache_dir {
            options = options.with_cache_dir(dir.clone());
        }

        let text_embedding = TextEmbedding::try_new(options).map_err(|e| {
            Error::Embedding(BackendError::request(
                "fastembed",
                format!("failed to initialize model {}: {}", config.model, e),
            ))
        })?;

        tracing::info!(model = %config.model, "Embedding model loaded");

        Ok(Self {
            model: Arc::new(Mutex::new(text_embedding)),
        })
    }
}

/// Run CPU-bound inference without stalling other tasks on this worker.
/// A current-thread runtime has no other worker to hand off to, so the
/// closure runs inline there.
fn run_inference<T>(f: impl FnOnce() -> T) -> T {
    match tokio::runtime::Handle::try_current().map(|handle| handle.runtime_flavor()) {
        Ok(RuntimeFlavor::MultiThread) => tokio::task::block_in_place(f),
        _ => f(),
    }
}

#[async_trait]
impl Embedder for FastEmbedder {
    async fn embed(&self, text: &str) -> std::result::Result<Embedding, BackendError> {
        let model = self.model.lock().await;
        let mut vectors = run_inference(|| model.embed(vec![text], None))
            .map_err(|e| BackendError::request("fastembed", e))?;

        vectors
            .pop()
            .map(Embedding::new)
            .ok_or_else(|| BackendError::response("fastembed", "no embedding returned"))
    }

    fn dimensions(&self) -> usize {
        EMBEDDING_DIM
    }
}
