//! Component wiring.
//!
//! The process entry point owns the embedding model, store connection and
//! generator client; components receive them as shared handles.

use std::sync::Arc;

use crate::config::{AppConfig, StoreBackend};
use crate::error::Result;
use crate::ingest::Ingestor;
use crate::search::{
    Embedder, FastEmbedder, InMemoryStore, QdrantStore, RetrievalPolicy, Retriever, VectorStore,
};
use crate::suggest::{Generator, OpenAiGenerator, SuggestionComposer};

/// Ready-to-use components sharing one set of collaborators.
#[derive(Clone)]
pub struct Pipeline {
    pub ingestor: Arc<Ingestor>,
    pub retriever: Arc<Retriever>,
    pub composer: Arc<SuggestionComposer>,
}

impl Pipeline {
    /// Wire components around explicit collaborators.
    pub fn with_backends(
        config: &AppConfig,
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        generator: Arc<dyn Generator>,
    ) -> Self {
        let ingestor = Arc::new(Ingestor::with_batch_size(
            embedder.clone(),
            store.clone(),
            config.ingest.batch_size,
        ));
        let retriever = Arc::new(Retriever::with_policy(
            embedder,
            store,
            RetrievalPolicy::from(&config.retrieval),
        ));
        let composer = Arc::new(SuggestionComposer::new(retriever.clone(), generator));

        Self {
            ingestor,
            retriever,
            composer,
        }
    }

    /// Build every collaborator from configuration.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        config.validate()?;

        let embedder = build_embedder(config)?;
        let store = build_store(config, embedder.dimensions())?;
        let generator = build_generator(config)?;

        Ok(Self::with_backends(config, embedder, store, generator))
    }
}

/// Load the configured embedding model.
pub fn build_embedder(config: &AppConfig) -> Result<Arc<dyn Embedder>> {
    Ok(Arc::new(FastEmbedder::from_config(&config.embedding)?))
}

/// Create the generator client. Fails when the API key is not set.
pub fn build_generator(config: &AppConfig) -> Result<Arc<dyn Generator>> {
    Ok(Arc::new(OpenAiGenerator::from_config(&config.generator)?))
}

/// Connect the configured vector store. The in-memory backend enforces the
/// embedder's `dimensions`.
pub fn build_store(config: &AppConfig, dimensions: usize) -> Result<Arc<dyn VectorStore>> {
    Ok(match config.store.backend {
        StoreBackend::Qdrant => Arc::new(QdrantStore::connect(&config.store)?),
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory vector store; ingested cases are lost on exit");
            Arc::new(InMemoryStore::with_dimensions(dimensions))
        }
    })
}
