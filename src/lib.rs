//! Retrieval-augmented suggestions for counseling scenarios.
//!
//! Historical context/response pairs are embedded and indexed; at request
//! time a free-text query is matched against stored situations, weak matches
//! are dropped, and the survivors ground a generated recommendation.
//!
//! - [`ingest`]: CSV rows to batched vector-store upserts
//! - [`search`]: embedding, vector stores and thresholded retrieval
//! - [`suggest`]: prompt assembly and generation with provenance
//! - [`api`]: HTTP boundary

pub mod api;
pub mod config;
pub mod error;
pub mod ingest;
pub mod pipeline;
pub mod search;
pub mod suggest;

#[cfg(test)]
pub(crate) mod test_support;

pub use api::{ApiServer, AppState};
pub use config::AppConfig;
pub use error::{BackendError, Error, Result};
pub use ingest::{CaseRow, CorpusRecord, Ingestor};
pub use pipeline::Pipeline;
pub use search::{
    Embedder, Embedding, FastEmbedder, InMemoryStore, Match, QdrantStore, RetrievalPolicy,
    Retriever, VectorStore,
};
pub use suggest::{Generator, OpenAiGenerator, Provenance, SuggestionComposer, SuggestionResult};
