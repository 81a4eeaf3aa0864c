//! Semantic search over historical counseling cases.
//!
//! Provides vector-based retrieval using:
//! - FastEmbed for embedding generation (ONNX-based, lightweight)
//! - Qdrant for vector storage and cosine similarity search
//! - A similarity floor that drops weak matches before they reach a prompt
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌────────────────┐
//! │  Query / Case   │────▶│    Embedder    │
//! │  (context text) │     │   (FastEmbed)  │
//! └─────────────────┘     └───────┬────────┘
//!                                 │
//!                                 ▼
//!                         ┌──────────────┐
//!                         │   Embedding  │
//!                         │  [f32; 384]  │
//!                         └──────┬───────┘
//!                                │
//!                   ┌────────────┴────────────┐
//!                   │                         │
//!                   ▼                         ▼
//!             ┌──────────┐             ┌──────────┐
//!             │  Qdrant  │             │ InMemory │
//!             │  Store   │             │  Store   │
//!             └────┬─────┘             └────┬─────┘
//!                  └────────────┬───────────┘
//!                               ▼
//!                       ┌──────────────┐
//!                       │  Retriever   │
//!                       │ score >= 0.4 │
//!                       └──────────────┘
//! ```

mod embedding;
mod memory;
mod qdrant;
mod retriever;
mod store;

pub use embedding::{model_from_name, Embedder, Embedding, FastEmbedder};
pub use memory::{cosine_similarity, InMemoryStore};
pub use qdrant::QdrantStore;
pub use retriever::{Match, RetrievalPolicy, Retriever};
pub use store::{CaseMetadata, IndexedEntry, ScoredEntry, VectorStore};

/// Default embedding model (all-MiniLM-L6-v2 - 384 dimensions, good balance of speed/quality)
pub const DEFAULT_MODEL: &str = "all-MiniLM-L6-v2";

/// Embedding dimension for every supported model
pub const EMBEDDING_DIM: usize = 384;
