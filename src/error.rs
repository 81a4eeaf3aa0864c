//! Error types for the suggestion service.
//!
//! Every collaborator failure is wrapped with the stage it happened in, so a
//! retrieval failure can always be told apart from a generation failure at
//! the boundary.

use thiserror::Error;

/// Failure reported by an external collaborator (embedding model, vector
/// store, generator).
#[derive(Debug, Error)]
pub enum BackendError {
    /// The request never produced a usable answer (transport, model runtime).
    #[error("{backend} request failed: {reason}")]
    Request { backend: String, reason: String },

    /// The collaborator answered, but not with what we asked for.
    #[error("{backend} returned an unexpected response: {reason}")]
    Response { backend: String, reason: String },
}

impl BackendError {
    pub fn request(backend: impl Into<String>, reason: impl ToString) -> Self {
        BackendError::Request {
            backend: backend.into(),
            reason: reason.to_string(),
        }
    }

    pub fn response(backend: impl Into<String>, reason: impl ToString) -> Self {
        BackendError::Response {
            backend: backend.into(),
            reason: reason.to_string(),
        }
    }
}

/// Crate-wide error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Missing or empty required input.
    #[error("{0}")]
    Validation(String),

    /// Ingestion source lacks required columns.
    #[error("source is missing required column(s): {}", missing.join(", "))]
    Schema { missing: Vec<String> },

    /// Ingestion source could not be read or parsed.
    #[error("failed to read CSV: {0}")]
    Source(String),

    #[error("embedding failed: {0}")]
    Embedding(#[source] BackendError),

    #[error("vector store query failed: {0}")]
    Retrieval(#[source] BackendError),

    /// A batch upsert failed; `inserted` entries from earlier batches stay
    /// persisted.
    #[error("vector store upsert failed after {inserted} inserted entries: {source}")]
    Upsert {
        inserted: usize,
        #[source]
        source: BackendError,
    },

    #[error("generator error: {0}")]
    Generation(#[source] BackendError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the failure is the caller's fault (4xx class).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::Validation(_) | Error::Schema { .. } | Error::Source(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
