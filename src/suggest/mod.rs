//! Suggestion composition.
//!
//! Retrieves similar cases, builds either a grounded or a fallback prompt,
//! asks the generator for a completion and records which path was taken.

mod generator;
mod prompt;

pub use generator::{Generator, OpenAiGenerator};
pub use prompt::{example_blocks, fallback_prompt, grounded_prompt, SYSTEM_PROMPT};

use std::sync::Arc;

use serde::{Serialize, Serializer};

use crate::error::{Error, Result};
use crate::search::Retriever;

/// Whether a suggestion was grounded in stored cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    Grounded,
    GeneratorOnly,
}

impl Provenance {
    pub fn note(self) -> &'static str {
        match self {
            Provenance::Grounded => "Generated using top matching examples in the database.",
            Provenance::GeneratorOnly => {
                "No relevant matches were found, so output generated from LLM."
            }
        }
    }

    fn label(self) -> &'static str {
        match self {
            Provenance::Grounded => "grounded",
            Provenance::GeneratorOnly => "generator_only",
        }
    }
}

impl Serialize for Provenance {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.note())
    }
}

/// Response of the suggestion boundary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SuggestionResult {
    pub query: String,
    pub match_count: usize,
    pub suggestion: String,
    pub note: Provenance,
}

/// Retrieval followed by grounded generation.
pub struct SuggestionComposer {
    retriever: Arc<Retriever>,
    generator: Arc<dyn Generator>,
}

impl SuggestionComposer {
    pub fn new(retriever: Arc<Retriever>, generator: Arc<dyn Generator>) -> Self {
        Self {
            retriever,
            generator,
        }
    }

    /// Compose a suggestion for `query`.
    ///
    /// Retrieval errors propagate unchanged; a generator failure becomes
    /// [`Error::Generation`]. Nothing is retried.
    pub async fn compose(&self, query: &str) -> Result<SuggestionResult> {
        let matches = self.retriever.retrieve(query).await?;

        let (prompt, note) = if matches.is_empty() {
            (fallback_prompt(query), Provenance::GeneratorOnly)
        } else {
            (grounded_prompt(query, &matches), Provenance::Grounded)
        };
        tracing::debug!(matches = matches.len(), path = note.label(), "Prompt assembled");

        let suggestion = self
            .generator
            .complete(SYSTEM_PROMPT, &prompt)
            .await
            .map_err(|e| {
                tracing::warn!("Generator call failed: {}", e);
                Error::Generation(e)
            })?;

        metrics::counter!("counsel_suggestions_total", "provenance" => note.label()).increment(1);
        tracing::info!(match_count = matches.len(), path = note.label(), "Suggestion composed");

        Ok(SuggestionResult {
            query: query.to_string(),
            match_count: matches.len(),
            suggestion,
            note,
        })
    }
}
