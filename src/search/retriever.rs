//! Query-time retrieval with a similarity floor.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{Embedder, VectorStore};
use crate::config::{RetrievalConfig, DEFAULT_THRESHOLD, DEFAULT_TOP_K};
use crate::error::{Error, Result};

/// A retrieved case that passed the similarity floor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub context: String,
    pub response: String,
    /// Store-reported cosine similarity
    pub score: f32,
}

/// How many neighbours to ask for and how similar they must be.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetrievalPolicy {
    pub top_k: usize,
    /// Inclusive floor: a score equal to the threshold is kept
    pub threshold: f32,
}

impl Default for RetrievalPolicy {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl From<&RetrievalConfig> for RetrievalPolicy {
    fn from(config: &RetrievalConfig) -> Self {
        Self {
            top_k: config.top_k,
            threshold: config.threshold,
        }
    }
}

/// Embeds a query, asks the store for neighbours and drops weak ones.
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    policy: RetrievalPolicy,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<dyn VectorStore>) -> Self {
        Self::with_policy(embedder, store, RetrievalPolicy::default())
    }

    pub fn with_policy(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        policy: RetrievalPolicy,
    ) -> Self {
        Self {
            embedder,
            store,
            policy,
        }
    }

    pub fn policy(&self) -> RetrievalPolicy {
        self.policy
    }

    /// Retrieve with the configured policy.
    pub async fn retrieve(&self, query: &str) -> Result<Vec<Match>> {
        self.retrieve_with(query, self.policy).await
    }

    /// Retrieve with an explicit policy.
    ///
    /// The result keeps the store's ranking. An empty result is not an error.
    pub async fn retrieve_with(&self, query: &str, policy: RetrievalPolicy) -> Result<Vec<Match>> {
        if query.trim().is_empty() {
            return Err(Error::Validation("Query is required.".to_string()));
        }

        let vector = self.embedder.embed(query).await.map_err(|e| {
            tracing::warn!("Query embedding failed: {}", e);
            Error::Embedding(e)
        })?;

        let hits = self
            .store
            .query(vector.as_slice(), policy.top_k, true)
            .await
            .map_err(|e| {
                tracing::warn!(store = self.store.name(), "Vector store query failed: {}", e);
                Error::Retrieval(e)
            })?;
        let candidates = hits.len();

        let matches: Vec<Match> = hits
            .into_iter()
            .filter(|hit| hit.score >= policy.threshold)
            .map(|hit| {
                let metadata = hit.metadata.unwrap_or_default();
                Match {
                    context: metadata.context,
                    response: metadata.response,
                    score: hit.score,
                }
            })
            .collect();

        tracing::debug!(
            candidates,
            retained = matches.len(),
            threshold = policy.threshold,
            "Filtered retrieval candidates"
        );
        metrics::counter!("counsel_retrievals_total").increment(1);
        metrics::histogram!("counsel_retrieved_matches").record(matches.len() as f64);

        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{scored, FailingStore, ScriptedStore, TableEmbedder};

    fn retriever(store: Arc<ScriptedStore>) -> (Retriever, Arc<TableEmbedder>) {
        let embedder = Arc::new(TableEmbedder::new());
        (Retriever::new(embedder.clone(), store), embedder)
    }

    #[tokio::test]
    async fn test_keeps_scores_at_or_above_threshold_in_store_order() {
        let store = Arc::new(ScriptedStore::with_hits(vec![
            scored("a", 0.91),
            scored("b", 0.40),
            scored("c", 0.39),
            scored("d", 0.10),
        ]));
        let (retriever, _) = retriever(store);

        let matches = retriever.retrieve("trouble sleeping").await.unwrap();
        let scores: Vec<f32> = matches.iter().map(|m| m.score).collect();
        assert_eq!(scores, vec![0.91, 0.40], "score equal to threshold must be kept");
        assert_eq!(matches[0].context, "context a");
        assert_eq!(matches[0].response, "response a");
    }

    #[tokio::test]
    async fn test_no_returned_score_is_below_a_dropped_one() {
        let store = Arc::new(ScriptedStore::with_hits(vec![
            scored("a", 0.8),
            scored("b", 0.6),
            scored("c", 0.3),
            scored("d", -0.2),
        ]));
        let (retriever, _) = retriever(store);

        let matches = retriever.retrieve("grief").await.unwrap();
        assert!(matches.iter().all(|m| m.score >= 0.4));
        assert!(matches.windows(2).all(|w| w[0].score >= w[1].score));
        assert_eq!(matches.len(), 2);
    }

    #[tokio::test]
    async fn test_requests_top_k_with_metadata() {
        let store = Arc::new(ScriptedStore::with_hits(vec![]));
        let (retriever, _) = retriever(store.clone());

        let matches = retriever.retrieve("loneliness").await.unwrap();
        assert!(matches.is_empty(), "empty result is a normal outcome");

        let queries = store.queries();
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].top_k, 5);
        assert!(queries[0].include_metadata);
    }

    #[tokio::test]
    async fn test_custom_policy_overrides_defaults() {
        let store = Arc::new(ScriptedStore::with_hits(vec![
            scored("a", 0.7),
            scored("b", 0.5),
        ]));
        let (retriever, _) = retriever(store.clone());

        let policy = RetrievalPolicy {
            top_k: 2,
            threshold: 0.6,
        };
        let matches = retriever.retrieve_with("panic attacks", policy).await.unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(store.queries()[0].top_k, 2);
    }

    #[tokio::test]
    async fn test_empty_query_fails_before_any_collaborator_call() {
        let store = Arc::new(ScriptedStore::with_hits(vec![scored("a", 0.9)]));
        let (retriever, embedder) = retriever(store.clone());

        for query in ["", "   "] {
            let err = retriever.retrieve(query).await.unwrap_err();
            assert!(matches!(err, Error::Validation(_)));
        }
        assert_eq!(embedder.calls(), 0);
        assert!(store.queries().is_empty());
    }

    #[tokio::test]
    async fn test_store_failure_is_retrieval_error() {
        let embedder = Arc::new(TableEmbedder::new());
        let retriever = Retriever::new(embedder, Arc::new(FailingStore));

        let err = retriever.retrieve("insomnia").await.unwrap_err();
        assert!(matches!(err, Error::Retrieval(_)));
        assert!(err.to_string().contains("store unavailable"));
    }

    #[tokio::test]
    async fn test_embedding_failure_propagates_unchanged() {
        let embedder = Arc::new(TableEmbedder::failing());
        let store = Arc::new(ScriptedStore::with_hits(vec![]));
        let retriever = Retriever::new(embedder, store.clone());

        let err = retriever.retrieve("insomnia").await.unwrap_err();
        assert!(matches!(err, Error::Embedding(_)));
        assert!(store.queries().is_empty());
    }

    #[tokio::test]
    async fn test_missing_metadata_reads_as_empty_text() {
        let mut hit = scored("a", 0.9);
        hit.metadata = None;
        let store = Arc::new(ScriptedStore::with_hits(vec![hit]));
        let (retriever, _) = retriever(store);

        let matches = retriever.retrieve("stress").await.unwrap();
        assert_eq!(matches[0].context, "");
        assert_eq!(matches[0].response, "");
    }
}
