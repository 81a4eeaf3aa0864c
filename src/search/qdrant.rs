//! Qdrant-backed vector store.
//!
//! Points are keyed by the entry's UUID and carry `context` and `response`
//! as payload. The collection must already exist (384 dims, cosine).

use std::collections::HashMap;

use async_trait::async_trait;
use qdrant_client::qdrant::point_id::PointIdOptions;
use qdrant_client::qdrant::value::Kind;
use qdrant_client::qdrant::{
    PointId, PointStruct, ScoredPoint, SearchPointsBuilder, UpsertPointsBuilder, Value,
};
use qdrant_client::{Payload, Qdrant};

use super::store::{CaseMetadata, IndexedEntry, ScoredEntry, VectorStore};
use crate::config::StoreConfig;
use crate::error::{BackendError, Error, Result};

const BACKEND: &str = "qdrant";

/// Vector store over a Qdrant collection.
pub struct QdrantStore {
    client: Qdrant,
    collection: String,
}

impl QdrantStore {
    /// Connect using the store section of the configuration.
    pub fn connect(config: &StoreConfig) -> Result<Self> {
        let client = Qdrant::from_url(&config.url)
            .api_key(config.resolved_api_key())
            .build()
            .map_err(|e| {
                Error::Config(format!("failed to create Qdrant client for {}: {}", config.url, e))
            })?;

        tracing::info!(url = %config.url, collection = %config.collection, "Qdrant store configured");

        Ok(Self {
            client,
            collection: config.collection.clone(),
        })
    }
}

fn to_point(entry: IndexedEntry) -> std::result::Result<PointStruct, BackendError> {
    let payload: Payload = serde_json::json!({
        "context": entry.metadata.context,
        "response": entry.metadata.response,
    })
    .try_into()
    .map_err(|e| BackendError::request(BACKEND, format!("invalid payload: {}", e)))?;

    Ok(PointStruct::new(entry.id, entry.vector.into_vec(), payload))
}

fn payload_text(payload: &HashMap<String, Value>, key: &str) -> String {
    match payload.get(key).and_then(|value| value.kind.as_ref()) {
        Some(Kind::StringValue(text)) => text.clone(),
        _ => String::new(),
    }
}

fn point_id_text(id: Option<PointId>) -> String {
    match id.and_then(|id| id.point_id_options) {
        Some(PointIdOptions::Uuid(uuid)) => uuid,
        Some(PointIdOptions::Num(num)) => num.to_string(),
        None => String::new(),
    }
}

fn from_scored_point(point: ScoredPoint, include_metadata: bool) -> ScoredEntry {
    let metadata = include_metadata.then(|| CaseMetadata {
        context: payload_text(&point.payload, "context"),
        response: payload_text(&point.payload, "response"),
    });

    ScoredEntry {
        id: point_id_text(point.id),
        score: point.score,
        metadata,
    }
}

#[async_trait]
impl VectorStore for QdrantStore {
    async fn upsert(&self, entries: Vec<IndexedEntry>) -> std::result::Result<usize, BackendError> {
        let points = entries
            .into_iter()
            .map(to_point)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let count = points.len();

        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection, points).wait(true))
            .await
            .map_err(|e| BackendError::request(BACKEND, e))?;

        Ok(count)
    }

    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        include_metadata: bool,
    ) -> std::result::Result<Vec<ScoredEntry>, BackendError> {
        let response = self
            .client
            .search_points(
                SearchPointsBuilder::new(&self.collection, vector.to_vec(), top_k as u64)
                    .with_payload(include_metadata),
            )
            .await
            .map_err(|e| BackendError::request(BACKEND, e))?;

        Ok(response
            .result
            .into_iter()
            .map(|point| from_scored_point(point, include_metadata))
            .collect())
    }

    fn name(&self) -> &str {
        BACKEND
    }
}
