//! HTTP API.
//!
//! Thin axum layer over the pipeline. Request parsing and response shaping
//! live here; every decision is made by the components.

use std::sync::Arc;
use std::time::Instant;

use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::ApiConfig;
use crate::error::{Error, Result};
use crate::ingest::Ingestor;
use crate::search::{Match, Retriever};
use crate::suggest::{SuggestionComposer, SuggestionResult};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub ingestor: Arc<Ingestor>,
    pub retriever: Arc<Retriever>,
    pub composer: Arc<SuggestionComposer>,
    pub start_time: Instant,
    /// Prometheus renderer, when a recorder is installed
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(pipeline: crate::Pipeline) -> Self {
        Self {
            ingestor: pipeline.ingestor,
            retriever: pipeline.retriever,
            composer: pipeline.composer,
            start_time: Instant::now(),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

/// Body of the query endpoints. `query` is optional so that a missing field
/// is reported as a validation error.
#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    #[serde(default)]
    pub query: Option<String>,
}

fn query_required() -> Error {
    Error::Validation("Query is required.".to_string())
}

impl QueryRequest {
    fn into_query(self) -> Result<String> {
        match self.query {
            Some(query) if !query.trim().is_empty() => Ok(query),
            _ => Err(query_required()),
        }
    }

    /// Extract the query from a JSON body. A missing, non-JSON or malformed
    /// body counts as a missing query.
    fn from_body(body: std::result::Result<Json<Self>, JsonRejection>) -> Result<String> {
        match body {
            Ok(Json(request)) => request.into_query(),
            Err(rejection) => {
                tracing::debug!("Unreadable query body: {}", rejection.body_text());
                Err(query_required())
            }
        }
    }
}

/// Response of the retrieval boundary.
#[derive(Debug, Serialize, Deserialize)]
pub struct MatchesResponse {
    pub query: String,
    pub matches: Vec<Match>,
    pub match_count: usize,
    pub note: String,
}

impl MatchesResponse {
    /// Shape retrieval output; the note states the floor that was applied.
    pub fn new(query: String, matches: Vec<Match>, threshold: f32) -> Self {
        let note = if matches.is_empty() {
            "No relevant matches found.".to_string()
        } else {
            format!("Filtered matches with score >= {}", threshold)
        };
        Self {
            query,
            match_count: matches.len(),
            matches,
            note,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IngestResponse {
    pub message: String,
    pub inserted: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime: u64,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = if self.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

async fn add_data(State(state): State<AppState>, body: Bytes) -> Result<Json<IngestResponse>> {
    if body.is_empty() {
        return Err(Error::Validation("CSV file is required.".to_string()));
    }

    let inserted = state.ingestor.ingest_csv(body.as_ref()).await?;
    Ok(Json(IngestResponse {
        message: format!("Uploaded and inserted {} entries.", inserted),
        inserted,
    }))
}

async fn retrieve_matches(
    State(state): State<AppState>,
    body: std::result::Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<MatchesResponse>> {
    let query = QueryRequest::from_body(body)?;
    let matches = state.retriever.retrieve(&query).await?;
    let threshold = state.retriever.policy().threshold;
    Ok(Json(MatchesResponse::new(query, matches, threshold)))
}

async fn generate_suggestion(
    State(state): State<AppState>,
    body: std::result::Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<SuggestionResult>> {
    let query = QueryRequest::from_body(body)?;
    Ok(Json(state.composer.compose(&query).await?))
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime: state.start_time.elapsed().as_secs(),
    })
}

async fn render_metrics(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => handle.render().into_response(),
        None => (StatusCode::NOT_FOUND, "metrics recorder not installed").into_response(),
    }
}

fn cors_layer(config: &ApiConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    let allow_origin = if origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Build the router for the given state.
pub fn router(config: &ApiConfig, state: AppState) -> Router {
    let router = Router::new()
        .route("/add-data", post(add_data))
        .route("/retrieve-matches", post(retrieve_matches))
        .route("/generate-suggestion", post(generate_suggestion))
        .route("/health", get(health))
        .route("/metrics", get(render_metrics))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    if config.cors_enabled {
        router.layer(cors_layer(config))
    } else {
        router
    }
}

/// HTTP server wrapping the router.
pub struct ApiServer {
    config: ApiConfig,
    state: AppState,
}

impl ApiServer {
    pub fn with_state(config: ApiConfig, state: AppState) -> Self {
        Self { config, state }
    }

    /// Serve until Ctrl+C.
    pub async fn run(self, addr: &str) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("API listening on {}", listener.local_addr()?);

        axum::serve(listener, router(&self.config, self.state))
            .with_graceful_shutdown(async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::warn!("Failed to listen for shutdown signal: {}", e);
                }
                tracing::info!("Received shutdown signal");
            })
            .await?;
        Ok(())
    }
}
