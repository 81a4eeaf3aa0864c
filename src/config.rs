//! Service configuration.
//!
//! Loaded from a TOML file; every section has defaults so a missing file or
//! a partial one still yields a usable configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::search::DEFAULT_MODEL;

/// Default number of nearest neighbours requested per query.
pub const DEFAULT_TOP_K: usize = 5;

/// Default similarity floor; matches scoring below it are dropped.
pub const DEFAULT_THRESHOLD: f32 = 0.4;

/// Default number of entries per upsert call.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub embedding: EmbeddingConfig,
    pub store: StoreConfig,
    pub generator: GeneratorConfig,
    pub retrieval: RetrievalConfig,
    pub ingest: IngestConfig,
    pub api: ApiConfig,
}

/// Embedding model settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Model name (all supported models produce 384-dimensional vectors)
    pub model: String,
    /// Show the model download progress bar on first use
    pub show_download_progress: bool,
    /// Where downloaded model files are cached
    pub cache_dir: Option<PathBuf>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            show_download_progress: false,
            cache_dir: None,
        }
    }
}

/// Which vector store implementation to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Qdrant,
    /// Process-local store, contents are lost on exit
    Memory,
}

/// Vector store settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// Qdrant gRPC endpoint
    pub url: String,
    /// Collection holding the indexed cases
    pub collection: String,
    /// Qdrant API key; falls back to `QDRANT_API_KEY`
    pub api_key: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Qdrant,
            url: "http://localhost:6334".to_string(),
            collection: "counseling-cases".to_string(),
            api_key: None,
        }
    }
}

impl StoreConfig {
    /// API key from the file, or from the environment when the file has none.
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var("QDRANT_API_KEY").ok())
            .filter(|key| !key.is_empty())
    }
}

/// Generator (chat completion) settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// OpenAI-compatible API root
    pub base_url: String,
    pub model: String,
    /// Environment variable holding the API key
    pub api_key_env: String,
    pub timeout_secs: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            timeout_secs: 60,
        }
    }
}

/// Retrieval policy defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_k: usize,
    pub threshold: f32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

/// Ingestion settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub batch_size: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

/// HTTP API settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub listen_address: String,
    pub cors_enabled: bool,
    /// Allowed origins; empty means any origin
    pub cors_origins: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            listen_address: "0.0.0.0:8080".to_string(),
            cors_enabled: true,
            cors_origins: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Load and validate configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&raw)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` if it exists, otherwise use defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            tracing::info!("Loading configuration from: {}", path.display());
            Self::load(path)
        } else {
            tracing::info!("Using default configuration");
            Ok(Self::default())
        }
    }

    /// Write the configuration as TOML.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let raw = toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))?;
        std::fs::write(path, raw)?;
        Ok(())
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.retrieval.top_k == 0 {
            return Err(Error::Config("retrieval.top_k must be at least 1".into()));
        }
        let threshold = self.retrieval.threshold;
        if !(-1.0..=1.0).contains(&threshold) {
            return Err(Error::Config(format!(
                "retrieval.threshold must lie in [-1, 1], got {}",
                threshold
            )));
        }
        if self.ingest.batch_size == 0 {
            return Err(Error::Config("ingest.batch_size must be at least 1".into()));
        }
        if self.store.collection.trim().is_empty() {
            return Err(Error::Config("store.collection must not be empty".into()));
        }
        Ok(())
    }
}
