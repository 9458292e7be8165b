//! Configuration management for Gemsearch
//!
//! TOML configuration with environment overrides for the provider
//! credentials, validated once at load time.

use crate::error::{GemsearchError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::embedding::IndexParams;

mod validator;

pub use validator::ConfigValidator;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub rerank: RerankConfig,
}

/// Persisted dataset artifacts
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Base directory for catalog and index files
    pub data_dir: PathBuf,
    /// Catalog CSV file name, relative to `data_dir`
    pub catalog_file: String,
    /// Persisted vector file name, relative to `data_dir`
    pub index_file: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("~/.gemsearch"),
            catalog_file: "catalog.csv".to_string(),
            index_file: "vectors.bin".to_string(),
        }
    }
}

/// Embedding provider configuration (OpenAI-compatible)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// API base URL; `GPT_BASE_URL` overrides it when set
    pub base_url: String,
    /// Embedding model name
    pub model: String,
    /// Environment variable holding the API key
    pub api_key_env: String,
    /// Batch size for index building
    pub batch_size: usize,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "text-embedding-3-small".to_string(),
            api_key_env: "GPT_API_KEY".to_string(),
            batch_size: 64,
            timeout_secs: 30,
        }
    }
}

/// Hybrid ranking and index parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Default result count when the caller does not specify one
    pub top_k: usize,
    /// Over-fetch factor: the index is asked for `top_k * multiplier`
    /// candidates before keyword re-ranking
    pub candidate_multiplier: usize,
    /// Weight of the vector similarity component
    pub vector_weight: f32,
    /// Weight of the keyword overlap component
    pub keyword_weight: f32,
    /// HNSW connections per layer
    pub hnsw_m: usize,
    /// HNSW construction beam width
    pub hnsw_ef_construction: usize,
    /// HNSW search beam width
    pub hnsw_ef_search: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            candidate_multiplier: 3,
            vector_weight: 0.7,
            keyword_weight: 0.3,
            hnsw_m: 16,
            hnsw_ef_construction: 200,
            hnsw_ef_search: 100,
        }
    }
}

impl SearchConfig {
    pub fn index_params(&self) -> IndexParams {
        IndexParams {
            m: self.hnsw_m,
            ef_construction: self.hnsw_ef_construction,
            ef_search: self.hnsw_ef_search,
        }
    }
}

/// Optional LLM reranking pass
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RerankConfig {
    pub enabled: bool,
    /// Chat model used for reranking
    pub model: String,
    pub temperature: f32,
}

impl Default for RerankConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            model: "gpt-4.1-nano".to_string(),
            temperature: 0.0,
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(GemsearchError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| GemsearchError::Io {
            source: e,
            context: format!("Failed to read config file: {:?}", path),
        })?;
        let mut config: Config = toml::from_str(&content)?;

        config.apply_env_overrides();

        ConfigValidator::validate(&config)?;

        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| GemsearchError::Io {
            source: e,
            context: format!("Failed to write config file: {:?}", path),
        })?;
        Ok(())
    }

    /// Default config path: `~/.config/gemsearch/config.toml`
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| GemsearchError::Config("Cannot determine config directory".to_string()))?;
        Ok(config_dir.join("gemsearch").join("config.toml"))
    }

    /// Apply environment overrides. `GPT_BASE_URL` replaces the configured
    /// provider base URL when present and non-empty.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(base_url) = std::env::var("GPT_BASE_URL") {
            if !base_url.is_empty() {
                self.embedding.base_url = base_url;
            }
        }
    }
}
