use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the Gemsearch application
#[derive(Error, Debug)]
pub enum GemsearchError {
    /// Configuration related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration validation errors
    #[error("Configuration validation failed: {errors:?}")]
    ConfigValidation { errors: Vec<ValidationError> },

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Fatal dataset errors detected at startup
    #[error(transparent)]
    Startup(#[from] StartupError),

    /// Embedding provider errors
    #[error(transparent)]
    Provider(#[from] crate::embedding::ProviderError),

    /// Search pipeline errors
    #[error(transparent)]
    Search(#[from] crate::retrieval::SearchError),

    /// IO errors
    #[error("IO error: {context}: {source}")]
    Io {
        source: std::io::Error,
        context: String,
    },

    /// TOML deserialization errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization errors
    #[error("TOML serialization error: {0}")]
    TomlSerialization(#[from] toml::ser::Error),

    /// JSON errors
    #[error("JSON error: {context}: {source}")]
    Json {
        source: serde_json::Error,
        context: String,
    },

    /// Generic errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Fatal startup error: the service cannot serve a consistent dataset.
///
/// These are raised while loading the persisted catalog and vector index
/// artifacts. None of them are recoverable at runtime.
#[derive(Error, Debug)]
pub enum StartupError {
    #[error("Failed to load catalog: {0}")]
    Catalog(#[from] crate::catalog::CatalogError),

    #[error("Failed to load vector index: {0}")]
    Index(#[from] crate::embedding::VectorIndexError),

    #[error("Catalog/index desynchronization: catalog has {catalog} rows but index has {index} vectors")]
    CardinalityMismatch { catalog: usize, index: usize },
}

/// Configuration validation error
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// Path to the configuration key that failed validation
    pub path: String,
    /// Error message describing the validation failure
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result type for Gemsearch operations
pub type Result<T> = std::result::Result<T, GemsearchError>;
