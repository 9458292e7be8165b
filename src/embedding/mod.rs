//! Embedding provider and vector index
//!
//! Architecture:
//! - `EmbeddingProvider` trait for abstraction over embedding backends
//! - `ApiEmbeddingProvider` for OpenAI-compatible remote embedding
//! - HNSW for approximate nearest-neighbor search over item vectors
//! - Flat persisted vector file rebuilt into the HNSW graph at startup

mod provider;
mod vector_index;

pub use provider::{ApiEmbeddingProvider, EmbeddingProvider, ProviderError};
pub use vector_index::{IndexParams, VectorIndex, VectorIndexError};
