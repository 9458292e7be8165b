//! Gemsearch - Hybrid Product Search Backend
//!
//! Combines approximate nearest-neighbor vector search over precomputed
//! catalog embeddings with deterministic keyword-overlap scoring to rank
//! jewellery catalog items against a text query, with an optional
//! best-effort LLM reranking pass.

pub mod catalog;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod retrieval;

pub use error::{GemsearchError, Result};
