//! Hybrid retrieval and ranking
//!
//! Combines vector similarity from the ANN index with keyword-overlap
//! scoring against catalog metadata, plus an optional best-effort LLM
//! reranking pass.

mod hybrid;
mod keyword;
mod reranker;

pub use hybrid::{HybridRanker, SearchError};
pub use keyword::{keyword_score, query_tokens};
pub use reranker::{
    identity_ranking, parse_ranking, ranking_from_response, ChatReranker, Reranker,
};

use serde::{Deserialize, Serialize};

use crate::catalog::CatalogItem;

/// A ranked search hit, shaped for JSON output.
///
/// `score` is in `[0, 0.99]`, rounded to 2 decimal places; 1.00 is reserved
/// as an unreachable "perfect" sentinel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    pub image_name: String,
    pub category: String,
    pub caption: String,
    pub material: String,
    pub style: String,
    pub score: f32,
}

impl SearchResult {
    pub(crate) fn from_item(item: &CatalogItem, score: f32) -> Self {
        Self {
            image_name: item.image_name.clone(),
            category: item.category.clone(),
            caption: item.caption.clone(),
            material: item.material.clone(),
            style: item.style.clone(),
            score,
        }
    }

    /// One-line description used as reranker input.
    pub fn describe(&self) -> String {
        format!(
            "{} ({}, {}, {})",
            self.caption, self.category, self.material, self.style
        )
    }
}
