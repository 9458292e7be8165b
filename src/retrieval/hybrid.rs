//! Hybrid ranking: vector similarity plus keyword-overlap boost

use std::sync::Arc;
use thiserror::Error;

use crate::catalog::CatalogStore;
use crate::config::SearchConfig;
use crate::embedding::{VectorIndex, VectorIndexError};
use crate::error::StartupError;
use crate::retrieval::{keyword_score, query_tokens, Reranker, SearchResult};

/// Display ceiling; 1.00 is reserved as an unreachable "perfect" score.
const SCORE_CEILING: f32 = 0.99;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Vector search failed: {0}")]
    VectorSearch(#[from] VectorIndexError),
}

/// Transient per-candidate scoring record, discarded after each search.
struct Candidate {
    id: usize,
    vector_score: f32,
    keyword_score: f32,
    final_score: f32,
}

/// Hybrid ranker over the shared, immutable-after-load catalog and index.
///
/// Requests only read shared state, so one ranker can serve concurrent
/// searches without locking.
pub struct HybridRanker {
    catalog: Arc<CatalogStore>,
    index: Arc<VectorIndex>,
    reranker: Option<Arc<dyn Reranker>>,
    config: SearchConfig,
}

impl HybridRanker {
    /// Create a ranker, verifying that the catalog and index describe the
    /// same dataset. A cardinality mismatch is fatal: item at index
    /// position `i` must correspond exactly to catalog row `i`.
    pub fn new(
        catalog: Arc<CatalogStore>,
        index: Arc<VectorIndex>,
        config: SearchConfig,
    ) -> Result<Self, StartupError> {
        if catalog.len() != index.len() {
            return Err(StartupError::CardinalityMismatch {
                catalog: catalog.len(),
                index: index.len(),
            });
        }

        Ok(Self {
            catalog,
            index,
            reranker: None,
            config,
        })
    }

    /// Attach an optional best-effort reranker.
    pub fn with_reranker(mut self, reranker: Arc<dyn Reranker>) -> Self {
        self.reranker = Some(reranker);
        self
    }

    /// Search the catalog with a precomputed query vector.
    ///
    /// Over-fetches `top_k * candidate_multiplier` neighbors so that a
    /// lexically-strong but vector-distant item is not pushed out before
    /// keyword scoring, then ranks and truncates to `top_k`.
    pub fn search(
        &self,
        query: &str,
        top_k: usize,
        query_vector: &[f32],
    ) -> Result<Vec<SearchResult>, SearchError> {
        if top_k == 0 || self.catalog.is_empty() {
            return Ok(Vec::new());
        }

        let candidate_k = top_k.saturating_mul(self.config.candidate_multiplier);
        let neighbours = self.index.query(query_vector, candidate_k)?;

        Ok(self.rank(query, top_k, &neighbours))
    }

    /// Score, sort, and truncate raw `(id, distance)` neighbors.
    ///
    /// Ids outside catalog range (including negative "no match" sentinels)
    /// are silently skipped. Ties in the final score keep the input
    /// vector-distance order: the sort is stable and uses no secondary key.
    pub fn rank(&self, query: &str, top_k: usize, neighbours: &[(i64, f32)]) -> Vec<SearchResult> {
        let tokens = query_tokens(query);

        let mut candidates = Vec::with_capacity(neighbours.len());
        for &(id, distance) in neighbours {
            let Ok(id) = usize::try_from(id) else {
                continue;
            };
            let Some(item) = self.catalog.get(id) else {
                continue;
            };

            // Monotonic decreasing transform of distance into a (0, 1]
            // similarity proxy; avoids needing distance bounds.
            let vector_score = 1.0 / (1.0 + distance);
            let keyword_score = keyword_score(item, &tokens);

            let final_score = (vector_score * self.config.vector_weight
                + keyword_score * self.config.keyword_weight)
                .min(SCORE_CEILING);

            candidates.push(Candidate {
                id,
                vector_score,
                keyword_score,
                final_score,
            });
        }

        tracing::debug!(
            "Scored {} of {} neighbours for query {:?}",
            candidates.len(),
            neighbours.len(),
            query
        );

        candidates.sort_by(|a, b| {
            b.final_score
                .partial_cmp(&a.final_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        candidates
            .into_iter()
            .take(top_k)
            .filter_map(|c| {
                let item = self.catalog.get(c.id)?;
                tracing::trace!(
                    "ranked {}: vector {:.4} keyword {:.2} final {:.4}",
                    item.image_name,
                    c.vector_score,
                    c.keyword_score,
                    c.final_score
                );
                Some(SearchResult::from_item(item, round2(c.final_score)))
            })
            .collect()
    }

    /// Search, then apply the reranking pass when a reranker is attached.
    ///
    /// The reranker reorders the ranked results and replaces their scores
    /// with its synthetic display scores; it never fails, so neither does
    /// this beyond what `search` can raise.
    pub async fn search_with_rerank(
        &self,
        query: &str,
        top_k: usize,
        query_vector: &[f32],
    ) -> Result<Vec<SearchResult>, SearchError> {
        let results = self.search(query, top_k, query_vector)?;

        let Some(reranker) = &self.reranker else {
            return Ok(results);
        };
        if results.len() < 2 {
            return Ok(results);
        }

        let texts: Vec<String> = results.iter().map(|r| r.describe()).collect();
        let ranking = reranker.rerank(query, &texts).await;

        let reranked = ranking
            .into_iter()
            .filter_map(|(idx, score)| {
                let mut result = results.get(idx)?.clone();
                result.score = round2(score.clamp(0.0, SCORE_CEILING));
                Some(result)
            })
            .collect();

        Ok(reranked)
    }
}

/// Standard rounding to 2 decimal places for display.
fn round2(score: f32) -> f32 {
    (score * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogItem;
    use crate::embedding::IndexParams;
    use async_trait::async_trait;

    fn item(
        id: usize,
        category: &str,
        caption: &str,
        material: &str,
        style: &str,
    ) -> CatalogItem {
        CatalogItem {
            id,
            image_name: format!("item_{:03}.jpg", id),
            category: category.to_string(),
            caption: caption.to_string(),
            material: material.to_string(),
            style: style.to_string(),
        }
    }

    fn jewellery_catalog() -> Arc<CatalogStore> {
        Arc::new(CatalogStore::from_items(vec![
            item(0, "ring", "gold heart ring", "gold", "classic"),
            item(1, "necklace", "silver chain", "silver", "modern"),
            item(2, "ring", "diamond ring", "platinum", "classic"),
        ]))
    }

    fn placeholder_index(count: usize) -> Arc<VectorIndex> {
        let vectors: Vec<Vec<f32>> = (0..count)
            .map(|i| {
                let mut v = vec![0.0; 4];
                v[i % 4] = 1.0;
                v
            })
            .collect();
        Arc::new(VectorIndex::build(4, &vectors, &IndexParams::default()).unwrap())
    }

    fn ranker() -> HybridRanker {
        HybridRanker::new(
            jewellery_catalog(),
            placeholder_index(3),
            SearchConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_cardinality_mismatch_is_fatal() {
        let result = HybridRanker::new(
            jewellery_catalog(),
            placeholder_index(2),
            SearchConfig::default(),
        );
        assert!(matches!(
            result,
            Err(StartupError::CardinalityMismatch {
                catalog: 3,
                index: 2
            })
        ));
    }

    #[test]
    fn test_scenario_heart_ring() {
        // Item 0 gets the closest vector plus category + caption + material
        // keyword matches; item 2 only category.
        let results = ranker().rank("heart ring", 2, &[(0, 0.1), (2, 0.3), (1, 0.9)]);

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].image_name, "item_000.jpg");
        assert_eq!(results[1].image_name, "item_002.jpg");
        assert!(results[0].score > results[1].score);
    }

    #[test]
    fn test_top_k_exceeds_catalog() {
        let results = ranker().rank("ring", 5, &[(0, 0.2), (1, 0.4)]);
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn test_out_of_range_ids_skipped() {
        // -1 is the ANN "no match" sentinel; 99 is past the catalog end
        let results = ranker().rank("ring", 5, &[(-1, 0.0), (0, 0.2), (99, 0.1)]);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].image_name, "item_000.jpg");
    }

    #[test]
    fn test_size_bound() {
        let neighbours: Vec<(i64, f32)> = vec![(0, 0.1), (1, 0.2), (2, 0.3)];
        for top_k in 0..5 {
            let results = ranker().rank("ring", top_k, &neighbours);
            assert!(results.len() <= top_k);
        }
    }

    #[test]
    fn test_score_bounds() {
        // Distance 0 plus a full keyword match: 0.7 * 1.0 + 0.3 * 0.7 = 0.91
        let results = ranker().rank("classic gold heart ring", 3, &[(0, 0.0)]);
        assert_eq!(results[0].score, 0.91);

        for result in ranker().rank("ring", 3, &[(0, 0.0), (1, 0.0), (2, 0.0)]) {
            assert!(result.score >= 0.0);
            assert!(result.score <= 0.99);
        }
    }

    #[test]
    fn test_clamp_to_ceiling() {
        // Force the pre-clamp score above 0.99 with a heavier vector weight
        let config = SearchConfig {
            vector_weight: 1.0,
            keyword_weight: 0.3,
            ..SearchConfig::default()
        };
        let ranker =
            HybridRanker::new(jewellery_catalog(), placeholder_index(3), config).unwrap();
        let results = ranker.rank("classic gold heart ring", 1, &[(0, 0.0)]);
        assert_eq!(results[0].score, 0.99);
    }

    #[test]
    fn test_sort_descending() {
        let results = ranker().rank("silver chain", 3, &[(0, 0.5), (1, 0.9), (2, 0.7)]);
        for pair in results.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
        // Keyword boost lifts the silver chain over closer vectors
        assert_eq!(results[0].image_name, "item_001.jpg");
    }

    #[test]
    fn test_ties_keep_vector_order() {
        // No keyword signal and identical distances: final scores tie, and
        // the stable sort must keep the neighbour input order.
        let results = ranker().rank("", 3, &[(2, 0.4), (0, 0.4), (1, 0.4)]);
        assert_eq!(results[0].image_name, "item_002.jpg");
        assert_eq!(results[1].image_name, "item_000.jpg");
        assert_eq!(results[2].image_name, "item_001.jpg");
    }

    #[test]
    fn test_empty_query_is_pure_vector_order() {
        let results = ranker().rank("   ", 3, &[(1, 0.1), (2, 0.2), (0, 0.3)]);
        assert_eq!(results[0].image_name, "item_001.jpg");
        assert_eq!(results[1].image_name, "item_002.jpg");
        assert_eq!(results[2].image_name, "item_000.jpg");
    }

    #[test]
    fn test_empty_catalog() {
        let ranker = HybridRanker::new(
            Arc::new(CatalogStore::from_items(vec![])),
            placeholder_index(0),
            SearchConfig::default(),
        )
        .unwrap();

        let results = ranker.search("ring", 5, &[1.0, 0.0, 0.0, 0.0]).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_top_k_zero() {
        let results = ranker().search("ring", 0, &[1.0, 0.0, 0.0, 0.0]).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_search_end_to_end() {
        // Real index path: item 0's vector matches the query exactly
        let results = ranker().search("heart ring", 2, &[1.0, 0.0, 0.0, 0.0]).unwrap();
        assert!(!results.is_empty());
        assert_eq!(results[0].image_name, "item_000.jpg");
    }

    struct ReversingReranker;

    #[async_trait]
    impl Reranker for ReversingReranker {
        async fn rerank(&self, _query: &str, candidates: &[String]) -> Vec<(usize, f32)> {
            (0..candidates.len())
                .rev()
                .enumerate()
                .map(|(pos, idx)| (idx, 1.0 - 0.1 * pos as f32))
                .collect()
        }

        fn name(&self) -> &str {
            "reversing"
        }
    }

    #[tokio::test]
    async fn test_rerank_pass_reorders() {
        let ranker = ranker().with_reranker(Arc::new(ReversingReranker));
        let baseline = ranker.search("", 3, &[1.0, 0.0, 0.0, 0.0]).unwrap();
        let reranked = ranker
            .search_with_rerank("", 3, &[1.0, 0.0, 0.0, 0.0])
            .await
            .unwrap();

        assert_eq!(reranked.len(), baseline.len());
        assert_eq!(reranked[0].image_name, baseline[2].image_name);
        // Synthetic scores: 1.0 clamps to the 0.99 ceiling
        assert_eq!(reranked[0].score, 0.99);
        assert_eq!(reranked[1].score, 0.9);
    }

    #[tokio::test]
    async fn test_rerank_pass_without_reranker_is_identity() {
        let ranker = ranker();
        let baseline = ranker.search("ring", 3, &[1.0, 0.0, 0.0, 0.0]).unwrap();
        let passed = ranker
            .search_with_rerank("ring", 3, &[1.0, 0.0, 0.0, 0.0])
            .await
            .unwrap();
        assert_eq!(passed, baseline);
    }
}
