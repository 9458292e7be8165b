use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

use gemsearch::catalog::CatalogStore;
use gemsearch::config::SearchConfig;
use gemsearch::embedding::{EmbeddingProvider, ProviderError, VectorIndex};
use gemsearch::error::StartupError;
use gemsearch::retrieval::HybridRanker;

const CATALOG_CSV: &str = "image_name,category,caption,material,style\n\
    ring_001.jpg,ring,gold heart ring,gold,classic\n\
    neck_002.jpg,necklace,silver chain,silver,modern\n\
    ring_003.jpg,ring,diamond ring,platinum,classic\n";

fn item_vectors() -> Vec<Vec<f32>> {
    vec![
        vec![1.0, 0.0, 0.0, 0.0],
        vec![0.0, 1.0, 0.0, 0.0],
        vec![0.8, 0.2, 0.0, 0.0],
    ]
}

/// Write the catalog and vector artifacts the way `build-index` would.
fn write_artifacts(dir: &TempDir, vectors: &[Vec<f32>]) -> (PathBuf, PathBuf) {
    let catalog_path = dir.path().join("catalog.csv");
    let index_path = dir.path().join("vectors.bin");

    std::fs::write(&catalog_path, CATALOG_CSV).unwrap();
    VectorIndex::save_vectors(&index_path, 4, vectors).unwrap();

    (catalog_path, index_path)
}

fn load_engine(catalog_path: &PathBuf, index_path: &PathBuf) -> HybridRanker {
    let config = SearchConfig::default();
    let catalog = CatalogStore::load(catalog_path).unwrap();
    let index = VectorIndex::load(index_path, &config.index_params()).unwrap();
    HybridRanker::new(Arc::new(catalog), Arc::new(index), config).unwrap()
}

#[test]
fn test_search_from_persisted_artifacts() {
    let dir = TempDir::new().unwrap();
    let (catalog_path, index_path) = write_artifacts(&dir, &item_vectors());
    let engine = load_engine(&catalog_path, &index_path);

    // Query vector identical to item 0; keyword signal also favors rings
    let results = engine.search("heart ring", 2, &[1.0, 0.0, 0.0, 0.0]).unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].image_name, "ring_001.jpg");
    assert_eq!(results[1].image_name, "ring_003.jpg");
    assert!(results[0].score > results[1].score);
    assert!(results.iter().all(|r| r.score >= 0.0 && r.score <= 0.99));
}

#[test]
fn test_cardinality_mismatch_fails_startup() {
    let dir = TempDir::new().unwrap();
    let short_vectors = item_vectors()[..2].to_vec();
    let (catalog_path, index_path) = write_artifacts(&dir, &short_vectors);

    let config = SearchConfig::default();
    let catalog = CatalogStore::load(&catalog_path).unwrap();
    let index = VectorIndex::load(&index_path, &config.index_params()).unwrap();

    let result = HybridRanker::new(Arc::new(catalog), Arc::new(index), config);
    assert!(matches!(
        result,
        Err(StartupError::CardinalityMismatch {
            catalog: 3,
            index: 2
        })
    ));
}

#[test]
fn test_missing_index_fails_startup() {
    let dir = TempDir::new().unwrap();
    let config = SearchConfig::default();
    let result = VectorIndex::load(&dir.path().join("vectors.bin"), &config.index_params());
    assert!(result.is_err());
}

/// Deterministic stand-in for the remote embedding provider.
struct StubProvider {
    vector: Vec<f32>,
}

#[async_trait]
impl EmbeddingProvider for StubProvider {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, ProviderError> {
        Ok(self.vector.clone())
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        Ok(texts.iter().map(|_| self.vector.clone()).collect())
    }

    fn dimension(&self) -> usize {
        self.vector.len()
    }

    fn model_name(&self) -> &str {
        "stub"
    }
}

#[tokio::test]
async fn test_pipeline_with_stub_provider() {
    let dir = TempDir::new().unwrap();
    let (catalog_path, index_path) = write_artifacts(&dir, &item_vectors());
    let engine = load_engine(&catalog_path, &index_path);

    let provider: Arc<dyn EmbeddingProvider> = Arc::new(StubProvider {
        vector: vec![0.0, 1.0, 0.0, 0.0],
    });

    let query = "silver chain";
    let query_vector = provider.embed(query).await.unwrap();
    let results = engine
        .search_with_rerank(query, 3, &query_vector)
        .await
        .unwrap();

    // Closest vector and a caption + material keyword match
    assert_eq!(results[0].image_name, "neck_002.jpg");
}

#[test]
fn test_result_json_shape() {
    let dir = TempDir::new().unwrap();
    let (catalog_path, index_path) = write_artifacts(&dir, &item_vectors());
    let engine = load_engine(&catalog_path, &index_path);

    let results = engine.search("gold ring", 1, &[1.0, 0.0, 0.0, 0.0]).unwrap();
    let value = serde_json::to_value(&results).unwrap();

    let first = &value[0];
    for field in ["image_name", "category", "caption", "material", "style", "score"] {
        assert!(first.get(field).is_some(), "missing field {}", field);
    }
}
