//! Catalog store: per-item metadata keyed by stable row position
//!
//! The catalog is loaded once at startup from a CSV artifact and is
//! immutable afterwards. Item `id` equals the row position in the file and
//! must match the item's position in the vector index.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Catalog file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("Failed to read catalog: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse catalog row {row}: {source}")]
    Parse { row: usize, source: csv::Error },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Raw CSV row, without the positional id.
#[derive(Debug, Deserialize)]
struct CatalogRow {
    image_name: String,
    category: String,
    caption: String,
    material: String,
    style: String,
}

/// A single catalog item, immutable after load.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CatalogItem {
    /// Stable 0-based id, equal to the item's row position in the catalog
    /// file and its position in the vector index.
    pub id: usize,
    pub image_name: String,
    pub category: String,
    pub caption: String,
    pub material: String,
    pub style: String,
}

impl CatalogItem {
    /// Canonical text fed to the embedding provider at index-build time.
    pub fn embedding_text(&self) -> String {
        format!(
            "{}. Category: {}. Material: {}. Style: {}.",
            self.caption, self.category, self.material, self.style
        )
    }
}

/// In-memory catalog, owned exclusively by the store and looked up by id.
pub struct CatalogStore {
    items: Vec<CatalogItem>,
}

impl CatalogStore {
    /// Load the catalog from a CSV file with columns
    /// `image_name,category,caption,material,style`.
    ///
    /// Fields are trimmed once here so the ranker can tokenize them without
    /// further cleanup.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        if !path.exists() {
            return Err(CatalogError::NotFound {
                path: path.to_path_buf(),
            });
        }

        let mut reader = csv::Reader::from_path(path)?;
        let mut items = Vec::new();

        for (row, record) in reader.deserialize::<CatalogRow>().enumerate() {
            let record = record.map_err(|source| CatalogError::Parse { row, source })?;
            items.push(CatalogItem {
                id: row,
                image_name: record.image_name.trim().to_string(),
                category: record.category.trim().to_string(),
                caption: record.caption.trim().to_string(),
                material: record.material.trim().to_string(),
                style: record.style.trim().to_string(),
            });
        }

        tracing::info!("Catalog loaded: {} items", items.len());

        Ok(Self { items })
    }

    /// Build a store directly from items (tests and tooling).
    pub fn from_items(items: Vec<CatalogItem>) -> Self {
        Self { items }
    }

    /// Look up an item by id.
    pub fn get(&self, id: usize) -> Option<&CatalogItem> {
        self.items.get(id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CatalogItem> {
        self.items.iter()
    }
}
