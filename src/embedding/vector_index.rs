//! HNSW vector index over precomputed catalog embeddings
//!
//! The index is immutable after build: vectors are inserted once at startup
//! (from the persisted vector file) and only queried afterwards, so the
//! read path needs no locking.

use hnsw_rs::prelude::*;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Header of the persisted vector file: magic, format version, dimension,
/// vector count, then `count * dimension` little-endian f32 values.
const MAGIC: [u8; 4] = *b"GSVI";
const FORMAT_VERSION: u32 = 1;

const HNSW_MAX_LAYER: usize = 16;

/// Sanity bound on the persisted header's dimension field; real embedding
/// models stay far below this.
const MAX_DIMENSION: usize = 65_536;

#[derive(Error, Debug)]
pub enum VectorIndexError {
    #[error("Vector file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid vector file: {0}")]
    Format(String),

    #[error("Invalid dimension: expected {expected}, got {actual}")]
    InvalidDimension { expected: usize, actual: usize },
}

/// HNSW construction and search parameters.
#[derive(Debug, Clone)]
pub struct IndexParams {
    /// Number of connections per layer
    pub m: usize,
    /// Construction beam width (higher = better recall, slower build)
    pub ef_construction: usize,
    /// Search beam width (higher = better recall, slower search)
    pub ef_search: usize,
}

impl Default for IndexParams {
    fn default() -> Self {
        Self {
            m: 16,
            ef_construction: 200,
            ef_search: 100,
        }
    }
}

/// Approximate nearest-neighbor index over fixed-dimension vectors.
///
/// The item at index position `i` corresponds exactly to catalog row `i`.
pub struct VectorIndex {
    index: Hnsw<'static, f32, DistL2>,
    /// Retained for exact scans when a query asks for the whole index
    vectors: Vec<Vec<f32>>,
    dimension: usize,
    count: usize,
    ef_search: usize,
}

impl VectorIndex {
    /// Build an index from in-memory vectors, one per catalog item, in
    /// catalog row order.
    pub fn build(
        dimension: usize,
        vectors: &[Vec<f32>],
        params: &IndexParams,
    ) -> Result<Self, VectorIndexError> {
        let index = Hnsw::<f32, DistL2>::new(
            params.m,
            vectors.len().max(1),
            HNSW_MAX_LAYER,
            params.ef_construction,
            DistL2,
        );

        for (id, vector) in vectors.iter().enumerate() {
            if vector.len() != dimension {
                return Err(VectorIndexError::InvalidDimension {
                    expected: dimension,
                    actual: vector.len(),
                });
            }
            index.insert((vector, id));
        }

        Ok(Self {
            index,
            vectors: vectors.to_vec(),
            dimension,
            count: vectors.len(),
            ef_search: params.ef_search,
        })
    }

    /// Load the persisted vector file and rebuild the HNSW graph.
    pub fn load(path: &Path, params: &IndexParams) -> Result<Self, VectorIndexError> {
        let (dimension, vectors) = Self::read_vectors(path)?;
        let index = Self::build(dimension, &vectors, params)?;
        tracing::info!(
            "Vector index loaded: {} vectors, dimension {}",
            index.count,
            dimension
        );
        Ok(index)
    }

    /// Read the persisted vector file into memory.
    pub fn read_vectors(path: &Path) -> Result<(usize, Vec<Vec<f32>>), VectorIndexError> {
        if !path.exists() {
            return Err(VectorIndexError::NotFound {
                path: path.to_path_buf(),
            });
        }

        let mut reader = BufReader::new(File::open(path)?);

        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        if magic != MAGIC {
            return Err(VectorIndexError::Format("bad magic bytes".to_string()));
        }

        let version = read_u32(&mut reader)?;
        if version != FORMAT_VERSION {
            return Err(VectorIndexError::Format(format!(
                "unsupported format version {}",
                version
            )));
        }

        let dimension = read_u32(&mut reader)? as usize;
        let count = read_u32(&mut reader)? as usize;
        if dimension == 0 || dimension > MAX_DIMENSION {
            return Err(VectorIndexError::Format(format!(
                "implausible dimension {}",
                dimension
            )));
        }

        // The header is untrusted until the data reads succeed; a corrupt
        // count must not drive a huge up-front allocation.
        let mut vectors = Vec::with_capacity(count.min(1024));
        let mut buf = vec![0u8; dimension * 4];
        for i in 0..count {
            reader.read_exact(&mut buf).map_err(|_| {
                VectorIndexError::Format(format!("truncated data at vector {}", i))
            })?;
            let vector: Vec<f32> = buf
                .chunks_exact(4)
                .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                .collect();
            vectors.push(vector);
        }

        Ok((dimension, vectors))
    }

    /// Persist vectors to the flat file format.
    pub fn save_vectors(
        path: &Path,
        dimension: usize,
        vectors: &[Vec<f32>],
    ) -> Result<(), VectorIndexError> {
        let mut writer = BufWriter::new(File::create(path)?);

        writer.write_all(&MAGIC)?;
        writer.write_all(&FORMAT_VERSION.to_le_bytes())?;
        writer.write_all(&(dimension as u32).to_le_bytes())?;
        writer.write_all(&(vectors.len() as u32).to_le_bytes())?;

        for vector in vectors {
            if vector.len() != dimension {
                return Err(VectorIndexError::InvalidDimension {
                    expected: dimension,
                    actual: vector.len(),
                });
            }
            for value in vector {
                writer.write_all(&value.to_le_bytes())?;
            }
        }

        writer.flush()?;
        Ok(())
    }

    /// Search for the k nearest neighbors of `query`.
    ///
    /// Returns `(id, distance)` pairs sorted ascending by squared L2
    /// distance (lower = more similar), at most k of them. Requesting more
    /// neighbors than the index holds returns all of them, not an error.
    /// Ids are `i64` so a negative "no match" sentinel survives the
    /// contract; callers must skip ids outside catalog range.
    ///
    /// A k that covers the whole index is answered by an exact scan: the
    /// graph walk buys nothing there and can miss neighbors on tiny
    /// datasets.
    pub fn query(&self, query: &[f32], k: usize) -> Result<Vec<(i64, f32)>, VectorIndexError> {
        if query.len() != self.dimension {
            return Err(VectorIndexError::InvalidDimension {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        if self.count == 0 || k == 0 {
            return Ok(Vec::new());
        }

        if k >= self.count {
            let mut results: Vec<(i64, f32)> = self
                .vectors
                .iter()
                .enumerate()
                .map(|(id, v)| (id as i64, squared_l2(query, v)))
                .collect();
            results.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
            return Ok(results);
        }

        let neighbours = self.index.search(query, k, self.ef_search.max(k));

        let mut results: Vec<(i64, f32)> = neighbours
            .into_iter()
            .map(|n| (n.d_id as i64, n.distance))
            .collect();
        results.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

        Ok(results)
    }

    /// Number of indexed vectors
    pub fn len(&self) -> usize {
        self.count
    }

    /// Check if the index is empty
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Get vector dimension
    pub fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Squared Euclidean distance, matching the HNSW metric.
fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

fn read_u32(reader: &mut impl Read) -> Result<u32, std::io::Error> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}
