//! In-memory vector index using cosine similarity.
//!
//! [`InMemoryVectorIndex`] is a zero-dependency index backed by a
//! `HashMap` protected by a `tokio::sync::RwLock`. It is suitable for
//! development, testing, and single-process deployments.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::document::{IndexEntry, Metric, SearchResult};
use crate::error::{RagError, Result};
use crate::index::VectorIndex;

struct Index {
    dimension: usize,
    entries: HashMap<String, IndexEntry>,
}

/// An in-memory vector index using cosine similarity for search.
///
/// Indexes are stored as name → id → entry. All operations are
/// async-safe via `tokio::sync::RwLock`.
#[derive(Default)]
pub struct InMemoryVectorIndex {
    indexes: RwLock<HashMap<String, Index>>,
}

impl std::fmt::Debug for InMemoryVectorIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryVectorIndex").finish_non_exhaustive()
    }
}

impl InMemoryVectorIndex {
    /// Create a new empty in-memory vector index.
    pub fn new() -> Self {
        Self::default()
    }

    fn missing(name: &str) -> RagError {
        RagError::IndexBackend {
            backend: "InMemory".to_string(),
            message: format!("index '{name}' does not exist"),
        }
    }

    fn check_dimension(expected: usize, actual: usize) -> Result<()> {
        if expected == actual {
            Ok(())
        } else {
            Err(RagError::DimensionMismatch { expected, actual })
        }
    }
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    async fn create_if_absent(&self, name: &str, dimension: usize, _metric: Metric) -> Result<()> {
        let mut indexes = self.indexes.write().await;
        indexes
            .entry(name.to_string())
            .or_insert_with(|| Index { dimension, entries: HashMap::new() });
        Ok(())
    }

    async fn upsert(&self, name: &str, entries: &[IndexEntry]) -> Result<()> {
        let mut indexes = self.indexes.write().await;
        let index = indexes.get_mut(name).ok_or_else(|| Self::missing(name))?;
        for entry in entries {
            Self::check_dimension(index.dimension, entry.values.len())?;
        }
        for entry in entries {
            index.entries.insert(entry.id.clone(), entry.clone());
        }
        Ok(())
    }

    async fn query(
        &self,
        name: &str,
        vector: &[f32],
        top_k: usize,
        include_metadata: bool,
    ) -> Result<Vec<SearchResult>> {
        let indexes = self.indexes.read().await;
        let index = indexes.get(name).ok_or_else(|| Self::missing(name))?;
        Self::check_dimension(index.dimension, vector.len())?;

        let mut scored: Vec<SearchResult> = index
            .entries
            .values()
            .map(|entry| SearchResult {
                id: entry.id.clone(),
                score: cosine_similarity(&entry.values, vector),
                metadata: include_metadata.then(|| entry.metadata.clone()),
            })
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        Ok(scored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_of_identical_vectors_is_one() {
        let v = vec![0.5, -0.3, 0.8];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_of_orthogonal_vectors_is_zero() {
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
    }

    #[test]
    fn cosine_of_opposite_vectors_is_minus_one() {
        assert!((cosine_similarity(&[1.0, 2.0], &[-1.0, -2.0]) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_with_zero_vector_is_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
    }
}
