//! Vector index trait for storing and searching embeddings.

use async_trait::async_trait;

use crate::document::{IndexEntry, Metric, SearchResult};
use crate::error::Result;

/// A managed nearest-neighbor store keyed by document identifier.
///
/// Implementations manage named indexes and support upsert and
/// similarity query. The index is the single source of truth for stored
/// entries and serializes its own writes.
///
/// # Example
///
/// ```rust,ignore
/// use ragserve::{InMemoryVectorIndex, Metric, VectorIndex};
///
/// let index = InMemoryVectorIndex::new();
/// index.create_if_absent("documents", 4096, Metric::Cosine).await?;
/// index.upsert("documents", &entries).await?;
/// let matches = index.query("documents", &query_vector, 2, true).await?;
/// ```
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Provision a named index with the given dimension and metric.
    /// Idempotent: does nothing if the index already exists.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::IndexProvisioning`](crate::RagError::IndexProvisioning)
    /// if creation fails.
    async fn create_if_absent(&self, name: &str, dimension: usize, metric: Metric) -> Result<()>;

    /// Insert or overwrite entries keyed by their ids.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::DimensionMismatch`](crate::RagError::DimensionMismatch)
    /// if any entry's vector length differs from the index dimension.
    async fn upsert(&self, name: &str, entries: &[IndexEntry]) -> Result<()>;

    /// Return up to `top_k` nearest entries to `vector`, best first, each
    /// carrying its similarity score and (if requested) metadata.
    ///
    /// An empty index yields an empty sequence, not an error.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::DimensionMismatch`](crate::RagError::DimensionMismatch)
    /// if `vector` has the wrong length.
    async fn query(
        &self,
        name: &str,
        vector: &[f32],
        top_k: usize,
        include_metadata: bool,
    ) -> Result<Vec<SearchResult>>;
}
