//! Embedding provider trait for generating vector embeddings from text.

use async_trait::async_trait;

use crate::error::Result;

/// A provider that converts text into a fixed-length embedding vector.
///
/// Implementations wrap a specific embedding backend behind a unified
/// async interface. A provider produces vectors of exactly
/// [`dimension()`](EmbeddingProvider::dimension) entries; if the backend
/// streams its result incrementally, the provider accumulates all
/// fragments into one contiguous vector before returning. Partial
/// vectors are never surfaced to callers.
///
/// # Example
///
/// ```rust,ignore
/// use ragserve::EmbeddingProvider;
///
/// let provider = OllamaEmbedder::new("http://localhost:11434", "llama2", 4096)?;
/// let embedding = provider.embed("hello world").await?;
/// assert_eq!(embedding.len(), provider.dimension());
/// ```
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding vector for a single non-empty text input.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Return the dimensionality of embeddings produced by this provider.
    fn dimension(&self) -> usize;
}
