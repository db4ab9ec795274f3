//! Configuration for the RAG pipeline.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// Embedding dimension of the default `llama2` embedding model.
pub const DEFAULT_DIMENSION: usize = 4096;

/// Configuration parameters for the RAG pipeline.
///
/// Defaults to top-2 retrieval with a strict 0.80 cosine relevance
/// cutoff; both knobs are configurable per deployment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RagConfig {
    /// Name of the vector index used by the pipeline.
    pub index_name: String,
    /// Embedding dimension D. Every vector stored in or queried against
    /// the index must have exactly this length.
    pub dimension: usize,
    /// Number of nearest entries to request from vector search.
    pub top_k: usize,
    /// Minimum cosine similarity for a match to contribute context.
    /// The boundary is inclusive: a score exactly at the threshold passes.
    pub relevance_threshold: f32,
    /// Model name sent to the embedding backend.
    pub embed_model: String,
    /// Model name sent to the generation backend.
    pub generation_model: String,
    /// Timeout applied to every outbound network call.
    #[serde(with = "duration_secs")]
    pub request_timeout: Duration,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            index_name: "documents".to_string(),
            dimension: DEFAULT_DIMENSION,
            top_k: 2,
            relevance_threshold: 0.80,
            embed_model: "llama2".to_string(),
            generation_model: "llama2".to_string(),
            request_timeout: Duration::from_secs(60),
        }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }

    /// Load configuration from `RAGSERVE_*` environment variables,
    /// falling back to defaults for unset variables.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if a variable is set but does not
    /// parse, or if the resulting configuration fails validation.
    pub fn from_env() -> Result<Self> {
        let mut builder = Self::builder();

        if let Ok(name) = std::env::var("RAGSERVE_INDEX_NAME") {
            builder = builder.index_name(name);
        }
        if let Some(dimension) = parse_env("RAGSERVE_DIMENSION")? {
            builder = builder.dimension(dimension);
        }
        if let Some(top_k) = parse_env("RAGSERVE_TOP_K")? {
            builder = builder.top_k(top_k);
        }
        if let Some(threshold) = parse_env("RAGSERVE_RELEVANCE_THRESHOLD")? {
            builder = builder.relevance_threshold(threshold);
        }
        if let Ok(model) = std::env::var("RAGSERVE_EMBED_MODEL") {
            builder = builder.embed_model(model);
        }
        if let Ok(model) = std::env::var("RAGSERVE_GENERATION_MODEL") {
            builder = builder.generation_model(model);
        }
        if let Some(secs) = parse_env::<u64>("RAGSERVE_REQUEST_TIMEOUT_SECS")? {
            builder = builder.request_timeout(Duration::from_secs(secs));
        }

        builder.build()
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match std::env::var(name) {
        Ok(value) => value
            .parse()
            .map(Some)
            .map_err(|_| RagError::Config(format!("{name} has invalid value '{value}'"))),
        Err(_) => Ok(None),
    }
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Set the vector index name.
    pub fn index_name(mut self, name: impl Into<String>) -> Self {
        self.config.index_name = name.into();
        self
    }

    /// Set the embedding dimension D.
    pub fn dimension(mut self, dimension: usize) -> Self {
        self.config.dimension = dimension;
        self
    }

    /// Set the number of top results to request from vector search.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Set the minimum similarity score for usable context (inclusive).
    pub fn relevance_threshold(mut self, threshold: f32) -> Self {
        self.config.relevance_threshold = threshold;
        self
    }

    /// Set the embedding model name.
    pub fn embed_model(mut self, model: impl Into<String>) -> Self {
        self.config.embed_model = model.into();
        self
    }

    /// Set the generation model name.
    pub fn generation_model(mut self, model: impl Into<String>) -> Self {
        self.config.generation_model = model.into();
        self
    }

    /// Set the timeout for outbound network calls.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    /// Build the [`RagConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if:
    /// - `dimension == 0`
    /// - `top_k == 0`
    /// - `relevance_threshold` is outside the cosine range `[-1, 1]`
    /// - `index_name` is empty
    pub fn build(self) -> Result<RagConfig> {
        if self.config.dimension == 0 {
            return Err(RagError::Config("dimension must be greater than zero".to_string()));
        }
        if self.config.top_k == 0 {
            return Err(RagError::Config("top_k must be greater than zero".to_string()));
        }
        if !(-1.0..=1.0).contains(&self.config.relevance_threshold) {
            return Err(RagError::Config(format!(
                "relevance_threshold ({}) must be within [-1, 1]",
                self.config.relevance_threshold
            )));
        }
        if self.config.index_name.is_empty() {
            return Err(RagError::Config("index_name must not be empty".to_string()));
        }
        Ok(self.config)
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(d)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_strict_top_two_retrieval() {
        let config = RagConfig::default();
        assert_eq!(config.top_k, 2);
        assert_eq!(config.relevance_threshold, 0.80);
        assert_eq!(config.dimension, DEFAULT_DIMENSION);
    }

    #[test]
    fn builder_rejects_zero_top_k() {
        let result = RagConfig::builder().top_k(0).build();
        assert!(matches!(result, Err(RagError::Config(_))));
    }

    #[test]
    fn builder_rejects_zero_dimension() {
        let result = RagConfig::builder().dimension(0).build();
        assert!(matches!(result, Err(RagError::Config(_))));
    }

    #[test]
    fn builder_rejects_out_of_range_threshold() {
        let result = RagConfig::builder().relevance_threshold(1.5).build();
        assert!(matches!(result, Err(RagError::Config(_))));
    }

    #[test]
    fn builder_accepts_boundary_threshold() {
        let config = RagConfig::builder().relevance_threshold(1.0).build().unwrap();
        assert_eq!(config.relevance_threshold, 1.0);
    }
}
