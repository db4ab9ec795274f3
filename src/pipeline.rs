//! RAG pipeline orchestrator.
//!
//! The [`RagPipeline`] coordinates the full ingest-and-answer workflow by
//! composing a [`TextExtractor`], an [`EmbeddingProvider`], a
//! [`VectorIndex`], and a [`Generator`]. Construct one via
//! [`RagPipeline::builder()`] at process start and share it across
//! requests; the pipeline itself holds no per-request mutable state.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use ragserve::{InMemoryVectorIndex, RagConfig, RagPipeline};
//!
//! let pipeline = RagPipeline::builder()
//!     .config(RagConfig::default())
//!     .embedder(Arc::new(embedder))
//!     .index(Arc::new(InMemoryVectorIndex::new()))
//!     .generator(Arc::new(generator))
//!     .build()?;
//!
//! pipeline.ensure_index().await?;
//! pipeline.ingest("report.pdf", &bytes).await?;
//! let answer = pipeline.answer("What happened to revenue?").await?;
//! ```

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::RagConfig;
use crate::document::{Document, IndexEntry, Metric, RetrievedContext};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::extract::{DefaultExtractor, TextExtractor};
use crate::generation::{AnswerStream, Generator, build_prompt};
use crate::index::VectorIndex;

/// Confirmation returned by a successful ingestion.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct IngestReceipt {
    /// The identifier the document was stored under.
    pub id: String,
    /// Number of characters of extracted text that were indexed.
    pub chars: usize,
}

/// The RAG pipeline orchestrator.
///
/// Write path: extract → embed → upsert. Read path: embed → search →
/// threshold filter → context assembly → generation. Each call is one
/// sequential chain of awaited backend round trips; no client-side
/// batching, locking, or retrying is performed.
pub struct RagPipeline {
    config: RagConfig,
    extractor: Arc<dyn TextExtractor>,
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    generator: Arc<dyn Generator>,
}

impl RagPipeline {
    /// Create a new [`RagPipelineBuilder`].
    pub fn builder() -> RagPipelineBuilder {
        RagPipelineBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Provision the configured index if it does not already exist.
    ///
    /// Uses cosine similarity, matching the range assumed by the
    /// relevance threshold.
    pub async fn ensure_index(&self) -> Result<()> {
        self.index
            .create_if_absent(&self.config.index_name, self.config.dimension, Metric::Cosine)
            .await
    }

    /// Ingest an uploaded document: extract → embed → upsert.
    ///
    /// The document is stored under its filename, with the full extracted
    /// text attached as metadata so retrieval can recover the original
    /// passage. Re-ingesting the same filename overwrites the prior entry
    /// (upsert semantics): identifier collisions between distinct uploads
    /// sharing a name are silently resolved in favor of the newest.
    ///
    /// There is no rollback on partial failure; a failed embedding after
    /// a successful extraction leaves no trace since nothing was
    /// persisted yet.
    ///
    /// # Errors
    ///
    /// Propagates [`RagError::Extraction`], the embedding provider's
    /// errors, and the index's errors unchanged.
    pub async fn ingest(&self, filename: &str, bytes: &[u8]) -> Result<IngestReceipt> {
        let text = self.extractor.extract(filename, bytes)?;
        let document = Document::new(filename, text);

        let values = self.embedder.embed(&document.text).await?;
        debug!(document.id = %document.id, dimension = values.len(), "embedded document");

        let entry =
            IndexEntry { id: document.id.clone(), values, metadata: document.metadata.clone() };
        self.index.upsert(&self.config.index_name, std::slice::from_ref(&entry)).await?;

        let chars = document.text.chars().count();
        info!(document.id = %document.id, chars, "ingested document");
        Ok(IngestReceipt { id: document.id, chars })
    }

    /// Retrieve context for a query: embed → search → filter → assemble.
    ///
    /// Matches scoring below the relevance threshold are discarded; the
    /// boundary is inclusive, so a score exactly at the threshold passes.
    /// Surviving matches' `text` metadata is concatenated in descending
    /// score order with no separator. A match missing metadata or its
    /// `text` field is skipped rather than failing.
    ///
    /// Returns an empty context, not an error, when nothing clears the
    /// threshold.
    pub async fn retrieve(&self, query: &str) -> Result<RetrievedContext> {
        if query.trim().is_empty() {
            return Err(RagError::Config("query must not be empty".to_string()));
        }

        let vector = self.embedder.embed(query).await?;
        let results = self
            .index
            .query(&self.config.index_name, &vector, self.config.top_k, true)
            .await?;

        let mut context = String::new();
        let mut matches = Vec::new();
        for result in results {
            // Explicit NaN check: a NaN score from a misbehaving backend
            // would otherwise slip past the `<` comparison.
            if result.score.is_nan() || result.score < self.config.relevance_threshold {
                continue;
            }
            match result.text() {
                Some(text) => context.push_str(text),
                None => {
                    warn!(id = %result.id, "match missing text metadata, skipping");
                    continue;
                }
            }
            matches.push(result);
        }

        info!(
            match_count = matches.len(),
            context_chars = context.len(),
            "retrieval completed"
        );
        Ok(RetrievedContext { context, matches })
    }

    /// Answer a query with retrieved context, buffered.
    ///
    /// With empty context the prompt is still synthesized and the model
    /// answers from the bare query alone.
    pub async fn answer(&self, query: &str) -> Result<String> {
        let retrieved = self.retrieve(query).await?;
        let prompt = build_prompt(&retrieved.context, query);
        self.generator.generate(&prompt).await
    }

    /// Answer a query with retrieved context, as a stream of fragments.
    ///
    /// Fragments already delivered are not retracted if the backend fails
    /// mid-stream; the error arrives as the final item.
    pub async fn answer_stream(&self, query: &str) -> Result<AnswerStream> {
        let retrieved = self.retrieve(query).await?;
        let prompt = build_prompt(&retrieved.context, query);
        self.generator.generate_stream(&prompt).await
    }
}

/// Builder for constructing a [`RagPipeline`].
///
/// The embedder, index, and generator are required; the extractor
/// defaults to [`DefaultExtractor`] and the config to
/// [`RagConfig::default()`].
#[derive(Default)]
pub struct RagPipelineBuilder {
    config: Option<RagConfig>,
    extractor: Option<Arc<dyn TextExtractor>>,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    index: Option<Arc<dyn VectorIndex>>,
    generator: Option<Arc<dyn Generator>>,
}

impl RagPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the text extractor.
    pub fn extractor(mut self, extractor: Arc<dyn TextExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    /// Set the embedding provider.
    pub fn embedder(mut self, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    /// Set the vector index backend.
    pub fn index(mut self, index: Arc<dyn VectorIndex>) -> Self {
        self.index = Some(index);
        self
    }

    /// Set the generation backend.
    pub fn generator(mut self, generator: Arc<dyn Generator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Build the [`RagPipeline`], validating that all required fields
    /// are set and that the embedder agrees with the configured
    /// dimension.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if a required field is missing or
    /// the embedder's dimension differs from `config.dimension`.
    pub fn build(self) -> Result<RagPipeline> {
        let config = self.config.unwrap_or_default();
        let embedder = self
            .embedder
            .ok_or_else(|| RagError::Config("embedder is required".to_string()))?;
        let index =
            self.index.ok_or_else(|| RagError::Config("index is required".to_string()))?;
        let generator = self
            .generator
            .ok_or_else(|| RagError::Config("generator is required".to_string()))?;

        if embedder.dimension() != config.dimension {
            return Err(RagError::Config(format!(
                "embedder dimension ({}) does not match configured dimension ({})",
                embedder.dimension(),
                config.dimension
            )));
        }

        Ok(RagPipeline {
            config,
            extractor: self.extractor.unwrap_or_else(|| Arc::new(DefaultExtractor::default())),
            embedder,
            index,
            generator,
        })
    }
}
