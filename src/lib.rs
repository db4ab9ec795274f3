//! Retrieval-augmented generation service crate.
//!
//! `ragserve` accepts document uploads, extracts their text, computes
//! embeddings, stores them in a vector index, and answers queries by
//! retrieving relevant passages and forwarding them to a text-generation
//! backend — buffered or as an incremental stream.
//!
//! The core is the [`RagPipeline`]: a composition of a
//! [`TextExtractor`](extract::TextExtractor), an [`EmbeddingProvider`],
//! a [`VectorIndex`], and a [`Generator`], each a trait seam with
//! swappable backends. Provider handles are constructed once at process
//! start and shared read-mostly across requests.
//!
//! # Quick start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use ragserve::ollama::{OllamaEmbedder, OllamaGenerator};
//! use ragserve::{InMemoryVectorIndex, RagConfig, RagPipeline};
//!
//! let config = RagConfig::default();
//! let pipeline = RagPipeline::builder()
//!     .config(config.clone())
//!     .embedder(Arc::new(OllamaEmbedder::new("http://localhost:11434", "llama2", config.dimension)))
//!     .index(Arc::new(InMemoryVectorIndex::new()))
//!     .generator(Arc::new(OllamaGenerator::new("http://localhost:11434", "llama2")))
//!     .build()?;
//!
//! pipeline.ensure_index().await?;
//! pipeline.ingest("report.pdf", &pdf_bytes).await?;
//! let answer = pipeline.answer("What happened to revenue?").await?;
//! ```

pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod generation;
pub mod index;
pub mod inmemory;
pub mod ollama;
pub mod pipeline;

#[cfg(feature = "pinecone")]
pub mod pinecone;

#[cfg(feature = "server")]
pub mod server;

pub use config::{DEFAULT_DIMENSION, RagConfig, RagConfigBuilder};
pub use document::{
    Document, IndexEntry, Metric, RetrievedContext, SearchResult, TEXT_METADATA_KEY,
};
pub use embedding::EmbeddingProvider;
pub use error::{RagError, Result};
pub use generation::{AnswerStream, Generator};
pub use index::VectorIndex;
pub use inmemory::InMemoryVectorIndex;
pub use pipeline::{IngestReceipt, RagPipeline, RagPipelineBuilder};
