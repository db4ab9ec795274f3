//! Data types for documents, index entries, and search results.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Metadata key under which the extracted text of a document is stored.
///
/// The index stores vectors *and* the text they represent; the vector
/// alone cannot be inverted back to text, so retrieval depends on this
/// field being present.
pub const TEXT_METADATA_KEY: &str = "text";

/// A source document with its extracted text and metadata.
///
/// Identified by its upload filename. Immutable once stored; re-uploading
/// under the same identifier overwrites the prior entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Unique identifier for the document (the upload filename).
    pub id: String,
    /// The text content extracted from the document.
    pub text: String,
    /// Key-value metadata associated with the document.
    pub metadata: HashMap<String, String>,
}

impl Document {
    /// Create a document from extracted text, attaching the text itself
    /// as metadata under [`TEXT_METADATA_KEY`].
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        let text = text.into();
        let metadata = HashMap::from([(TEXT_METADATA_KEY.to_string(), text.clone())]);
        Self { id: id.into(), text, metadata }
    }
}

/// A vector-index record: identifier, embedding values, and metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexEntry {
    /// Unique identifier keying the entry; upserts overwrite by id.
    pub id: String,
    /// The embedding vector. Must match the index's configured dimension.
    pub values: Vec<f32>,
    /// Key-value metadata stored alongside the vector.
    pub metadata: HashMap<String, String>,
}

/// A single match returned by a vector-index query.
///
/// Ephemeral: produced per query and never persisted. Rank is implied by
/// position in the result sequence (best first).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// Identifier of the matched entry.
    pub id: String,
    /// Similarity score under the index's metric (`[-1, 1]` for cosine).
    pub score: f32,
    /// Entry metadata, present only when requested at query time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, String>>,
}

impl SearchResult {
    /// The `text` metadata field of this match, if present.
    pub fn text(&self) -> Option<&str> {
        self.metadata.as_ref()?.get(TEXT_METADATA_KEY).map(String::as_str)
    }
}

/// Context assembled from the matches that cleared the relevance threshold.
///
/// Built fresh per query. `context` concatenates the surviving matches'
/// text in descending score order with no separator; callers needing
/// separators must add them.
#[derive(Debug, Clone, Default)]
pub struct RetrievedContext {
    /// The concatenated context text. Empty when nothing cleared the
    /// threshold; downstream synthesis must tolerate this.
    pub context: String,
    /// The matches that survived the relevance filter, best first.
    pub matches: Vec<SearchResult>,
}

impl RetrievedContext {
    /// Whether no match cleared the relevance threshold.
    pub fn is_empty(&self) -> bool {
        self.context.is_empty()
    }
}

/// Similarity metric an index is provisioned with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    /// Cosine similarity, range `[-1, 1]`. The design default.
    Cosine,
    /// Dot product.
    Dot,
    /// Euclidean distance.
    Euclidean,
}

impl Metric {
    /// The wire name of this metric.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cosine => "cosine",
            Self::Dot => "dotproduct",
            Self::Euclidean => "euclidean",
        }
    }
}
