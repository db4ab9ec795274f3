//! Error types for the `ragserve` crate.

use thiserror::Error;

/// Errors that can occur in RAG operations.
///
/// Every variant surfaces to the caller as a request failure with a
/// descriptive message. Nothing is retried automatically and no
/// compensating rollback is attempted for partially completed steps.
#[derive(Debug, Error)]
pub enum RagError {
    /// The source document was unreadable or malformed.
    #[error("Extraction error: {0}")]
    Extraction(String),

    /// The embedding backend could not be reached or rejected the request.
    #[error("Embedding provider unavailable ({provider}): {message}")]
    ProviderUnavailable {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// The embedding payload could not be parsed into one flat numeric vector.
    #[error("Invalid embedding format: {0}")]
    InvalidEmbeddingFormat(String),

    /// A vector's length does not match the index's configured dimension.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// The dimension the index was provisioned with.
        expected: usize,
        /// The length of the offending vector.
        actual: usize,
    },

    /// Index creation failed.
    #[error("Index provisioning error: {0}")]
    IndexProvisioning(String),

    /// An error occurred in the vector index backend.
    #[error("Vector index error ({backend}): {message}")]
    IndexBackend {
        /// The vector index backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// The text-generation backend could not be reached or returned a
    /// malformed payload.
    #[error("Generation service error: {0}")]
    GenerationService(String),

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;
