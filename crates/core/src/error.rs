//! Error types for the Lectern domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum; the top-level [`Error`]
//! is what a query or ingestion call ultimately surfaces.

use std::path::PathBuf;
use thiserror::Error;

/// The top-level error type for all Lectern operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Language model errors ---
    #[error("Language model error: {0}")]
    Provider(#[from] ProviderError),

    // --- Embedding service errors ---
    #[error("Embedding service error: {0}")]
    Embedding(#[from] EmbeddingError),

    // --- Vector index errors ---
    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    // --- Ingestion errors ---
    #[error("Ingestion error: {0}")]
    Ingestion(#[from] IngestionError),

    /// The model asked for more tools after the single tool round and gave
    /// no usable text.
    #[error("Model requested another tool round; only one is permitted")]
    UnexpectedToolRound,
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Failures talking to the generative language model.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError {
        status_code: u16,
        message: String,
    },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

/// Failures talking to the embedding service.
#[derive(Debug, Clone, Error)]
pub enum EmbeddingError {
    #[error("Embedding service unavailable: {0}")]
    Unavailable(String),

    #[error("Embedding request rejected: {message} (status: {status_code})")]
    Rejected { status_code: u16, message: String },

    #[error("Embedding service returned {got} vectors for {expected} inputs")]
    CountMismatch { expected: usize, got: usize },

    #[error("Embedding provider not configured: {0}")]
    NotConfigured(String),
}

impl EmbeddingError {
    /// Whether a caller could reasonably try the same request again later.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Unavailable(_) => true,
            Self::Rejected { status_code, .. } => *status_code == 429 || *status_code >= 500,
            Self::CountMismatch { .. } | Self::NotConfigured(_) => false,
        }
    }
}

/// Failures inside the vector index.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error("Corrupted record in {collection}: {reason}")]
    Corrupted { collection: String, reason: String },

    /// Stored vectors came from a different embedding model or dimension
    /// than the embedder now in use. Distances between them are meaningless.
    #[error("Index was built with embeddings from {stored} but the current embedder is {current}; re-ingest with --clear")]
    EmbeddingMismatch { stored: String, current: String },
}

/// Failures executing a tool requested by the model.
///
/// Apart from [`ToolError::Backend`], these are never thrown to the caller of
/// a query; the orchestrator feeds them back to the model as an error tool
/// result.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool '{0}' not found")]
    NotFound(String),

    #[error("Invalid tool arguments for {tool_name}: {reason}")]
    InvalidArguments { tool_name: String, reason: String },

    /// The index behind a search tool failed. Unlike the variants above this
    /// aborts the query instead of going back to the model.
    #[error("Search backend failed: {0}")]
    Backend(#[from] IndexError),
}

/// A single document could not be ingested. Batch ingestion skips it and
/// continues with the next document.
#[derive(Debug, Error)]
pub enum IngestionError {
    #[error("Failed to read {path}: {reason}")]
    Unreadable { path: PathBuf, reason: String },

    #[error("{path} is not valid {encoding}")]
    Encoding { path: PathBuf, encoding: String },

    #[error("{path} contains no course text")]
    Empty { path: PathBuf },

    #[error("Could not determine a course title for {path}")]
    MissingTitle { path: PathBuf },
}
