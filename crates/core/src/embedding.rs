//! Embedder trait — the abstraction over the embedding service.
//!
//! The vector index is handed an `Arc<dyn Embedder>` at construction time.
//! The same embedder must be used for writing and for querying an index,
//! otherwise distances are meaningless.

use async_trait::async_trait;
use crate::error::EmbeddingError;

/// Turns text into fixed-length vectors.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// The embedding model identifier (stored alongside the index).
    fn model_id(&self) -> &str;

    /// Embed a batch of texts. Returns exactly one vector per input, in order.
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    /// Embed a single text.
    async fn embed_one(&self, input: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut vectors = self.embed(&[input.to_string()]).await?;
        match vectors.len() {
            1 => Ok(vectors.remove(0)),
            got => Err(EmbeddingError::CountMismatch { expected: 1, got }),
        }
    }
}
