//! Local feature-hashing embedder.
//!
//! Needs no network and no model download, so it is the default embedder and
//! the one tests run against. Each lower-cased word contributes its whole
//! form plus its character trigrams (with `#` word-boundary markers), hashed
//! with FNV-1a into a fixed number of buckets. The vector is L2-normalised.
//!
//! Trigrams make near-miss spellings land close together: "testng" and
//! "testing" share `#te`, `tes`, `est` and `ng#`.

use async_trait::async_trait;
use lectern_core::Embedder;
use lectern_core::error::EmbeddingError;

use crate::vector::normalize;

/// Default number of hash buckets.
pub const DEFAULT_DIMENSIONS: usize = 1024;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Deterministic bag-of-features embedder.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimensions: usize,
    model_id: String,
}

impl HashingEmbedder {
    pub fn new(dimensions: usize) -> Self {
        let dimensions = dimensions.max(1);
        Self {
            dimensions,
            model_id: format!("hashing-trigram-{dimensions}"),
        }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Embed one text synchronously.
    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];

        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let word = word.to_lowercase();
            vector[self.bucket(word.as_bytes())] += 1.0;

            let marked: Vec<char> = std::iter::once('#')
                .chain(word.chars())
                .chain(std::iter::once('#'))
                .collect();
            for gram in marked.windows(3) {
                let gram: String = gram.iter().collect();
                vector[self.bucket(gram.as_bytes())] += 1.0;
            }
        }

        normalize(&mut vector);
        vector
    }

    fn bucket(&self, bytes: &[u8]) -> usize {
        (fnv1a(bytes) % self.dimensions as u64) as usize
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_DIMENSIONS)
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET, |hash, b| {
        (hash ^ *b as u64).wrapping_mul(FNV_PRIME)
    })
}

#[async_trait]
impl Embedder for HashingEmbedder {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(inputs.iter().map(|text| self.embed_text(text)).collect())
    }
}
