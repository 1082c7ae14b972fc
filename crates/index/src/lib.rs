//! Vector index for Lectern.
//!
//! Two logical collections (`course_metadata`, `course_content`) kept in
//! memory and persisted as JSON lines, with cosine nearest-neighbour search
//! and a local hashing embedder for offline use.

pub mod hashing;
pub mod store;
pub mod vector;

pub use hashing::HashingEmbedder;
pub use store::{EmbeddingSignature, SearchFilter, SearchHit, SearchResults, VectorIndex};
pub use vector::{cosine_distance, cosine_similarity, rank_by_distance};
