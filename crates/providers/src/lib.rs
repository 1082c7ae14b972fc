//! Model clients for Lectern.
//!
//! The generation model implements `lectern_core::Provider`; remote
//! embedding services implement `lectern_core::Embedder`.

pub mod anthropic;
pub mod openai_compat;

pub use anthropic::AnthropicProvider;
pub use openai_compat::OpenAiCompatEmbedder;
