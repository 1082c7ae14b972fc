//! # Lectern Core
//!
//! Domain types, traits, and error definitions for Lectern, a
//! retrieval-augmented assistant over course transcripts.
//! This crate has **zero framework dependencies** — it defines the domain
//! model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator (language model, embedding service, search
//! tools) is a trait here. Implementations live in their respective crates
//! and are passed in explicitly, never reached through globals. This enables:
//! - Swapping implementations via configuration
//! - Easy testing with scripted/stub implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod course;
pub mod embedding;
pub mod error;
pub mod message;
pub mod provider;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use course::{Course, CourseChunk, Lesson, Source};
pub use embedding::Embedder;
pub use error::{Error, Result};
pub use message::{History, Message, MessageToolCall, Role, SessionId, Turn};
pub use provider::{Provider, ProviderRequest, ProviderResponse, ToolChoice, ToolDefinition};
pub use tool::{ParamType, ParameterSpec, SourceLedger, Tool, ToolCall, ToolRegistry, ToolResult, ToolSchema};
