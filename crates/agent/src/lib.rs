//! Query orchestration for Lectern.
//!
//! A query goes through at most two language model calls:
//!
//! 1. **Round 1**: system prompt, recent history, the query and every tool
//!    schema. A text-only reply is the answer.
//! 2. **Tools**: requested calls run in order against the [`ToolRegistry`];
//!    the chunks they return are recorded for citation.
//! 3. **Round 2**: the tool results go back to the model with tool use
//!    disabled, and its reply is the answer.
//!
//! [`ToolRegistry`]: lectern_core::tool::ToolRegistry

pub mod orchestrator;
pub mod prompt;
pub mod session;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use orchestrator::{Orchestrator, Phase, QueryAnswer};
pub use prompt::SYSTEM_PROMPT;
pub use session::SessionStore;
