//! Message, turn, and session-history domain types.
//!
//! These are the value objects that flow through a query:
//! caller supplies a [`History`] → orchestrator builds [`Message`]s → provider
//! generates a response.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use uuid::Uuid;

/// Unique identifier for a chat session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user
    User,
    /// The AI assistant
    Assistant,
    /// System instructions
    System,
    /// Tool execution result
    Tool,
}

/// A single message sent to or received from the language model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique message ID
    pub id: String,

    /// Who sent this message
    pub role: Role,

    /// The text content
    pub content: String,

    /// Tool calls requested by the assistant (if any)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<MessageToolCall>,

    /// If this is a tool result, which tool call it responds to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,

    /// Whether a tool result reports a failure
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,

    /// Timestamp
    pub timestamp: DateTime<Utc>,
}

impl Message {
    fn with_role(role: Role, content: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content,
            tool_calls: Vec::new(),
            tool_call_id: None,
            is_error: false,
            timestamp: Utc::now(),
        }
    }

    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(Role::User, content.into())
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role(Role::Assistant, content.into())
    }

    /// Create a new system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role(Role::System, content.into())
    }

    /// Create a successful tool result message.
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        let mut msg = Self::with_role(Role::Tool, content.into());
        msg.tool_call_id = Some(tool_call_id.into());
        msg
    }

    /// Create a tool result message reporting a failure.
    pub fn tool_error(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        let mut msg = Self::tool_result(tool_call_id, content);
        msg.is_error = true;
        msg
    }
}

/// A tool call embedded in an assistant message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageToolCall {
    /// Unique ID for this tool call
    pub id: String,

    /// Name of the tool to invoke
    pub name: String,

    /// Arguments as JSON string
    pub arguments: String,
}

/// One prior message of a session: a (role, content) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }

    /// Convert into a provider message.
    pub fn to_message(&self) -> Message {
        match self.role {
            Role::Assistant => Message::assistant(&self.content),
            Role::System => Message::system(&self.content),
            Role::User | Role::Tool => Message::user(&self.content),
        }
    }
}

/// Bounded session history.
///
/// Holds at most `max_exchanges` question/answer pairs; the oldest pair is
/// discarded first once the bound is exceeded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct History {
    max_exchanges: usize,
    turns: VecDeque<Turn>,
}

impl History {
    pub fn new(max_exchanges: usize) -> Self {
        Self {
            max_exchanges,
            turns: VecDeque::with_capacity(max_exchanges * 2),
        }
    }

    /// Record a completed exchange.
    pub fn push_exchange(&mut self, question: impl Into<String>, answer: impl Into<String>) {
        self.turns.push_back(Turn::user(question));
        self.turns.push_back(Turn::assistant(answer));
        while self.turns.len() > self.max_exchanges * 2 {
            self.turns.pop_front();
        }
    }

    pub fn turns(&self) -> impl Iterator<Item = &Turn> {
        self.turns.iter()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn max_exchanges(&self) -> usize {
        self.max_exchanges
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_user_message() {
        let msg = Message::user("What is a test double?");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.content, "What is a test double?");
        assert!(msg.tool_calls.is_empty());
        assert!(!msg.is_error);
    }

    #[test]
    fn tool_error_message_is_flagged() {
        let msg = Message::tool_error("toolu_1", "Tool 'nope' not found");
        assert_eq!(msg.role, Role::Tool);
        assert_eq!(msg.tool_call_id.as_deref(), Some("toolu_1"));
        assert!(msg.is_error);
    }

    #[test]
    fn message_serialization_roundtrip() {
        let msg = Message::assistant("Fixtures set up shared state.");
        let json = serde_json::to_string(&msg).unwrap();
        assert!(!json.contains("is_error"));
        let deserialized: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized.content, "Fixtures set up shared state.");
        assert_eq!(deserialized.role, Role::Assistant);
    }

    #[test]
    fn history_discards_oldest_exchange() {
        let mut history = History::new(2);
        history.push_exchange("q1", "a1");
        history.push_exchange("q2", "a2");
        history.push_exchange("q3", "a3");

        assert_eq!(history.len(), 4);
        let contents: Vec<&str> = history.turns().map(|t| t.content.as_str()).collect();
        assert_eq!(contents, vec!["q2", "a2", "q3", "a3"]);
    }

    #[test]
    fn zero_bound_history_stays_empty() {
        let mut history = History::new(0);
        history.push_exchange("q", "a");
        assert!(history.is_empty());
    }

    #[test]
    fn turn_to_message_keeps_role() {
        assert_eq!(Turn::user("hi").to_message().role, Role::User);
        assert_eq!(Turn::assistant("hello").to_message().role, Role::Assistant);
    }
}
