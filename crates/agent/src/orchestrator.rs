//! The query orchestrator.
//!
//! Each query runs through a bounded exchange with the language model:
//!
//! ```text
//! AwaitingFirstResponse ──(text only)──────────────────────────────▶ Done
//!        │
//!        └─(tool calls)─▶ ExecutingTools ─▶ AwaitingSecondResponse ─▶ Done
//! ```
//!
//! There is exactly one round of tool use. The second request still carries
//! the tool definitions (the model needs them to read its own tool calls) but
//! with [`ToolChoice::None`].

use lectern_config::AppConfig;
use lectern_core::course::Source;
use lectern_core::error::{Error, Result, ToolError};
use lectern_core::message::{History, Message, MessageToolCall};
use lectern_core::provider::{Provider, ProviderRequest, ProviderResponse, ToolChoice, ToolDefinition};
use lectern_core::tool::{SourceLedger, ToolCall, ToolRegistry};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use crate::prompt::SYSTEM_PROMPT;

/// Where a query is in its exchange with the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    AwaitingFirstResponse,
    ExecutingTools,
    AwaitingSecondResponse,
    Done,
}

impl Phase {
    pub fn label(&self) -> &'static str {
        match self {
            Self::AwaitingFirstResponse => "round_1",
            Self::ExecutingTools => "tools",
            Self::AwaitingSecondResponse => "round_2",
            Self::Done => "done",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// The final answer to a query and the chunks it cites.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryAnswer {
    pub answer: String,
    /// De-duplicated, in the order tools first returned them.
    pub sources: Vec<Source>,
}

/// Answers queries by combining the language model with the search tools.
pub struct Orchestrator {
    /// The LLM provider to use
    provider: Arc<dyn Provider>,

    /// The model to use
    model: String,

    /// Temperature setting
    temperature: f32,

    /// Max tokens per response
    max_tokens: Option<u32>,

    /// Tool registry
    tools: Arc<ToolRegistry>,

    system_prompt: String,

    /// Exchanges of history sent with round 1
    max_history_turns: usize,

    /// Tool calls executed in the tool round
    max_tool_calls: usize,
}

impl Orchestrator {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>, tools: Arc<ToolRegistry>) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.0,
            max_tokens: Some(800),
            tools,
            system_prompt: SYSTEM_PROMPT.to_string(),
            max_history_turns: 2,
            max_tool_calls: 4,
        }
    }

    /// Build from the `[models]` and `[query]` configuration sections.
    pub fn from_config(provider: Arc<dyn Provider>, tools: Arc<ToolRegistry>, config: &AppConfig) -> Self {
        Self::new(provider, &config.models.generation_model_id, tools)
            .with_temperature(config.models.temperature)
            .with_max_tokens(config.models.max_tokens)
            .with_max_history_turns(config.query.max_history_turns)
            .with_max_tool_calls(config.query.max_tool_calls)
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_max_history_turns(mut self, turns: usize) -> Self {
        self.max_history_turns = turns;
        self
    }

    /// At least one call is always allowed.
    pub fn with_max_tool_calls(mut self, max: usize) -> Self {
        self.max_tool_calls = max.max(1);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Answer one query.
    ///
    /// `history` is read, never modified; recording the new exchange is the
    /// caller's job. Any language model failure fails the whole query and
    /// discards whatever the tools produced.
    pub async fn answer_query(&self, query: &str, history: &History) -> Result<QueryAnswer> {
        let started = Instant::now();
        let definitions = self.tools.definitions();
        let mut messages = self.initial_messages(query, history);

        let first = self
            .call_model(Phase::AwaitingFirstResponse, &messages, &definitions, ToolChoice::Auto)
            .await?;

        if first.message.tool_calls.is_empty() {
            info!(
                phase = %Phase::Done,
                duration_ms = started.elapsed().as_millis() as u64,
                "Answered without tools"
            );
            return Ok(QueryAnswer {
                answer: first.message.content,
                sources: Vec::new(),
            });
        }

        let tool_calls = first.message.tool_calls.clone();
        messages.push(first.message);

        let mut ledger = SourceLedger::new();
        messages.extend(self.execute_tool_calls(&tool_calls, &mut ledger).await?);

        let second = self
            .call_model(Phase::AwaitingSecondResponse, &messages, &definitions, ToolChoice::None)
            .await?;

        if !second.message.tool_calls.is_empty() {
            if second.message.content.trim().is_empty() {
                error!(
                    phase = %Phase::AwaitingSecondResponse,
                    tool_calls = second.message.tool_calls.len(),
                    "Model asked for a second tool round"
                );
                return Err(Error::UnexpectedToolRound);
            }
            warn!(
                tool_calls = second.message.tool_calls.len(),
                "Ignoring tool calls in the final response"
            );
        }

        info!(
            phase = %Phase::Done,
            sources = ledger.len(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Answered with tools"
        );
        Ok(QueryAnswer {
            answer: second.message.content,
            sources: ledger.into_sources(),
        })
    }

    /// System prompt, the most recent history exchanges, then the query.
    fn initial_messages(&self, query: &str, history: &History) -> Vec<Message> {
        let keep = self.max_history_turns * 2;
        let skip = history.len().saturating_sub(keep);

        let mut messages = Vec::with_capacity(keep + 2);
        messages.push(Message::system(&self.system_prompt));
        messages.extend(history.turns().skip(skip).map(|turn| turn.to_message()));
        messages.push(Message::user(query));
        messages
    }

    async fn call_model(
        &self,
        phase: Phase,
        messages: &[Message],
        definitions: &[ToolDefinition],
        tool_choice: ToolChoice,
    ) -> Result<ProviderResponse> {
        let request = ProviderRequest {
            model: self.model.clone(),
            messages: messages.to_vec(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            tools: definitions.to_vec(),
            tool_choice,
        };

        debug!(
            phase = %phase,
            model = %self.model,
            messages = messages.len(),
            tools = definitions.len(),
            ?tool_choice,
            "Calling language model"
        );

        let start = Instant::now();
        let response = self.provider.complete(request).await.map_err(|e| {
            error!(phase = %phase, provider = self.provider.name(), error = %e, "Language model call failed");
            e
        })?;

        info!(
            phase = %phase,
            model = %response.model,
            duration_ms = start.elapsed().as_millis() as u64,
            tool_calls = response.message.tool_calls.len(),
            stop_reason = response.stop_reason.as_deref().unwrap_or("unknown"),
            "Language model responded"
        );
        Ok(response)
    }

    /// Run the requested calls in order and build one tool result message per
    /// call. Calls beyond the cap are answered with an error result without
    /// running. A failing index aborts the query.
    async fn execute_tool_calls(
        &self,
        tool_calls: &[MessageToolCall],
        ledger: &mut SourceLedger,
    ) -> Result<Vec<Message>> {
        debug!(
            phase = %Phase::ExecutingTools,
            requested = tool_calls.len(),
            cap = self.max_tool_calls,
            "Executing tool calls"
        );

        let mut results = Vec::with_capacity(tool_calls.len());
        for (position, tc) in tool_calls.iter().enumerate() {
            if position >= self.max_tool_calls {
                warn!(tool = %tc.name, cap = self.max_tool_calls, "Tool call limit reached");
                results.push(Message::tool_error(
                    &tc.id,
                    format!(
                        "Tool call limit reached ({} per query); this call was not executed",
                        self.max_tool_calls
                    ),
                ));
                continue;
            }

            let arguments = match parse_arguments(&tc.arguments) {
                Ok(arguments) => arguments,
                Err(e) => {
                    warn!(tool = %tc.name, error = %e, "Tool arguments are not valid JSON");
                    results.push(Message::tool_error(
                        &tc.id,
                        format!("Invalid JSON arguments for {}: {e}", tc.name),
                    ));
                    continue;
                }
            };
            let call = ToolCall {
                id: tc.id.clone(),
                name: tc.name.clone(),
                arguments,
            };

            let start = Instant::now();
            let result = self.tools.execute_recorded(&call, ledger).await;
            let duration_ms = start.elapsed().as_millis() as u64;

            match result {
                Ok(tool_result) => {
                    debug!(tool = %tc.name, duration_ms, success = tool_result.success, "Tool finished");
                    results.push(if tool_result.success {
                        Message::tool_result(&tc.id, tool_result.output)
                    } else {
                        Message::tool_error(&tc.id, tool_result.output)
                    });
                }
                Err(ToolError::Backend(e)) => {
                    error!(tool = %tc.name, error = %e, "Search backend failed");
                    return Err(Error::Index(e));
                }
                Err(e) => {
                    warn!(tool = %tc.name, duration_ms, error = %e, "Tool execution failed");
                    results.push(Message::tool_error(&tc.id, e.to_string()));
                }
            }
        }
        Ok(results)
    }
}

fn parse_arguments(raw: &str) -> std::result::Result<serde_json::Value, serde_json::Error> {
    if raw.trim().is_empty() {
        return Ok(serde_json::json!({}));
    }
    serde_json::from_str(raw)
}
