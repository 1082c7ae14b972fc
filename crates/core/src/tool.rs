//! Tool trait, declarative tool schemas, and the tool registry.
//!
//! Tools are the search capabilities the language model may invoke by name.
//! Each tool publishes a [`ToolSchema`]; the registry validates the model's
//! arguments against it before the handler ever runs.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;
use crate::course::Source;
use crate::error::ToolError;
use crate::provider::ToolDefinition;

/// A request to execute a tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique call ID (matches the LLM's tool_use id)
    pub id: String,

    /// Name of the tool to execute
    pub name: String,

    /// Arguments as a JSON value
    pub arguments: serde_json::Value,
}

/// The result of a tool execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// The call ID this result is for
    pub call_id: String,

    /// Whether the tool executed successfully
    pub success: bool,

    /// The output content handed back to the model
    pub output: String,

    /// Chunks the output was built from, for source attribution
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<Source>,
}

impl ToolResult {
    /// A successful result with no attributable sources.
    pub fn text(output: impl Into<String>) -> Self {
        Self {
            call_id: String::new(),
            success: true,
            output: output.into(),
            sources: Vec::new(),
        }
    }

    /// Attach the chunks this result was built from.
    pub fn with_sources(mut self, sources: Vec<Source>) -> Self {
        self.sources = sources;
        self
    }
}

/// Primitive parameter types understood by the language model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Integer,
    Number,
    Boolean,
}

impl ParamType {
    fn accepts(self, value: &serde_json::Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
        }
    }
}

/// One named, typed parameter of a tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub name: String,

    #[serde(rename = "type")]
    pub kind: ParamType,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    #[serde(default)]
    pub required: bool,
}

impl ParameterSpec {
    pub fn required(name: impl Into<String>, kind: ParamType, description: impl Into<String>) -> Self {
        Self { name: name.into(), kind, description: description.into(), required: true }
    }

    pub fn optional(name: impl Into<String>, kind: ParamType, description: impl Into<String>) -> Self {
        Self { name: name.into(), kind, description: description.into(), required: false }
    }
}

/// Declarative description of a tool: `{name, description, parameters: [{name, type, required}]}`.
///
/// Never mutated after registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub parameters: Vec<ParameterSpec>,
}

impl ToolSchema {
    /// Render the parameter list as a JSON Schema object.
    pub fn to_json_schema(&self) -> serde_json::Value {
        let mut properties = serde_json::Map::new();
        for param in &self.parameters {
            let mut prop = serde_json::json!({ "type": param.kind.as_str() });
            if !param.description.is_empty() {
                prop["description"] = serde_json::json!(param.description);
            }
            properties.insert(param.name.clone(), prop);
        }
        let required: Vec<&str> = self
            .parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();

        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// Convert into the definition sent to the language model.
    pub fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name.clone(),
            description: self.description.clone(),
            parameters: self.to_json_schema(),
        }
    }

    /// Check arguments against the parameter list.
    ///
    /// Arguments must be a JSON object; every required parameter must be
    /// present, every present parameter must be declared and well-typed.
    /// An explicit `null` counts as absent.
    pub fn validate(&self, arguments: &serde_json::Value) -> Result<(), String> {
        let Some(args) = arguments.as_object() else {
            return Err("arguments must be a JSON object".into());
        };

        for (key, value) in args {
            let Some(spec) = self.parameters.iter().find(|p| &p.name == key) else {
                return Err(format!("unknown parameter '{key}'"));
            };
            if !value.is_null() && !spec.kind.accepts(value) {
                return Err(format!(
                    "parameter '{key}' must be of type {}",
                    spec.kind.as_str()
                ));
            }
        }

        for spec in self.parameters.iter().filter(|p| p.required) {
            if args.get(&spec.name).is_none_or(|v| v.is_null()) {
                return Err(format!("missing required parameter '{}'", spec.name));
            }
        }

        Ok(())
    }
}

/// The core Tool trait.
///
/// A tool is a schema plus a handler. Handlers receive arguments that have
/// already been validated against the schema.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The tool's declarative schema (sent to the LLM).
    fn schema(&self) -> &ToolSchema;

    /// Execute the tool with the given arguments.
    async fn execute(&self, arguments: serde_json::Value) -> std::result::Result<ToolResult, ToolError>;

    /// The unique name of this tool.
    fn name(&self) -> &str {
        &self.schema().name
    }
}

/// Sources recorded while answering one query.
///
/// Ordered by first use and de-duplicated by chunk identity.
#[derive(Debug, Clone, Default)]
pub struct SourceLedger {
    sources: Vec<Source>,
}

impl SourceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record sources, skipping chunks already present.
    pub fn record(&mut self, sources: impl IntoIterator<Item = Source>) {
        for source in sources {
            if !self.sources.iter().any(|s| s.same_chunk(&source)) {
                self.sources.push(source);
            }
        }
    }

    /// Forget everything recorded so far.
    pub fn reset(&mut self) {
        self.sources.clear();
    }

    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    pub fn into_sources(self) -> Vec<Source> {
        self.sources
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

/// A registry of available tools, built once at startup.
///
/// Exactly one handler per name; registering a name again replaces the
/// earlier handler but keeps its position in [`ToolRegistry::schemas`].
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    order: Vec<String>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Register a tool. Replaces any existing tool with the same name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        if self.tools.insert(name.clone(), tool).is_none() {
            self.order.push(name);
        } else {
            debug!(tool = %name, "Replaced registered tool");
        }
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    /// All registered schemas, in registration order.
    pub fn schemas(&self) -> Vec<ToolSchema> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|t| t.schema().clone())
            .collect()
    }

    /// All tool definitions (for sending to the LLM), in registration order.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.schemas().iter().map(ToolSchema::to_definition).collect()
    }

    /// Validate and execute a tool call.
    pub async fn execute(&self, call: &ToolCall) -> std::result::Result<ToolResult, ToolError> {
        let tool = self
            .tools
            .get(&call.name)
            .ok_or_else(|| ToolError::NotFound(call.name.clone()))?;

        tool.schema()
            .validate(&call.arguments)
            .map_err(|reason| ToolError::InvalidArguments {
                tool_name: call.name.clone(),
                reason,
            })?;

        let mut result = tool.execute(call.arguments.clone()).await?;
        result.call_id = call.id.clone();
        debug!(
            tool = %call.name,
            success = result.success,
            sources = result.sources.len(),
            "Tool executed"
        );
        Ok(result)
    }

    /// Execute a tool call and record its sources in `ledger` on success.
    pub async fn execute_recorded(
        &self,
        call: &ToolCall,
        ledger: &mut SourceLedger,
    ) -> std::result::Result<ToolResult, ToolError> {
        let result = self.execute(call).await?;
        if result.success {
            ledger.record(result.sources.iter().cloned());
        }
        Ok(result)
    }

    /// List all registered tool names, in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.order.iter().map(|s| s.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
