//! Course content search tool.
//!
//! Lets the model search transcript chunks, optionally narrowed to one course
//! (named loosely, resolved against the course catalog) and one lesson.

use async_trait::async_trait;
use lectern_core::error::ToolError;
use lectern_core::tool::{ParamType, ParameterSpec, Tool, ToolResult, ToolSchema};
use lectern_index::{SearchFilter, SearchResults, VectorIndex};
use std::sync::Arc;
use tracing::debug;

pub const TOOL_NAME: &str = "search_course_content";

/// Semantic search over indexed course chunks.
pub struct CourseSearchTool {
    index: Arc<VectorIndex>,
    max_results: usize,
    schema: ToolSchema,
}

impl CourseSearchTool {
    pub fn new(index: Arc<VectorIndex>, max_results: usize) -> Self {
        Self {
            index,
            max_results,
            schema: ToolSchema {
                name: TOOL_NAME.into(),
                description: "Search course materials with smart course name matching and lesson filtering".into(),
                parameters: vec![
                    ParameterSpec::required("query", ParamType::String, "What to search for in the course content"),
                    ParameterSpec::optional(
                        "course_name",
                        ParamType::String,
                        "Course title (partial matches work, e.g. 'MCP', 'Introduction')",
                    ),
                    ParameterSpec::optional(
                        "lesson_number",
                        ParamType::Integer,
                        "Specific lesson number to search within (e.g. 1, 2, 3)",
                    ),
                ],
            },
        }
    }
}

/// Render hits as `[Course - Lesson N]` blocks separated by blank lines.
pub fn format_results(results: &SearchResults) -> String {
    results
        .hits()
        .iter()
        .map(|hit| format!("[{}]\n{}", hit.chunk.label(), hit.chunk.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn describe_filter(course: Option<&str>, lesson: Option<u32>) -> String {
    let mut out = String::new();
    if let Some(course) = course {
        out.push_str(&format!(" in course '{course}'"));
    }
    if let Some(lesson) = lesson {
        out.push_str(&format!(" in lesson {lesson}"));
    }
    out
}

#[async_trait]
impl Tool for CourseSearchTool {
    fn schema(&self) -> &ToolSchema {
        &self.schema
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let query = arguments["query"].as_str().ok_or_else(|| ToolError::InvalidArguments {
            tool_name: TOOL_NAME.into(),
            reason: "Missing 'query' argument".into(),
        })?;
        let course_name = arguments.get("course_name").and_then(|v| v.as_str());
        let lesson_number = match arguments.get("lesson_number") {
            None | Some(serde_json::Value::Null) => None,
            Some(value) => Some(
                value
                    .as_u64()
                    .and_then(|n| u32::try_from(n).ok())
                    .ok_or_else(|| ToolError::InvalidArguments {
                        tool_name: TOOL_NAME.into(),
                        reason: format!("lesson_number must be a non-negative integer below 2^32, got {value}"),
                    })?,
            ),
        };

        let mut filter = SearchFilter::default();
        if let Some(name) = course_name {
            match self.index.resolve_course_title(name).await? {
                Some(title) => filter.course_title = Some(title),
                None => return Ok(ToolResult::text(format!("No course found matching '{name}'"))),
            }
        }
        filter.lesson_number = lesson_number;

        let results = self.index.search(query, &filter, self.max_results).await?;
        debug!(query, course = ?filter.course_title, lesson = ?lesson_number, hits = results.len(), "Course search");

        if results.is_empty() {
            return Ok(ToolResult::text(format!(
                "No relevant content found{}.",
                describe_filter(filter.course_title.as_deref(), lesson_number)
            )));
        }

        Ok(ToolResult::text(format_results(&results)).with_sources(results.sources()))
    }
}
