//! Course outline tool — title, link, instructor and lesson list of a course.

use async_trait::async_trait;
use lectern_core::course::Course;
use lectern_core::error::ToolError;
use lectern_core::tool::{ParamType, ParameterSpec, Tool, ToolResult, ToolSchema};
use lectern_index::VectorIndex;
use std::fmt::Write;
use std::sync::Arc;

pub const TOOL_NAME: &str = "get_course_outline";

pub struct CourseOutlineTool {
    index: Arc<VectorIndex>,
    schema: ToolSchema,
}

impl CourseOutlineTool {
    pub fn new(index: Arc<VectorIndex>) -> Self {
        Self {
            index,
            schema: ToolSchema {
                name: TOOL_NAME.into(),
                description: "Get a course's outline: title, link, instructor and the numbered list of lessons".into(),
                parameters: vec![ParameterSpec::required(
                    "course_title",
                    ParamType::String,
                    "Course title (partial matches work)",
                )],
            },
        }
    }
}

pub fn format_outline(course: &Course) -> String {
    let mut out = format!("Course: {}\n", course.title);
    if let Some(link) = &course.link {
        let _ = writeln!(out, "Course Link: {link}");
    }
    if let Some(instructor) = &course.instructor {
        let _ = writeln!(out, "Instructor: {instructor}");
    }

    if course.lessons.is_empty() {
        out.push_str("Lessons: none recorded");
        return out;
    }

    let _ = write!(out, "Lessons ({}):", course.lessons.len());
    for lesson in &course.lessons {
        let _ = write!(out, "\nLesson {}: {}", lesson.number, lesson.title);
        if let Some(link) = &lesson.link {
            let _ = write!(out, " ({link})");
        }
    }
    out
}

#[async_trait]
impl Tool for CourseOutlineTool {
    fn schema(&self) -> &ToolSchema {
        &self.schema
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let name = arguments["course_title"].as_str().ok_or_else(|| ToolError::InvalidArguments {
            tool_name: TOOL_NAME.into(),
            reason: "Missing 'course_title' argument".into(),
        })?;

        let course = match self.index.resolve_course_title(name).await? {
            Some(title) => self.index.course(&title).await,
            None => None,
        };

        Ok(match course {
            Some(course) => ToolResult::text(format_outline(&course)),
            None => ToolResult::text(format!("No course found matching '{name}'")),
        })
    }
}
