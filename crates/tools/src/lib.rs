//! Search tools the language model can call while answering a question.
//!
//! - `search_course_content`: semantic search over transcript chunks
//! - `get_course_outline`: a course's lesson list

pub mod course_outline;
pub mod course_search;

use lectern_core::tool::ToolRegistry;
use lectern_index::VectorIndex;
use std::sync::Arc;

pub use course_outline::CourseOutlineTool;
pub use course_search::CourseSearchTool;

/// Create the registry with both course tools bound to `index`.
pub fn default_registry(index: Arc<VectorIndex>, max_results: usize) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(CourseSearchTool::new(index.clone(), max_results)));
    registry.register(Arc::new(CourseOutlineTool::new(index)));
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use lectern_index::HashingEmbedder;

    #[test]
    fn default_registry_has_course_tools() {
        let index = Arc::new(VectorIndex::in_memory(Arc::new(HashingEmbedder::default())));
        let registry = default_registry(index, 5);
        assert_eq!(registry.names(), vec!["search_course_content", "get_course_outline"]);

        let definitions = registry.definitions();
        assert_eq!(definitions[0].parameters["required"], serde_json::json!(["query"]));
        assert_eq!(definitions[1].parameters["required"], serde_json::json!(["course_title"]));
    }
}
