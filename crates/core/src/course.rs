//! Course domain model.
//!
//! A [`Course`] is created once per ingested document and never mutated
//! afterwards; re-ingesting the same title replaces it wholesale. The
//! retrieval unit is the [`CourseChunk`], which refers back to its course by
//! title rather than owning anything.

use serde::{Deserialize, Serialize};

/// A single lesson inside a course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lesson {
    /// Lesson number as written in the transcript (`Lesson 3: ...`).
    pub number: u32,

    /// Lesson title
    pub title: String,

    /// Optional link to the lesson video/page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

/// A course. Identity is the title, which is unique across the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructor: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,

    /// Lessons, ordered by ascending lesson number.
    #[serde(default)]
    pub lessons: Vec<Lesson>,
}

impl Course {
    /// Create a course with no lessons.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            instructor: None,
            link: None,
            lessons: Vec::new(),
        }
    }

    /// Insert a lesson keeping the list ordered by lesson number.
    ///
    /// A lesson with an existing number replaces the earlier one.
    pub fn add_lesson(&mut self, lesson: Lesson) {
        match self.lessons.binary_search_by_key(&lesson.number, |l| l.number) {
            Ok(pos) => self.lessons[pos] = lesson,
            Err(pos) => self.lessons.insert(pos, lesson),
        }
    }

    /// Look up a lesson by number.
    pub fn lesson(&self, number: u32) -> Option<&Lesson> {
        self.lessons
            .binary_search_by_key(&number, |l| l.number)
            .ok()
            .map(|pos| &self.lessons[pos])
    }
}

/// A bounded span of course text stored as one retrieval unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseChunk {
    /// The chunk text (at most `chunk_size` characters).
    pub content: String,

    /// Title of the course this chunk came from.
    pub course_title: String,

    /// Lesson the chunk belongs to; `None` for text before the first lesson.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lesson_number: Option<u32>,

    /// Position of the chunk within its source document.
    pub chunk_index: usize,
}

impl CourseChunk {
    /// Human-readable label, e.g. `Intro to Testing - Lesson 2`.
    pub fn label(&self) -> String {
        match self.lesson_number {
            Some(n) => format!("{} - Lesson {}", self.course_title, n),
            None => self.course_title.clone(),
        }
    }
}

/// A chunk cited in support of an answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub course_title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lesson_number: Option<u32>,

    pub chunk_index: usize,

    /// Link to the lesson (or course, if the lesson has none).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,

    /// Leading part of the chunk text, for citation display.
    pub excerpt: String,
}

/// Characters of chunk text kept in a [`Source`] excerpt.
pub const EXCERPT_CHARS: usize = 200;

impl Source {
    /// Build a source record for a retrieved chunk.
    pub fn from_chunk(chunk: &CourseChunk, link: Option<String>) -> Self {
        Self {
            course_title: chunk.course_title.clone(),
            lesson_number: chunk.lesson_number,
            chunk_index: chunk.chunk_index,
            link,
            excerpt: excerpt(&chunk.content, EXCERPT_CHARS),
        }
    }

    /// Same label format as [`CourseChunk::label`].
    pub fn label(&self) -> String {
        match self.lesson_number {
            Some(n) => format!("{} - Lesson {}", self.course_title, n),
            None => self.course_title.clone(),
        }
    }

    /// Two sources cite the same chunk when course and chunk index match.
    pub fn same_chunk(&self, other: &Source) -> bool {
        self.course_title == other.course_title && self.chunk_index == other.chunk_index
    }
}

fn excerpt(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_pos, _)) => format!("{}…", &text[..byte_pos]),
        None => text.to_string(),
    }
}
