//! Overlapping fixed-size text chunker.
//!
//! Sizes are counted in characters, not bytes, so multi-byte text is never
//! split inside a code point.
//!
//! # Algorithm
//!
//! 1. If what remains of the text fits in `chunk_size`, emit it and stop.
//! 2. Otherwise look for a break in the last `boundary_window` characters
//!    before the limit: the end of a sentence (`.`, `!` or `?` followed by
//!    whitespace) or a newline. The latest such break wins.
//! 3. With no usable break, cut hard at `chunk_size`.
//! 4. The next chunk starts `chunk_overlap` characters before the cut, so
//!    adjacent chunks share exactly `chunk_overlap` characters.
//!
//! A break is only usable if the next chunk would still start after the
//! current one, which keeps the loop moving for any configuration.

use lectern_core::course::CourseChunk;

use crate::document::ParsedDocument;

pub const DEFAULT_CHUNK_SIZE: usize = 800;
pub const DEFAULT_CHUNK_OVERLAP: usize = 100;
pub const DEFAULT_BOUNDARY_WINDOW: usize = 160;

/// Splits text into overlapping chunks of at most `chunk_size` characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunker {
    chunk_size: usize,
    chunk_overlap: usize,
    boundary_window: usize,
}

impl Chunker {
    /// `chunk_size` is at least 1 and `chunk_overlap` is kept below it.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            chunk_overlap: chunk_overlap.min(chunk_size - 1),
            boundary_window: DEFAULT_BOUNDARY_WINDOW,
        }
    }

    /// How far back from the limit to look for a sentence or line break.
    /// Zero disables boundary search.
    pub fn with_boundary_window(mut self, boundary_window: usize) -> Self {
        self.boundary_window = boundary_window;
        self
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Split `text` into chunk strings.
    pub fn split(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        let mut chunks = Vec::new();
        if chars.is_empty() {
            return chunks;
        }

        let mut start = 0;
        loop {
            if chars.len() - start <= self.chunk_size {
                chunks.push(chars[start..].iter().collect());
                break;
            }

            let limit = start + self.chunk_size;
            let end = self.find_break(&chars, start, limit).unwrap_or(limit);
            chunks.push(chars[start..end].iter().collect());
            start = end - self.chunk_overlap;
        }

        chunks
    }

    /// Latest break position in `(limit - window, limit]`, if any.
    ///
    /// A break at `p` means the chunk is `chars[start..p]`.
    fn find_break(&self, chars: &[char], start: usize, limit: usize) -> Option<usize> {
        let floor = limit
            .saturating_sub(self.boundary_window)
            .max(start + self.chunk_overlap + 1);

        (floor..=limit).rev().find(|&p| {
            let prev = chars[p - 1];
            prev == '\n'
                || (matches!(prev, '.' | '!' | '?')
                    && chars.get(p).is_some_and(|c| c.is_whitespace()))
        })
    }

    /// Chunk every section of a parsed document.
    ///
    /// Sections are chunked independently, so no chunk spans two lessons.
    /// Chunk indices run across the whole document.
    pub fn chunk_document(&self, document: &ParsedDocument) -> Vec<CourseChunk> {
        let mut chunks = Vec::new();
        for section in &document.sections {
            for content in self.split(&section.text) {
                chunks.push(CourseChunk {
                    content,
                    course_title: document.course.title.clone(),
                    lesson_number: section.lesson_number,
                    chunk_index: chunks.len(),
                });
            }
        }
        chunks
    }
}

impl Default for Chunker {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE, DEFAULT_CHUNK_OVERLAP)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Section;
    use lectern_core::course::{Course, Lesson};

    fn char_len(s: &str) -> usize {
        s.chars().count()
    }

    fn overlap_of(a: &str, b: &str, n: usize) -> bool {
        let tail: String = a.chars().skip(char_len(a) - n).collect();
        let head: String = b.chars().take(n).collect();
        tail == head
    }

    /// 1700 characters with no sentence or line breaks.
    fn unbroken_text() -> String {
        "abcdefghij".repeat(170)
    }

    /// About 1700 characters of short sentences.
    fn sentence_text() -> String {
        let mut text = String::new();
        let mut n = 0;
        while char_len(&text) < 1700 {
            text.push_str(&format!("Sentence {n} explains one idea about tests. "));
            n += 1;
        }
        text.chars().take(1700).collect()
    }

    #[test]
    fn short_text_is_one_chunk() {
        let chunks = Chunker::default().split("Hello, world!");
        assert_eq!(chunks, vec!["Hello, world!".to_string()]);
        assert!(Chunker::default().split("").is_empty());
    }

    #[test]
    fn hard_cuts_overlap_exactly() {
        let chunker = Chunker::new(800, 100);
        let chunks = chunker.split(&unbroken_text());
        assert_eq!(chunks.len(), 3);
        assert_eq!(char_len(&chunks[0]), 800);
        assert_eq!(char_len(&chunks[1]), 800);
        assert_eq!(char_len(&chunks[2]), 300);
        assert!(overlap_of(&chunks[0], &chunks[1], 100));
        assert!(overlap_of(&chunks[1], &chunks[2], 100));
    }

    #[test]
    fn prefers_sentence_boundaries() {
        let chunker = Chunker::new(800, 100);
        let chunks = chunker.split(&sentence_text());
        assert_eq!(chunks.len(), 3);
        for chunk in &chunks[..chunks.len() - 1] {
            assert!(chunk.ends_with('.'), "chunk should end at a sentence: {chunk:?}");
        }
        for pair in chunks.windows(2) {
            assert!(overlap_of(&pair[0], &pair[1], 100));
        }
    }

    #[test]
    fn no_chunk_exceeds_size() {
        let text = sentence_text() + &unbroken_text() + "\nTrailing line.\n";
        for (size, overlap) in [(800, 100), (120, 30), (50, 0), (10, 9)] {
            let chunker = Chunker::new(size, overlap).with_boundary_window(40);
            for chunk in chunker.split(&text) {
                assert!(char_len(&chunk) <= size);
            }
        }
    }

    #[test]
    fn chunking_is_idempotent() {
        let chunker = Chunker::new(300, 50);
        let text = sentence_text();
        assert_eq!(chunker.split(&text), chunker.split(&text));
    }

    #[test]
    fn multibyte_text_counts_characters() {
        let text = "é".repeat(25);
        let chunks = Chunker::new(10, 2).with_boundary_window(0).split(&text);
        assert!(chunks.iter().all(|c| char_len(c) <= 10));
        assert_eq!(char_len(&chunks[0]), 10);
        assert!(overlap_of(&chunks[0], &chunks[1], 2));
    }

    #[test]
    fn invalid_overlap_is_clamped() {
        let chunker = Chunker::new(10, 50);
        assert_eq!(chunker.chunk_overlap(), 9);
        let chunks = chunker.split(&"x".repeat(30));
        assert_eq!(chunks.len(), 21);
    }

    #[test]
    fn document_chunks_carry_lesson_and_global_index() {
        let mut course = Course::new("Intro to Testing");
        course.add_lesson(Lesson { number: 1, title: "Assertions".into(), link: None });
        course.add_lesson(Lesson { number: 2, title: "Mocking".into(), link: None });
        let document = ParsedDocument {
            course,
            sections: vec![
                Section { lesson_number: None, text: "Welcome.".into() },
                Section { lesson_number: Some(1), text: unbroken_text() },
            ],
        };

        let chunks = Chunker::new(800, 100).chunk_document(&document);
        assert_eq!(chunks.len(), 4);
        assert_eq!(chunks[0].lesson_number, None);
        assert!(chunks[1..].iter().all(|c| c.lesson_number == Some(1)));
        let indices: Vec<usize> = chunks.iter().map(|c| c.chunk_index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3]);
        assert!(chunks.iter().all(|c| c.course_title == "Intro to Testing"));
    }
}
