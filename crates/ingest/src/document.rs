//! Course transcript parsing.
//!
//! A transcript looks like:
//!
//! ```text
//! Course Title: Intro to Testing
//! Course Link: https://example.com/testing
//! Course Instructor: Ada Lovelace
//!
//! Lesson 0: Welcome
//! Lesson Link: https://example.com/testing/0
//! transcript text ...
//! ```
//!
//! Header lines are optional and may come in any order before the first
//! lesson marker. Text before the first marker becomes a preamble section
//! with no lesson number.

use lectern_core::course::{Course, Lesson};
use lectern_core::error::IngestionError;
use std::path::Path;

/// How to decode a document's bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DocumentEncoding {
    /// Strict UTF-8 (a leading byte-order mark is dropped).
    #[default]
    Utf8,
    /// ISO-8859-1; every byte maps to one character, so decoding never fails.
    Latin1,
}

impl DocumentEncoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Utf8 => "UTF-8",
            Self::Latin1 => "Latin-1",
        }
    }

    pub fn decode(&self, path: &Path, bytes: Vec<u8>) -> Result<String, IngestionError> {
        match self {
            Self::Utf8 => {
                let text = String::from_utf8(bytes).map_err(|_| IngestionError::Encoding {
                    path: path.to_path_buf(),
                    encoding: self.as_str().into(),
                })?;
                Ok(match text.strip_prefix('\u{feff}') {
                    Some(stripped) => stripped.to_string(),
                    None => text,
                })
            }
            Self::Latin1 => Ok(bytes.into_iter().map(char::from).collect()),
        }
    }
}

impl std::str::FromStr for DocumentEncoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "utf8" => Ok(Self::Utf8),
            "latin1" | "iso88591" => Ok(Self::Latin1),
            other => Err(format!("unsupported encoding '{other}' (expected utf-8 or latin-1)")),
        }
    }
}

/// A run of transcript text under one lesson marker (or before the first).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub lesson_number: Option<u32>,
    pub text: String,
}

/// A transcript split into course metadata and text sections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDocument {
    pub course: Course,
    /// Non-empty sections in document order.
    pub sections: Vec<Section>,
}

/// Parse transcript text.
///
/// The course title comes from a `Course Title:` header, then `title_hint`,
/// then the file stem of `path`.
pub fn parse_document(
    path: &Path,
    text: &str,
    title_hint: Option<&str>,
) -> Result<ParsedDocument, IngestionError> {
    if text.trim().is_empty() {
        return Err(IngestionError::Empty {
            path: path.to_path_buf(),
        });
    }

    let mut header_title = None;
    let mut instructor = None;
    let mut course_link = None;
    let mut lessons: Vec<Lesson> = Vec::new();
    let mut sections: Vec<Section> = Vec::new();

    let mut current = Section {
        lesson_number: None,
        text: String::new(),
    };
    let mut seen_marker = false;
    let mut expect_lesson_link = false;

    for line in text.lines() {
        if let Some((number, title)) = parse_lesson_marker(line) {
            push_section(&mut sections, current);
            current = Section {
                lesson_number: Some(number),
                text: String::new(),
            };
            lessons.push(Lesson {
                number,
                title,
                link: None,
            });
            seen_marker = true;
            expect_lesson_link = true;
            continue;
        }

        if expect_lesson_link {
            expect_lesson_link = false;
            if let Some(link) = header_value(line, "Lesson Link:") {
                if let Some(lesson) = lessons.last_mut() {
                    lesson.link = non_empty(link);
                }
                continue;
            }
        }

        if !seen_marker {
            if let Some(v) = header_value(line, "Course Title:") {
                header_title = non_empty(v);
                continue;
            }
            if let Some(v) = header_value(line, "Course Link:") {
                course_link = non_empty(v);
                continue;
            }
            if let Some(v) = header_value(line, "Course Instructor:") {
                instructor = non_empty(v);
                continue;
            }
        }

        current.text.push_str(line);
        current.text.push('\n');
    }
    push_section(&mut sections, current);

    let title = header_title
        .or_else(|| title_hint.and_then(non_empty))
        .or_else(|| {
            path.file_stem()
                .and_then(|s| s.to_str())
                .and_then(non_empty)
        })
        .ok_or_else(|| IngestionError::MissingTitle {
            path: path.to_path_buf(),
        })?;

    if sections.is_empty() && lessons.is_empty() {
        return Err(IngestionError::Empty {
            path: path.to_path_buf(),
        });
    }

    let mut course = Course::new(title);
    course.instructor = instructor;
    course.link = course_link;
    for lesson in lessons {
        course.add_lesson(lesson);
    }

    Ok(ParsedDocument { course, sections })
}

fn push_section(sections: &mut Vec<Section>, mut section: Section) {
    let trimmed = section.text.trim();
    if trimmed.is_empty() {
        return;
    }
    section.text = trimmed.to_string();
    sections.push(section);
}

/// `Lesson 3: Title` → `(3, "Title")`. Case-insensitive on the keyword.
fn parse_lesson_marker(line: &str) -> Option<(u32, String)> {
    let line = line.trim();
    let rest = strip_prefix_ignore_case(line, "lesson")?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let rest = rest.trim_start();
    let digits_end = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
    if digits_end == 0 {
        return None;
    }
    let number: u32 = rest[..digits_end].parse().ok()?;
    let title = rest[digits_end..].trim_start().strip_prefix(':')?;
    Some((number, title.trim().to_string()))
}

fn header_value<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    strip_prefix_ignore_case(line.trim(), key).map(str::trim)
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix).then(|| &s[prefix.len()..])
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRANSCRIPT: &str = "Course Title: Intro to Testing
Course Link: https://example.com/testing
Course Instructor: Ada Lovelace

A short welcome before the lessons.

Lesson 1: Assertions
Lesson Link: https://example.com/testing/1
Assertions compare actual and expected values.

Lesson 2: Mocking
Mocks stand in for real collaborators.
";

    #[test]
    fn parses_headers_lessons_and_sections() {
        let doc = parse_document(Path::new("testing.txt"), TRANSCRIPT, None).unwrap();
        assert_eq!(doc.course.title, "Intro to Testing");
        assert_eq!(doc.course.instructor.as_deref(), Some("Ada Lovelace"));
        assert_eq!(doc.course.link.as_deref(), Some("https://example.com/testing"));
        assert_eq!(doc.course.lessons.len(), 2);
        assert_eq!(doc.course.lessons[0].title, "Assertions");
        assert_eq!(doc.course.lessons[0].link.as_deref(), Some("https://example.com/testing/1"));
        assert_eq!(doc.course.lessons[1].link, None);

        assert_eq!(doc.sections.len(), 3);
        assert_eq!(doc.sections[0].lesson_number, None);
        assert_eq!(doc.sections[0].text, "A short welcome before the lessons.");
        assert_eq!(doc.sections[1].lesson_number, Some(1));
        assert_eq!(doc.sections[1].text, "Assertions compare actual and expected values.");
        assert_eq!(doc.sections[2].text, "Mocks stand in for real collaborators.");
    }

    #[test]
    fn title_falls_back_to_hint_then_file_stem() {
        let body = "Lesson 1: Only lesson\nSome text.";
        let hinted = parse_document(Path::new("x/notes.txt"), body, Some("Hinted Title")).unwrap();
        assert_eq!(hinted.course.title, "Hinted Title");

        let stem = parse_document(Path::new("x/rust_basics.txt"), body, None).unwrap();
        assert_eq!(stem.course.title, "rust_basics");
    }

    #[test]
    fn header_title_beats_hint() {
        let doc = parse_document(Path::new("a.txt"), TRANSCRIPT, Some("Other")).unwrap();
        assert_eq!(doc.course.title, "Intro to Testing");
    }

    #[test]
    fn lesson_without_text_is_kept_in_outline() {
        let body = "Course Title: T\nLesson 1: One\nText one.\nLesson 2: Two\n";
        let doc = parse_document(Path::new("t.txt"), body, None).unwrap();
        assert_eq!(doc.course.lessons.len(), 2);
        assert_eq!(doc.sections.len(), 1);
    }

    #[test]
    fn lesson_marker_parsing() {
        assert_eq!(parse_lesson_marker("Lesson 3: Closures"), Some((3, "Closures".into())));
        assert_eq!(parse_lesson_marker("  lesson 10 : Traits "), Some((10, "Traits".into())));
        assert_eq!(parse_lesson_marker("Lesson 4:"), Some((4, String::new())));
        assert_eq!(parse_lesson_marker("Lessons learned: many"), None);
        assert_eq!(parse_lesson_marker("Lesson one: Intro"), None);
        assert_eq!(parse_lesson_marker("Lesson 2 is about closures"), None);
    }

    #[test]
    fn empty_document_is_rejected() {
        let err = parse_document(Path::new("e.txt"), "  \n\n ", None).unwrap_err();
        assert!(matches!(err, IngestionError::Empty { .. }));

        let err = parse_document(Path::new("h.txt"), "Course Title: Headers only\n", None).unwrap_err();
        assert!(matches!(err, IngestionError::Empty { .. }));
    }

    #[test]
    fn encodings() {
        let path = Path::new("doc.txt");
        let invalid = vec![0x43, 0x61, 0x66, 0xe9];
        assert!(matches!(
            DocumentEncoding::Utf8.decode(path, invalid.clone()),
            Err(IngestionError::Encoding { .. })
        ));
        assert_eq!(DocumentEncoding::Latin1.decode(path, invalid).unwrap(), "Café");

        let bom = b"\xef\xbb\xbfCourse Title: X".to_vec();
        assert_eq!(DocumentEncoding::Utf8.decode(path, bom).unwrap(), "Course Title: X");

        assert_eq!("utf-8".parse::<DocumentEncoding>().unwrap(), DocumentEncoding::Utf8);
        assert_eq!("ISO-8859-1".parse::<DocumentEncoding>().unwrap(), DocumentEncoding::Latin1);
        assert!("utf-16".parse::<DocumentEncoding>().is_err());
    }
}
