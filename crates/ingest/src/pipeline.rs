//! Ingestion pipeline: file → parsed document → chunks → vector index.

use lectern_core::course::{Course, CourseChunk};
use lectern_core::error::{IngestionError, Result};
use lectern_index::VectorIndex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::chunker::Chunker;
use crate::document::{DocumentEncoding, parse_document};

/// File extensions picked up by folder ingestion.
pub const DOCUMENT_EXTENSIONS: &[&str] = &["txt", "md"];

/// Read, decode, parse and chunk one document.
pub fn ingest_file(
    path: &Path,
    encoding: DocumentEncoding,
    title_hint: Option<&str>,
    chunker: &Chunker,
) -> std::result::Result<(Course, Vec<CourseChunk>), IngestionError> {
    let bytes = std::fs::read(path).map_err(|e| IngestionError::Unreadable {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let text = encoding.decode(path, bytes)?;
    let document = parse_document(path, &text, title_hint)?;
    let chunks = chunker.chunk_document(&document);
    debug!(
        path = %path.display(),
        course = %document.course.title,
        lessons = document.course.lessons.len(),
        chunks = chunks.len(),
        "Document chunked"
    );
    Ok((document.course, chunks))
}

/// A document that could not be ingested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedDocument {
    pub path: PathBuf,
    pub reason: String,
}

/// Outcome of a folder ingestion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub courses_added: usize,
    pub chunks_added: usize,
    /// Titles already present in the index.
    pub skipped: Vec<String>,
    pub failed: Vec<FailedDocument>,
}

/// Feeds documents into a [`VectorIndex`].
pub struct Ingestor {
    index: Arc<VectorIndex>,
    chunker: Chunker,
    encoding: DocumentEncoding,
}

impl Ingestor {
    pub fn new(index: Arc<VectorIndex>, chunker: Chunker) -> Self {
        Self {
            index,
            chunker,
            encoding: DocumentEncoding::default(),
        }
    }

    pub fn with_encoding(mut self, encoding: DocumentEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Ingest one document, replacing any course with the same title.
    pub async fn ingest_document(&self, path: &Path, title_hint: Option<&str>) -> Result<(Course, usize)> {
        let (course, chunks) = ingest_file(path, self.encoding, title_hint, &self.chunker)?;
        self.index.replace_course(&course, &chunks).await?;
        Ok((course, chunks.len()))
    }

    /// Ingest every document in `dir`, in sorted path order.
    ///
    /// Courses already in the index are skipped unless `clear_existing`, which
    /// empties the index first. A document that fails to parse is recorded in
    /// the report and the batch continues; an index failure (for example the
    /// embedding service being down) aborts the batch.
    pub async fn ingest_folder(&self, dir: &Path, clear_existing: bool) -> Result<IngestReport> {
        let mut report = IngestReport::default();

        if !dir.is_dir() {
            warn!(path = %dir.display(), "Course folder does not exist");
            return Ok(report);
        }

        if clear_existing {
            info!("Clearing existing course data");
            self.index.clear().await?;
        }

        for path in document_paths(dir)? {
            let (course, chunks) = match ingest_file(&path, self.encoding, None, &self.chunker) {
                Ok(parsed) => parsed,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping document");
                    report.failed.push(FailedDocument {
                        path,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            if self.index.contains_course(&course.title).await {
                debug!(course = %course.title, "Course already indexed, skipping");
                report.skipped.push(course.title);
                continue;
            }

            self.index.replace_course(&course, &chunks).await?;
            info!(course = %course.title, chunks = chunks.len(), "Added course");
            report.courses_added += 1;
            report.chunks_added += chunks.len();
        }

        info!(
            courses = report.courses_added,
            chunks = report.chunks_added,
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            "Folder ingestion complete"
        );
        Ok(report)
    }
}

fn document_paths(dir: &Path) -> std::result::Result<Vec<PathBuf>, IngestionError> {
    let entries = std::fs::read_dir(dir).map_err(|e| IngestionError::Unreadable {
        path: dir.to_path_buf(),
        reason: e.to_string(),
    })?;

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file())
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| DOCUMENT_EXTENSIONS.iter().any(|x| e.eq_ignore_ascii_case(x)))
        })
        .collect();
    paths.sort();
    Ok(paths)
}
