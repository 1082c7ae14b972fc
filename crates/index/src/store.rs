//! The vector index — two collections persisted as JSON lines.
//!
//! - `course_metadata.jsonl`: one record per course, embedded by title,
//!   used to resolve loosely-typed course names.
//! - `course_content.jsonl`: one record per chunk, embedded by chunk text.
//!
//! - `index.json`: the embedding model and dimension the stored vectors
//!   were produced with.
//!
//! Both collections live in memory behind a single `RwLock`, so searches run
//! concurrently and always observe either the state before or after a write.
//! Writers are serialised through a separate gate; embedding happens before
//! the state lock is taken and the disk flush after it is released.
//!
//! A flush writes every file to a temp path first and renames them only once
//! all were written. A crash between two renames can still leave one file a
//! write ahead of the other, but each file on disk is always complete.

use lectern_core::course::{Course, CourseChunk, Source};
use lectern_core::error::IndexError;
use lectern_core::Embedder;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::vector::rank_by_distance;

/// Collection name for course-level records.
pub const METADATA_COLLECTION: &str = "course_metadata";
/// Collection name for chunk-level records.
pub const CONTENT_COLLECTION: &str = "course_content";

/// File recording which embedder produced the stored vectors.
pub const MANIFEST_FILE: &str = "index.json";

/// Largest cosine distance at which a fuzzy course name still resolves.
pub const DEFAULT_COURSE_MATCH_DISTANCE: f32 = 0.8;

/// Most chunk texts sent to the embedder in one call.
pub const DEFAULT_EMBED_BATCH_SIZE: usize = 256;

/// Identity of the embedder behind a set of vectors.
///
/// Vectors from different models (or the same model at a different
/// dimension) cannot be compared, so the index refuses to mix them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddingSignature {
    pub model_id: String,
    pub dimensions: usize,
}

impl EmbeddingSignature {
    /// Signature shared by `vectors`, or `None` when there are none.
    fn of<'a>(model_id: &str, vectors: impl IntoIterator<Item = &'a [f32]>) -> Result<Option<Self>, IndexError> {
        let mut signature: Option<Self> = None;
        for vector in vectors {
            let current = Self {
                model_id: model_id.to_string(),
                dimensions: vector.len(),
            };
            match &signature {
                Some(first) if *first != current => {
                    return Err(IndexError::EmbeddingMismatch {
                        stored: first.to_string(),
                        current: current.to_string(),
                    });
                }
                Some(_) => {}
                None => signature = Some(current),
            }
        }
        Ok(signature)
    }
}

impl fmt::Display for EmbeddingSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} dimensions)", self.model_id, self.dimensions)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CourseRecord {
    course: Course,
    embedding: Vec<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChunkRecord {
    chunk: CourseChunk,
    embedding: Vec<f32>,
}

#[derive(Debug, Default)]
struct IndexState {
    catalog: Vec<CourseRecord>,
    content: Vec<ChunkRecord>,
    signature: Option<EmbeddingSignature>,
}

impl IndexState {
    fn is_empty(&self) -> bool {
        self.catalog.is_empty() && self.content.is_empty()
    }

    /// Fails when stored vectors came from an embedder other than `current`.
    fn check_signature(&self, current: &EmbeddingSignature) -> Result<(), IndexError> {
        match &self.signature {
            Some(stored) if stored != current && !self.is_empty() => Err(IndexError::EmbeddingMismatch {
                stored: stored.to_string(),
                current: current.to_string(),
            }),
            _ => Ok(()),
        }
    }

    /// Accept vectors signed `incoming` for storage. Must run before any
    /// record is changed so a rejected write leaves the state untouched.
    fn admit(&mut self, incoming: Option<EmbeddingSignature>) -> Result<(), IndexError> {
        let Some(incoming) = incoming else {
            return Ok(());
        };
        self.check_signature(&incoming)?;
        self.signature = Some(incoming);
        Ok(())
    }

    fn course(&self, title: &str) -> Option<&Course> {
        self.catalog.iter().map(|r| &r.course).find(|c| c.title == title)
    }

    /// Lesson link if the lesson has one, otherwise the course link.
    fn link_for(&self, title: &str, lesson_number: Option<u32>) -> Option<String> {
        let course = self.course(title)?;
        lesson_number
            .and_then(|n| course.lesson(n))
            .and_then(|l| l.link.clone())
            .or_else(|| course.link.clone())
    }

    fn remove_course(&mut self, title: &str) {
        self.catalog.retain(|r| r.course.title != title);
        self.content.retain(|r| r.chunk.course_title != title);
    }

    fn upsert_chunk(&mut self, record: ChunkRecord) {
        match self.content.iter_mut().find(|r| {
            r.chunk.course_title == record.chunk.course_title
                && r.chunk.chunk_index == record.chunk.chunk_index
        }) {
            Some(existing) => *existing = record,
            None => self.content.push(record),
        }
    }
}

/// Optional narrowing applied to a chunk search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchFilter {
    /// Exact (already resolved) course title.
    pub course_title: Option<String>,
    pub lesson_number: Option<u32>,
}

impl SearchFilter {
    pub fn course(title: impl Into<String>) -> Self {
        Self {
            course_title: Some(title.into()),
            lesson_number: None,
        }
    }

    pub fn with_lesson(mut self, lesson_number: u32) -> Self {
        self.lesson_number = Some(lesson_number);
        self
    }

    fn matches(&self, chunk: &CourseChunk) -> bool {
        self.course_title
            .as_deref()
            .is_none_or(|t| chunk.course_title == t)
            && self
                .lesson_number
                .is_none_or(|n| chunk.lesson_number == Some(n))
    }
}

/// One ranked chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub chunk: CourseChunk,
    /// Cosine distance to the query; smaller is closer.
    pub distance: f32,
    /// Lesson link, falling back to the course link.
    pub link: Option<String>,
}

impl SearchHit {
    pub fn to_source(&self) -> Source {
        Source::from_chunk(&self.chunk, self.link.clone())
    }
}

/// Hits ordered by non-decreasing distance. Empty is a valid outcome.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResults {
    hits: Vec<SearchHit>,
}

impl SearchResults {
    pub fn hits(&self) -> &[SearchHit] {
        &self.hits
    }

    pub fn into_hits(self) -> Vec<SearchHit> {
        self.hits
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn sources(&self) -> Vec<Source> {
        self.hits.iter().map(SearchHit::to_source).collect()
    }
}

/// Nearest-neighbour index over course metadata and course content.
pub struct VectorIndex {
    dir: Option<PathBuf>,
    embedder: Arc<dyn Embedder>,
    state: RwLock<IndexState>,
    write_gate: Mutex<()>,
    course_match_max_distance: f32,
    embed_batch_size: usize,
}

impl VectorIndex {
    /// Open (or create on first write) an index stored under `dir`.
    pub fn open(dir: impl Into<PathBuf>, embedder: Arc<dyn Embedder>) -> Result<Self, IndexError> {
        let dir = dir.into();
        let catalog: Vec<CourseRecord> = load_collection(&dir, METADATA_COLLECTION)?;
        let content: Vec<ChunkRecord> = load_collection(&dir, CONTENT_COLLECTION)?;
        let signature = stored_signature(&dir, &catalog, &content, embedder.model_id())?;

        if let Some(stored) = &signature {
            if stored.model_id != embedder.model_id() && !(catalog.is_empty() && content.is_empty()) {
                warn!(
                    stored = %stored,
                    current = embedder.model_id(),
                    "Index was built with a different embedding model; searches will fail until it is re-ingested"
                );
            }
        }
        info!(
            path = %dir.display(),
            courses = catalog.len(),
            chunks = content.len(),
            model = embedder.model_id(),
            "Vector index opened"
        );

        Ok(Self {
            dir: Some(dir),
            embedder,
            state: RwLock::new(IndexState {
                catalog,
                content,
                signature,
            }),
            write_gate: Mutex::new(()),
            course_match_max_distance: DEFAULT_COURSE_MATCH_DISTANCE,
            embed_batch_size: DEFAULT_EMBED_BATCH_SIZE,
        })
    }

    /// An index that is never written to disk.
    pub fn in_memory(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            dir: None,
            embedder,
            state: RwLock::new(IndexState::default()),
            write_gate: Mutex::new(()),
            course_match_max_distance: DEFAULT_COURSE_MATCH_DISTANCE,
            embed_batch_size: DEFAULT_EMBED_BATCH_SIZE,
        }
    }

    /// Set the largest distance accepted by [`resolve_course_title`](Self::resolve_course_title).
    pub fn with_course_match_distance(mut self, max_distance: f32) -> Self {
        self.course_match_max_distance = max_distance;
        self
    }

    /// Cap the number of chunk texts per embedding call.
    pub fn with_embed_batch_size(mut self, batch_size: usize) -> Self {
        self.embed_batch_size = batch_size.max(1);
        self
    }

    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }

    pub fn path(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    // --- Write paths ---

    /// Store a course's metadata, replacing any earlier course with the same
    /// title together with all of that course's chunks.
    pub async fn upsert_course_metadata(&self, course: &Course) -> Result<(), IndexError> {
        let _writer = self.write_gate.lock().await;
        let embedding = self.embedder.embed_one(&course.title).await?;
        let signature = EmbeddingSignature::of(self.embedder.model_id(), [embedding.as_slice()])?;

        {
            let mut state = self.state.write().await;
            state.admit(signature)?;
            state.remove_course(&course.title);
            state.catalog.push(CourseRecord {
                course: course.clone(),
                embedding,
            });
        }

        debug!(course = %course.title, lessons = course.lessons.len(), "Course metadata upserted");
        self.flush().await
    }

    /// Embed and store chunks. A chunk with the same course title and chunk
    /// index as a stored one replaces it.
    pub async fn upsert_chunks(&self, chunks: &[CourseChunk]) -> Result<(), IndexError> {
        if chunks.is_empty() {
            return Ok(());
        }

        let _writer = self.write_gate.lock().await;
        let records = self.embed_chunks(chunks).await?;
        let signature = EmbeddingSignature::of(
            self.embedder.model_id(),
            records.iter().map(|r| r.embedding.as_slice()),
        )?;

        {
            let mut state = self.state.write().await;
            state.admit(signature)?;
            for record in records {
                state.upsert_chunk(record);
            }
        }

        debug!(chunks = chunks.len(), "Chunks upserted");
        self.flush().await
    }

    /// Replace a course and its full chunk set in one step.
    ///
    /// Everything is embedded first; if the embedding service fails nothing
    /// changes. Readers see either the old course or the new one.
    pub async fn replace_course(&self, course: &Course, chunks: &[CourseChunk]) -> Result<(), IndexError> {
        let _writer = self.write_gate.lock().await;
        let embedding = self.embedder.embed_one(&course.title).await?;
        let records = self.embed_chunks(chunks).await?;
        let signature = EmbeddingSignature::of(
            self.embedder.model_id(),
            std::iter::once(embedding.as_slice()).chain(records.iter().map(|r| r.embedding.as_slice())),
        )?;

        {
            let mut state = self.state.write().await;
            state.admit(signature)?;
            state.remove_course(&course.title);
            state.catalog.push(CourseRecord {
                course: course.clone(),
                embedding,
            });
            state.content.extend(records);
        }

        info!(course = %course.title, chunks = chunks.len(), "Course indexed");
        self.flush().await
    }

    /// Remove every course and chunk.
    pub async fn clear(&self) -> Result<(), IndexError> {
        let _writer = self.write_gate.lock().await;
        {
            let mut state = self.state.write().await;
            state.catalog.clear();
            state.content.clear();
            state.signature = None;
        }
        info!("Vector index cleared");
        self.flush().await
    }

    /// Embed chunk texts in batches of at most `embed_batch_size`. Any failed
    /// batch fails the whole call; nothing is stored until every batch is in.
    async fn embed_chunks(&self, chunks: &[CourseChunk]) -> Result<Vec<ChunkRecord>, IndexError> {
        let mut records = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(self.embed_batch_size) {
            let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();
            let embeddings = self.embedder.embed(&texts).await?;
            if embeddings.len() != batch.len() {
                return Err(lectern_core::error::EmbeddingError::CountMismatch {
                    expected: batch.len(),
                    got: embeddings.len(),
                }
                .into());
            }

            records.extend(
                batch
                    .iter()
                    .cloned()
                    .zip(embeddings)
                    .map(|(chunk, embedding)| ChunkRecord { chunk, embedding }),
            );
            debug!(batch = batch.len(), done = records.len(), total = chunks.len(), "Embedded chunk batch");
        }
        Ok(records)
    }

    /// Signature of a freshly embedded query vector.
    fn query_signature(&self, embedding: &[f32]) -> EmbeddingSignature {
        EmbeddingSignature {
            model_id: self.embedder.model_id().to_string(),
            dimensions: embedding.len(),
        }
    }

    // --- Read paths ---

    /// The `limit` chunks nearest to `query` that pass `filter`.
    ///
    /// An embedding failure is returned to the caller, never turned into an
    /// empty result.
    pub async fn search(
        &self,
        query: &str,
        filter: &SearchFilter,
        limit: usize,
    ) -> Result<SearchResults, IndexError> {
        if limit == 0 {
            return Ok(SearchResults::default());
        }

        let query_embedding = self.embedder.embed_one(query).await?;
        let state = self.state.read().await;
        state.check_signature(&self.query_signature(&query_embedding))?;

        let candidates = state
            .content
            .iter()
            .filter(|r| filter.matches(&r.chunk))
            .map(|r| (&r.chunk, r.embedding.as_slice()));

        let hits: Vec<SearchHit> = rank_by_distance(candidates, &query_embedding, limit)
            .into_iter()
            .map(|(chunk, distance)| SearchHit {
                link: state.link_for(&chunk.course_title, chunk.lesson_number),
                chunk: chunk.clone(),
                distance,
            })
            .collect();

        debug!(
            query_len = query.len(),
            course = ?filter.course_title,
            lesson = ?filter.lesson_number,
            hits = hits.len(),
            "Index search"
        );

        Ok(SearchResults { hits })
    }

    /// Best-matching stored course title for a loosely-typed name, or `None`.
    pub async fn resolve_course_title(&self, name: &str) -> Result<Option<String>, IndexError> {
        let name = name.trim();
        {
            let state = self.state.read().await;
            if state.catalog.is_empty() || name.is_empty() {
                return Ok(None);
            }
            if let Some(record) = state
                .catalog
                .iter()
                .find(|r| r.course.title.eq_ignore_ascii_case(name))
            {
                return Ok(Some(record.course.title.clone()));
            }
        }

        let embedding = self.embedder.embed_one(name).await?;
        let state = self.state.read().await;
        state.check_signature(&self.query_signature(&embedding))?;
        let candidates = state
            .catalog
            .iter()
            .map(|r| (&r.course.title, r.embedding.as_slice()));

        let best = rank_by_distance(candidates, &embedding, 1).into_iter().next();
        Ok(match best {
            Some((title, distance)) if distance <= self.course_match_max_distance => {
                debug!(query = name, resolved = %title, distance, "Course name resolved");
                Some(title.clone())
            }
            Some((title, distance)) => {
                debug!(query = name, nearest = %title, distance, "No course close enough");
                None
            }
            None => None,
        })
    }

    /// Stored metadata for an exact course title.
    pub async fn course(&self, title: &str) -> Option<Course> {
        self.state.read().await.course(title).cloned()
    }

    /// Link of lesson `number` in course `title`, if recorded.
    pub async fn lesson_link(&self, title: &str, number: u32) -> Option<String> {
        let state = self.state.read().await;
        state.course(title)?.lesson(number)?.link.clone()
    }

    pub async fn contains_course(&self, title: &str) -> bool {
        self.state.read().await.course(title).is_some()
    }

    /// Titles of all stored courses, in insertion order.
    pub async fn course_titles(&self) -> Vec<String> {
        self.state
            .read()
            .await
            .catalog
            .iter()
            .map(|r| r.course.title.clone())
            .collect()
    }

    pub async fn course_count(&self) -> usize {
        self.state.read().await.catalog.len()
    }

    pub async fn chunk_count(&self) -> usize {
        self.state.read().await.content.len()
    }

    /// Embedder the stored vectors were produced with, if any are stored.
    pub async fn stored_embedding(&self) -> Option<EmbeddingSignature> {
        let state = self.state.read().await;
        if state.is_empty() {
            return None;
        }
        state.signature.clone()
    }

    // --- Persistence ---

    async fn flush(&self) -> Result<(), IndexError> {
        let Some(dir) = &self.dir else {
            return Ok(());
        };

        let state = self.state.read().await;
        std::fs::create_dir_all(dir)
            .map_err(|e| IndexError::Storage(format!("Failed to create index directory: {e}")))?;

        let manifest = match &state.signature {
            Some(signature) => serde_json::to_string_pretty(signature)
                .map_err(|e| IndexError::Storage(format!("Failed to serialize {MANIFEST_FILE}: {e}")))?,
            None => String::new(),
        };
        let files = [
            (
                collection_path(dir, METADATA_COLLECTION),
                render_collection(METADATA_COLLECTION, &state.catalog)?,
            ),
            (
                collection_path(dir, CONTENT_COLLECTION),
                render_collection(CONTENT_COLLECTION, &state.content)?,
            ),
            (dir.join(MANIFEST_FILE), manifest),
        ];
        replace_files(&files)
    }
}

fn collection_path(dir: &Path, collection: &str) -> PathBuf {
    dir.join(format!("{collection}.jsonl"))
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

/// Signature of the vectors found on disk.
///
/// Prefers the manifest; an index written before the manifest existed is
/// assumed to come from the current model at the stored dimension.
fn stored_signature(
    dir: &Path,
    catalog: &[CourseRecord],
    content: &[ChunkRecord],
    current_model: &str,
) -> Result<Option<EmbeddingSignature>, IndexError> {
    let vectors = catalog
        .iter()
        .map(|r| r.embedding.as_slice())
        .chain(content.iter().map(|r| r.embedding.as_slice()));
    let found = EmbeddingSignature::of(current_model, vectors).map_err(|e| IndexError::Corrupted {
        collection: "index".into(),
        reason: e.to_string(),
    })?;

    let path = dir.join(MANIFEST_FILE);
    let manifest = match std::fs::read_to_string(&path) {
        Ok(text) if text.trim().is_empty() => None,
        Ok(text) => Some(serde_json::from_str::<EmbeddingSignature>(&text).map_err(|e| {
            IndexError::Corrupted {
                collection: MANIFEST_FILE.into(),
                reason: e.to_string(),
            }
        })?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => {
            return Err(IndexError::Storage(format!(
                "Failed to read {}: {e}",
                path.display()
            )));
        }
    };

    match (manifest, found) {
        (Some(manifest), Some(found)) if manifest.dimensions != found.dimensions => Err(IndexError::Corrupted {
            collection: MANIFEST_FILE.into(),
            reason: format!(
                "manifest records {} dimensions but stored vectors have {}",
                manifest.dimensions, found.dimensions
            ),
        }),
        (Some(manifest), _) => Ok(Some(manifest)),
        (None, found) => Ok(found),
    }
}

/// Load a JSONL collection. A missing file is an empty collection.
fn load_collection<T: for<'de> Deserialize<'de>>(dir: &Path, collection: &str) -> Result<Vec<T>, IndexError> {
    let path = collection_path(dir, collection);
    let content = match std::fs::read_to_string(&path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(IndexError::Storage(format!(
                "Failed to read {}: {e}",
                path.display()
            )));
        }
    };

    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(n, line)| {
            serde_json::from_str(line).map_err(|e| IndexError::Corrupted {
                collection: collection.to_string(),
                reason: format!("line {}: {e}", n + 1),
            })
        })
        .collect()
}

fn render_collection<T: Serialize>(collection: &str, records: &[T]) -> Result<String, IndexError> {
    let mut content = String::new();
    for record in records {
        let line = serde_json::to_string(record)
            .map_err(|e| IndexError::Storage(format!("Failed to serialize {collection} record: {e}")))?;
        content.push_str(&line);
        content.push('\n');
    }
    Ok(content)
}

/// Write every file to its temp path, then rename them all into place.
/// If any temp write fails no file is replaced.
fn replace_files(files: &[(PathBuf, String)]) -> Result<(), IndexError> {
    for (n, (path, content)) in files.iter().enumerate() {
        let tmp = tmp_path(path);
        if let Err(e) = std::fs::write(&tmp, content) {
            for (written, _) in &files[..n] {
                let _ = std::fs::remove_file(tmp_path(written));
            }
            return Err(IndexError::Storage(format!("Failed to write {}: {e}", tmp.display())));
        }
    }

    for (path, _) in files {
        std::fs::rename(tmp_path(path), path)
            .map_err(|e| IndexError::Storage(format!("Failed to replace {}: {e}", path.display())))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hashing::HashingEmbedder;
    use async_trait::async_trait;
    use lectern_core::course::Lesson;
    use lectern_core::error::EmbeddingError;

    fn empty_index() -> VectorIndex {
        VectorIndex::in_memory(Arc::new(HashingEmbedder::default()))
    }

    fn chunk(course: &str, lesson: Option<u32>, index: usize, text: &str) -> CourseChunk {
        CourseChunk {
            content: text.into(),
            course_title: course.into(),
            lesson_number: lesson,
            chunk_index: index,
        }
    }

    fn testing_course() -> Course {
        let mut course = Course::new("Intro to Testing");
        course.link = Some("https://example.com/testing".into());
        course.add_lesson(Lesson {
            number: 1,
            title: "Assertions".into(),
            link: Some("https://example.com/testing/1".into()),
        });
        course.add_lesson(Lesson {
            number: 2,
            title: "Mocking".into(),
            link: None,
        });
        course
    }

    async fn seeded() -> VectorIndex {
        let index = empty_index();
        index
            .replace_course(
                &testing_course(),
                &[
                    chunk("Intro to Testing", Some(1), 0, "Assertions compare actual values against expected values."),
                    chunk("Intro to Testing", Some(1), 1, "A failing assertion stops the test and reports the mismatch."),
                    chunk("Intro to Testing", Some(2), 2, "Mocks replace collaborators such as databases and network clients."),
                ],
            )
            .await
            .unwrap();
        index
            .replace_course(
                &Course::new("Cooking with Cast Iron"),
                &[chunk("Cooking with Cast Iron", None, 0, "Season the skillet with oil and bake it upside down.")],
            )
            .await
            .unwrap();
        index
    }

    struct DownEmbedder;

    #[async_trait]
    impl Embedder for DownEmbedder {
        fn model_id(&self) -> &str {
            "down"
        }

        async fn embed(&self, _inputs: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            Err(EmbeddingError::Unavailable("connection refused".into()))
        }
    }

    #[tokio::test]
    async fn chunk_is_found_by_its_own_text() {
        let index = seeded().await;
        let text = "A failing assertion stops the test and reports the mismatch.";
        let results = index.search(text, &SearchFilter::default(), 5).await.unwrap();
        assert_eq!(results.hits()[0].chunk.content, text);
        assert!(results.hits()[0].distance < 1e-4);
    }

    #[tokio::test]
    async fn search_is_bounded_and_sorted() {
        let index = seeded().await;
        let results = index
            .search("testing assertions and mocks", &SearchFilter::default(), 2)
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
        assert!(results.hits().windows(2).all(|w| w[0].distance <= w[1].distance));

        let all = index.search("skillet", &SearchFilter::default(), 50).await.unwrap();
        assert_eq!(all.len(), 4);
    }

    #[tokio::test]
    async fn filters_narrow_results() {
        let index = seeded().await;
        let filter = SearchFilter::course("Intro to Testing").with_lesson(2);
        let results = index.search("skillet", &filter, 5).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results.hits()[0].chunk.lesson_number, Some(2));
    }

    #[tokio::test]
    async fn no_match_is_empty_not_error() {
        let index = seeded().await;
        let filter = SearchFilter::course("Intro to Testing").with_lesson(9);
        let results = index.search("anything", &filter, 5).await.unwrap();
        assert!(results.is_empty());

        let empty = empty_index();
        assert!(empty.search("anything", &SearchFilter::default(), 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn hits_carry_lesson_or_course_link() {
        let index = seeded().await;
        let lesson_one = index
            .search("assertions", &SearchFilter::course("Intro to Testing").with_lesson(1), 1)
            .await
            .unwrap();
        assert_eq!(lesson_one.hits()[0].link.as_deref(), Some("https://example.com/testing/1"));

        let lesson_two = index
            .search("mocks", &SearchFilter::course("Intro to Testing").with_lesson(2), 1)
            .await
            .unwrap();
        assert_eq!(lesson_two.hits()[0].link.as_deref(), Some("https://example.com/testing"));

        let source = lesson_one.sources().remove(0);
        assert_eq!(source.label(), "Intro to Testing - Lesson 1");
    }

    #[tokio::test]
    async fn fuzzy_course_names_resolve() {
        let index = seeded().await;
        assert_eq!(
            index.resolve_course_title("testng basics").await.unwrap().as_deref(),
            Some("Intro to Testing")
        );
        assert_eq!(
            index.resolve_course_title("intro to testing").await.unwrap().as_deref(),
            Some("Intro to Testing")
        );
        assert_eq!(index.resolve_course_title("Quantum Physics").await.unwrap(), None);
    }

    #[tokio::test]
    async fn reupsert_replaces_course_and_chunks() {
        let index = seeded().await;
        index
            .replace_course(
                &Course::new("Intro to Testing"),
                &[chunk("Intro to Testing", None, 0, "Rewritten course text.")],
            )
            .await
            .unwrap();

        assert_eq!(index.course_count().await, 2);
        assert_eq!(index.chunk_count().await, 2);
        assert!(index.course("Intro to Testing").await.unwrap().lessons.is_empty());
        assert_eq!(index.course_titles().await, vec!["Cooking with Cast Iron", "Intro to Testing"]);
    }

    #[tokio::test]
    async fn metadata_upsert_drops_old_chunks() {
        let index = seeded().await;
        index.upsert_course_metadata(&testing_course()).await.unwrap();
        assert_eq!(index.chunk_count().await, 1);

        index
            .upsert_chunks(&[
                chunk("Intro to Testing", Some(1), 0, "first"),
                chunk("Intro to Testing", Some(1), 0, "first, revised"),
            ])
            .await
            .unwrap();
        assert_eq!(index.chunk_count().await, 2);
        let hits = index
            .search("first revised", &SearchFilter::course("Intro to Testing"), 5)
            .await
            .unwrap();
        assert_eq!(hits.hits()[0].chunk.content, "first, revised");
    }

    #[tokio::test]
    async fn lesson_link_lookup() {
        let index = seeded().await;
        assert_eq!(
            index.lesson_link("Intro to Testing", 1).await.as_deref(),
            Some("https://example.com/testing/1")
        );
        assert_eq!(index.lesson_link("Intro to Testing", 2).await, None);
        assert_eq!(index.lesson_link("Nope", 1).await, None);
    }

    #[tokio::test]
    async fn embedding_outage_fails_reads_and_writes() {
        let index = VectorIndex::in_memory(Arc::new(DownEmbedder));
        let err = index
            .replace_course(&Course::new("X"), &[chunk("X", None, 0, "text")])
            .await
            .unwrap_err();
        assert!(matches!(err, IndexError::Embedding(EmbeddingError::Unavailable(_))));
        assert_eq!(index.course_count().await, 0);

        let err = index.search("q", &SearchFilter::default(), 5).await.unwrap_err();
        assert!(matches!(err, IndexError::Embedding(_)));
    }

    #[tokio::test]
    async fn persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let embedder: Arc<dyn Embedder> = Arc::new(HashingEmbedder::default());
        {
            let index = VectorIndex::open(dir.path(), embedder.clone()).unwrap();
            index
                .replace_course(&testing_course(), &[chunk("Intro to Testing", Some(1), 0, "Assertions.")])
                .await
                .unwrap();
        }
        assert!(dir.path().join("course_metadata.jsonl").exists());
        assert!(dir.path().join("course_content.jsonl").exists());

        let reopened = VectorIndex::open(dir.path(), embedder).unwrap();
        assert_eq!(reopened.course_titles().await, vec!["Intro to Testing"]);
        assert_eq!(reopened.chunk_count().await, 1);
        assert_eq!(reopened.course("Intro to Testing").await.unwrap(), testing_course());

        reopened.clear().await.unwrap();
        let cleared = VectorIndex::open(dir.path(), Arc::new(HashingEmbedder::default())).unwrap();
        assert_eq!(cleared.course_count().await, 0);
    }

    #[tokio::test]
    async fn corrupted_collection_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("course_content.jsonl"), "not json\n").unwrap();
        let err = VectorIndex::open(dir.path(), Arc::new(HashingEmbedder::default()))
            .err()
            .unwrap();
        assert!(matches!(err, IndexError::Corrupted { ref collection, .. } if collection == "course_content"));
    }

    #[tokio::test]
    async fn concurrent_readers_during_write() {
        let index = Arc::new(seeded().await);
        let mut handles = Vec::new();
        for _ in 0..8 {
            let index = index.clone();
            handles.push(tokio::spawn(async move {
                let results = index.search("assertions", &SearchFilter::default(), 5).await.unwrap();
                // Either before or after the rewrite, never a mix of one course's records.
                let testing: Vec<_> = results
                    .hits()
                    .iter()
                    .filter(|h| h.chunk.course_title == "Intro to Testing")
                    .collect();
                assert!(testing.len() == 3 || testing.len() == 1);
            }));
        }
        index
            .replace_course(
                &Course::new("Intro to Testing"),
                &[chunk("Intro to Testing", None, 0, "Replacement.")],
            )
            .await
            .unwrap();
        for handle in handles {
            handle.await.unwrap();
        }
    }

    /// Wraps the hashing embedder, recording the size of every call and
    /// failing the call numbered `fail_on_call` (0-based).
    struct CountingEmbedder {
        inner: HashingEmbedder,
        calls: std::sync::Mutex<Vec<usize>>,
        fail_on_call: Option<usize>,
    }

    impl CountingEmbedder {
        fn new(fail_on_call: Option<usize>) -> Self {
            Self {
                inner: HashingEmbedder::default(),
                calls: std::sync::Mutex::new(Vec::new()),
                fail_on_call,
            }
        }

        fn calls(&self) -> Vec<usize> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Embedder for CountingEmbedder {
        fn model_id(&self) -> &str {
            self.inner.model_id()
        }

        async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            let call = {
                let mut calls = self.calls.lock().unwrap();
                calls.push(inputs.len());
                calls.len() - 1
            };
            if self.fail_on_call == Some(call) {
                return Err(EmbeddingError::Unavailable("rate limited".into()));
            }
            self.inner.embed(inputs).await
        }
    }

    fn many_chunks(course: &str, count: usize) -> Vec<CourseChunk> {
        (0..count)
            .map(|i| chunk(course, Some(1), i, &format!("Chunk number {i} of the transcript.")))
            .collect()
    }

    #[tokio::test]
    async fn chunks_are_embedded_in_batches() {
        let embedder = Arc::new(CountingEmbedder::new(None));
        let index = VectorIndex::in_memory(embedder.clone());
        index
            .replace_course(&Course::new("Long Course"), &many_chunks("Long Course", 600))
            .await
            .unwrap();

        // Title first, then the chunk texts.
        assert_eq!(embedder.calls(), vec![1, 256, 256, 88]);
        assert_eq!(index.chunk_count().await, 600);
    }

    #[tokio::test]
    async fn batch_size_is_configurable() {
        let embedder = Arc::new(CountingEmbedder::new(None));
        let index = VectorIndex::in_memory(embedder.clone()).with_embed_batch_size(2);
        index.upsert_chunks(&many_chunks("Short Course", 5)).await.unwrap();
        assert_eq!(embedder.calls(), vec![2, 2, 1]);
    }

    #[tokio::test]
    async fn failed_later_batch_changes_nothing() {
        // Calls: seed title, seed chunks, new title, batch one, batch two (fails).
        let embedder = Arc::new(CountingEmbedder::new(Some(4)));
        let index = VectorIndex::in_memory(embedder.clone()).with_embed_batch_size(2);
        index
            .replace_course(
                &testing_course(),
                &[chunk("Intro to Testing", Some(1), 0, "Assertions compare values.")],
            )
            .await
            .unwrap();

        let err = index
            .replace_course(&Course::new("Intro to Testing"), &many_chunks("Intro to Testing", 4))
            .await
            .unwrap_err();
        assert!(matches!(err, IndexError::Embedding(EmbeddingError::Unavailable(_))));
        assert_eq!(embedder.calls(), vec![1, 1, 1, 2, 2]);

        assert_eq!(index.chunk_count().await, 1);
        assert_eq!(index.course("Intro to Testing").await.unwrap(), testing_course());
    }

    #[tokio::test]
    async fn reopening_with_another_embedder_is_a_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        {
            let index = VectorIndex::open(dir.path(), Arc::new(HashingEmbedder::new(1024))).unwrap();
            index
                .replace_course(&testing_course(), &[chunk("Intro to Testing", Some(1), 0, "Assertions.")])
                .await
                .unwrap();
        }
        assert!(dir.path().join(MANIFEST_FILE).exists());

        let reopened = VectorIndex::open(dir.path(), Arc::new(HashingEmbedder::new(64))).unwrap();
        assert_eq!(
            reopened.stored_embedding().await,
            Some(EmbeddingSignature {
                model_id: "hashing-trigram-1024".into(),
                dimensions: 1024,
            })
        );

        let err = reopened.search("assertions", &SearchFilter::default(), 5).await.unwrap_err();
        assert!(matches!(
            err,
            IndexError::EmbeddingMismatch { ref stored, ref current }
                if stored.contains("hashing-trigram-1024") && current.contains("hashing-trigram-64")
        ));
        let err = reopened.resolve_course_title("testng basics").await.unwrap_err();
        assert!(matches!(err, IndexError::EmbeddingMismatch { .. }));
        // Exact titles need no vectors.
        assert_eq!(
            reopened.resolve_course_title("intro to testing").await.unwrap().as_deref(),
            Some("Intro to Testing")
        );

        let err = reopened
            .replace_course(&Course::new("Other"), &[chunk("Other", None, 0, "More text.")])
            .await
            .unwrap_err();
        assert!(matches!(err, IndexError::EmbeddingMismatch { .. }));
        assert_eq!(reopened.course_titles().await, vec!["Intro to Testing"]);

        // Clearing lets the new embedder rebuild the index.
        reopened.clear().await.unwrap();
        reopened
            .replace_course(&Course::new("Other"), &[chunk("Other", None, 0, "More text.")])
            .await
            .unwrap();
        assert_eq!(reopened.stored_embedding().await.unwrap().dimensions, 64);
        assert_eq!(reopened.search("more text", &SearchFilter::default(), 5).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn index_without_manifest_checks_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        {
            let index = VectorIndex::open(dir.path(), Arc::new(HashingEmbedder::new(1024))).unwrap();
            index
                .replace_course(&testing_course(), &[chunk("Intro to Testing", Some(1), 0, "Assertions.")])
                .await
                .unwrap();
        }
        std::fs::remove_file(dir.path().join(MANIFEST_FILE)).unwrap();

        let same = VectorIndex::open(dir.path(), Arc::new(HashingEmbedder::new(1024))).unwrap();
        assert_eq!(same.search("assertions", &SearchFilter::default(), 5).await.unwrap().len(), 1);

        let smaller = VectorIndex::open(dir.path(), Arc::new(HashingEmbedder::new(64))).unwrap();
        let err = smaller.search("assertions", &SearchFilter::default(), 5).await.unwrap_err();
        assert!(matches!(err, IndexError::EmbeddingMismatch { .. }));
    }

    #[tokio::test]
    async fn flush_replaces_all_files_and_leaves_no_temps() {
        let dir = tempfile::tempdir().unwrap();
        let index = VectorIndex::open(dir.path(), Arc::new(HashingEmbedder::default())).unwrap();
        index
            .replace_course(&testing_course(), &[chunk("Intro to Testing", Some(1), 0, "Assertions.")])
            .await
            .unwrap();
        index.clear().await.unwrap();
        index
            .replace_course(&Course::new("Second"), &[chunk("Second", None, 0, "Second text.")])
            .await
            .unwrap();

        let mut names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec!["course_content.jsonl", "course_metadata.jsonl", "index.json"]);

        let reopened = VectorIndex::open(dir.path(), Arc::new(HashingEmbedder::default())).unwrap();
        assert_eq!(reopened.course_titles().await, vec!["Second"]);
        assert_eq!(reopened.chunk_count().await, 1);
    }
}
