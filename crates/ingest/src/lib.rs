//! Course transcript ingestion for Lectern.
//!
//! Parses transcripts into a [`Course`](lectern_core::Course) plus text
//! sections, splits sections into overlapping chunks, and writes them to the
//! vector index.

pub mod chunker;
pub mod document;
pub mod pipeline;

pub use chunker::Chunker;
pub use document::{DocumentEncoding, ParsedDocument, Section, parse_document};
pub use pipeline::{FailedDocument, IngestReport, Ingestor, ingest_file};
