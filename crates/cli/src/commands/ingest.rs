//! `lectern ingest` — Index one transcript or a folder of transcripts.

use lectern_config::AppConfig;
use lectern_ingest::{DocumentEncoding, Ingestor};
use std::path::Path;

use crate::runtime;

pub async fn run(
    config: &AppConfig,
    path: &Path,
    clear: bool,
    title: Option<&str>,
    encoding: DocumentEncoding,
) -> Result<(), Box<dyn std::error::Error>> {
    let index = runtime::open_index(config)?;
    let ingestor = Ingestor::new(index.clone(), runtime::chunker(config)).with_encoding(encoding);

    if path.is_file() {
        if clear {
            index.clear().await?;
        }
        let (course, chunks) = ingestor.ingest_document(path, title).await?;
        println!(
            "Indexed '{}': {} lessons, {} chunks",
            course.title,
            course.lessons.len(),
            chunks
        );
        return Ok(());
    }

    if !path.exists() {
        return Err(format!("No such file or folder: {}", path.display()).into());
    }

    let report = ingestor.ingest_folder(path, clear).await?;
    println!(
        "Added {} courses ({} chunks)",
        report.courses_added, report.chunks_added
    );
    for title in &report.skipped {
        println!("  skipped (already indexed): {title}");
    }
    for failed in &report.failed {
        println!("  failed: {}: {}", failed.path.display(), failed.reason);
    }
    println!(
        "Index now holds {} courses, {} chunks",
        index.course_count().await,
        index.chunk_count().await
    );
    Ok(())
}
