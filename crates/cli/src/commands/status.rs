//! `lectern status` — Show configuration and index statistics.

use lectern_config::AppConfig;
use std::path::Path;

use crate::runtime;

pub async fn run(config: &AppConfig, config_file: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = match config_file {
        Some(path) => path.to_path_buf(),
        None => AppConfig::config_dir().join("config.toml"),
    };

    println!("Lectern Status");
    println!("==============");
    println!("  Config file:  {}", config_path.display());
    println!("  Model:        {}", config.models.generation_model_id);
    println!("  Temperature:  {}", config.models.temperature);
    println!(
        "  Embeddings:   {} ({})",
        config.models.embedding_provider, config.models.embedding_model_id
    );
    println!(
        "  Chunking:     {} chars, {} overlap",
        config.chunking.chunk_size, config.chunking.chunk_overlap
    );
    println!("  Index:        {}", config.index.path.display());
    println!("  API key:      {}", if config.has_api_key() { "set" } else { "missing" });

    let index = runtime::open_index(config)?;
    println!("  Courses:      {}", index.course_count().await);
    println!("  Chunks:       {}", index.chunk_count().await);
    if let Some(stored) = index.stored_embedding().await {
        if stored.model_id == index.embedder().model_id() {
            println!("  Embedded by:  {stored}");
        } else {
            println!("  Embedded by:  {stored} (current embedder is {}; re-ingest with --clear)", index.embedder().model_id());
        }
    }

    if !config_path.exists() {
        println!("\n  No config file, using defaults. Run `lectern init` to create one.");
    }
    Ok(())
}
