//! Wiring: builds the index, embedder, chunker and orchestrator from config.

use lectern_agent::{Orchestrator, QueryAnswer};
use lectern_config::AppConfig;
use lectern_core::Embedder;
use lectern_index::{HashingEmbedder, VectorIndex};
use lectern_ingest::Chunker;
use lectern_providers::{AnthropicProvider, OpenAiCompatEmbedder};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

pub type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Load `path` if given (with the same env overrides), else the default file.
pub fn load_config(path: Option<&Path>) -> CliResult<AppConfig> {
    let config = match path {
        Some(path) => {
            let mut config = AppConfig::load_from(path)?;
            config.apply_env_overrides(|key| std::env::var(key).ok());
            config.validate()?;
            config
        }
        None => AppConfig::load()?,
    };
    debug!(?config, "Configuration loaded");
    Ok(config)
}

pub fn build_embedder(config: &AppConfig) -> CliResult<Arc<dyn Embedder>> {
    let embedder: Arc<dyn Embedder> = match config.models.embedding_provider.as_str() {
        "openai" => Arc::new(OpenAiCompatEmbedder::from_config(config)?),
        _ => Arc::new(HashingEmbedder::default()),
    };
    debug!(model = embedder.model_id(), "Embedder ready");
    Ok(embedder)
}

pub fn open_index(config: &AppConfig) -> CliResult<Arc<VectorIndex>> {
    let index = VectorIndex::open(config.index.path.clone(), build_embedder(config)?)?
        .with_course_match_distance(config.index.course_match_max_distance)
        .with_embed_batch_size(config.index.embed_batch_size);
    Ok(Arc::new(index))
}

pub fn chunker(config: &AppConfig) -> Chunker {
    Chunker::new(config.chunking.chunk_size, config.chunking.chunk_overlap)
        .with_boundary_window(config.chunking.boundary_window)
}

pub fn build_orchestrator(config: &AppConfig, index: Arc<VectorIndex>) -> CliResult<Orchestrator> {
    if !config.has_api_key() {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    LECTERN_API_KEY   = 'sk-ant-...'");
        eprintln!("    ANTHROPIC_API_KEY = 'sk-ant-...'");
        eprintln!();
        eprintln!("  Or add `api_key` to your config file:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    let provider = Arc::new(AnthropicProvider::from_config(config)?);
    let tools = Arc::new(lectern_tools::default_registry(
        index,
        config.index.max_search_results,
    ));
    Ok(Orchestrator::from_config(provider, tools, config))
}

/// Print an answer followed by its numbered citations.
pub fn print_answer(answer: &QueryAnswer) {
    println!("{}", answer.answer);
    if answer.sources.is_empty() {
        return;
    }
    println!();
    println!("Sources:");
    for (i, source) in answer.sources.iter().enumerate() {
        match &source.link {
            Some(link) => println!("  [{}] {} ({link})", i + 1, source.label()),
            None => println!("  [{}] {}", i + 1, source.label()),
        }
    }
}
