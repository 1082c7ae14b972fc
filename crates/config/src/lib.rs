//! Configuration loading, validation, and management for Lectern.
//!
//! Loads configuration from `~/.lectern/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.lectern/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the generation model
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// API key for the embedding service (when it is a remote one)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding_api_key: Option<String>,

    /// Model selection and request settings
    #[serde(default)]
    pub models: ModelConfig,

    /// Document chunking
    #[serde(default)]
    pub chunking: ChunkingConfig,

    /// Vector index location and search limits
    #[serde(default)]
    pub index: IndexConfig,

    /// Query orchestration limits
    #[serde(default)]
    pub query: QueryConfig,
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("embedding_api_key", &redact(&self.embedding_api_key))
            .field("models", &self.models)
            .field("chunking", &self.chunking)
            .field("index", &self.index)
            .field("query", &self.query)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_generation_model")]
    pub generation_model_id: String,

    #[serde(default = "default_embedding_model")]
    pub embedding_model_id: String,

    /// "hashing" (local, offline) or "openai" (any OpenAI-compatible endpoint)
    #[serde(default = "default_embedding_provider")]
    pub embedding_provider: String,

    #[serde(default = "default_embedding_api_url")]
    pub embedding_api_url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anthropic_base_url: Option<String>,

    #[serde(default)]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_generation_model() -> String {
    "claude-sonnet-4-20250514".into()
}
fn default_embedding_model() -> String {
    "text-embedding-3-small".into()
}
fn default_embedding_provider() -> String {
    "hashing".into()
}
fn default_embedding_api_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_max_tokens() -> u32 {
    800
}
fn default_request_timeout() -> u64 {
    60
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            generation_model_id: default_generation_model(),
            embedding_model_id: default_embedding_model(),
            embedding_provider: default_embedding_provider(),
            embedding_api_url: default_embedding_api_url(),
            anthropic_base_url: None,
            temperature: 0.0,
            max_tokens: default_max_tokens(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Maximum characters per chunk
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Characters shared by adjacent chunks
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// How far back from the size limit to look for a sentence break
    #[serde(default = "default_boundary_window")]
    pub boundary_window: usize,
}

fn default_chunk_size() -> usize {
    800
}
fn default_chunk_overlap() -> usize {
    100
}
fn default_boundary_window() -> usize {
    160
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            boundary_window: default_boundary_window(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Directory holding the `course_metadata` and `course_content` collections
    #[serde(default = "default_index_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_results")]
    pub max_search_results: usize,

    /// Largest cosine distance at which a fuzzy course name still matches
    #[serde(default = "default_course_match_distance")]
    pub course_match_max_distance: f32,

    /// Most chunk texts sent to the embedding service in one request
    #[serde(default = "default_embed_batch_size")]
    pub embed_batch_size: usize,
}

fn default_index_path() -> PathBuf {
    PathBuf::from("./course_index")
}
fn default_max_results() -> usize {
    5
}
fn default_course_match_distance() -> f32 {
    0.8
}
fn default_embed_batch_size() -> usize {
    256
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            path: default_index_path(),
            max_search_results: default_max_results(),
            course_match_max_distance: default_course_match_distance(),
            embed_batch_size: default_embed_batch_size(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Question/answer exchanges kept per session
    #[serde(default = "default_history_turns")]
    pub max_history_turns: usize,

    /// Tool calls executed per model round; extra calls are refused
    #[serde(default = "default_max_tool_calls")]
    pub max_tool_calls: usize,
}

fn default_history_turns() -> usize {
    2
}
fn default_max_tool_calls() -> usize {
    4
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            max_history_turns: default_history_turns(),
            max_tool_calls: default_max_tool_calls(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.lectern/config.toml).
    ///
    /// Environment variables take priority over the file:
    /// - `LECTERN_API_KEY`, then `ANTHROPIC_API_KEY`
    /// - `LECTERN_EMBEDDING_API_KEY`, then `OPENAI_API_KEY`
    /// - `LECTERN_MODEL`, `LECTERN_INDEX_PATH`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from an environment lookup.
    pub fn apply_env_overrides(&mut self, env: impl Fn(&str) -> Option<String>) {
        if let Some(key) = env("LECTERN_API_KEY").or_else(|| env("ANTHROPIC_API_KEY")) {
            self.api_key = Some(key);
        }
        if let Some(key) = env("LECTERN_EMBEDDING_API_KEY").or_else(|| env("OPENAI_API_KEY")) {
            self.embedding_api_key = Some(key);
        }
        if let Some(model) = env("LECTERN_MODEL") {
            self.models.generation_model_id = model;
        }
        if let Some(path) = env("LECTERN_INDEX_PATH") {
            self.index.path = PathBuf::from(path);
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".lectern")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunking.chunk_size == 0 {
            return Err(ConfigError::ValidationError("chunking.chunk_size must be > 0".into()));
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return Err(ConfigError::ValidationError(
                "chunking.chunk_overlap must be smaller than chunking.chunk_size".into(),
            ));
        }
        if self.index.max_search_results == 0 {
            return Err(ConfigError::ValidationError(
                "index.max_search_results must be > 0".into(),
            ));
        }
        if self.index.embed_batch_size == 0 {
            return Err(ConfigError::ValidationError(
                "index.embed_batch_size must be > 0".into(),
            ));
        }
        if !(0.0..=2.0).contains(&self.index.course_match_max_distance) {
            return Err(ConfigError::ValidationError(
                "index.course_match_max_distance must be between 0.0 and 2.0".into(),
            ));
        }
        if !(0.0..=2.0).contains(&self.models.temperature) {
            return Err(ConfigError::ValidationError(
                "models.temperature must be between 0.0 and 2.0".into(),
            ));
        }
        if self.query.max_tool_calls == 0 {
            return Err(ConfigError::ValidationError("query.max_tool_calls must be > 0".into()));
        }
        match self.models.embedding_provider.as_str() {
            "hashing" | "openai" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "models.embedding_provider must be \"hashing\" or \"openai\", got \"{other}\""
                )));
            }
        }
        Ok(())
    }

    /// Check if a generation API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            embedding_api_key: None,
            models: ModelConfig::default(),
            chunking: ChunkingConfig::default(),
            index: IndexConfig::default(),
            query: QueryConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
