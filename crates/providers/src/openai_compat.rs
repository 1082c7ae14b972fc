//! OpenAI-compatible embedding client.
//!
//! Works with OpenAI, Azure-style proxies, Ollama, vLLM, Together AI and
//! any other endpoint that exposes `POST {base}/embeddings`.

use async_trait::async_trait;
use lectern_config::AppConfig;
use lectern_core::error::EmbeddingError;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Embeds text through an OpenAI-compatible `/embeddings` endpoint.
pub struct OpenAiCompatEmbedder {
    base_url: String,
    api_key: String,
    model: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl OpenAiCompatEmbedder {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self::with_timeout(base_url, api_key, model, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Create an embedder whose requests give up after `timeout`.
    pub fn with_timeout(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            timeout,
            client,
        }
    }

    /// Create an OpenAI embedder (convenience constructor).
    pub fn openai(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self::new("https://api.openai.com/v1", api_key, model)
    }

    /// Build from `[models]` settings and `embedding_api_key`.
    pub fn from_config(config: &AppConfig) -> Result<Self, EmbeddingError> {
        let api_key = config.embedding_api_key.clone().ok_or_else(|| {
            EmbeddingError::NotConfigured(
                "no embedding API key; set OPENAI_API_KEY or embedding_api_key in config.toml"
                    .into(),
            )
        })?;
        Ok(Self::with_timeout(
            config.models.embedding_api_url.as_str(),
            api_key,
            config.models.embedding_model_id.as_str(),
            Duration::from_secs(config.models.request_timeout_secs),
        ))
    }

    /// Put vectors back into input order and check the count.
    fn into_ordered(mut data: Vec<EmbeddingData>, expected: usize) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if data.len() != expected {
            return Err(EmbeddingError::CountMismatch {
                expected,
                got: data.len(),
            });
        }
        data.sort_by_key(|d| d.index);
        Ok(data.into_iter().map(|d| d.embedding).collect())
    }
}

#[async_trait]
impl lectern_core::Embedder for OpenAiCompatEmbedder {
    fn model_id(&self) -> &str {
        &self.model
    }

    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/embeddings", self.base_url);
        let body = EmbeddingRequest {
            model: &self.model,
            input: inputs,
            encoding_format: "float",
        };

        debug!(model = %self.model, count = inputs.len(), "Sending embedding request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| EmbeddingError::Unavailable(e.to_string()))?;

        let status = response.status().as_u16();

        if status == 401 || status == 403 {
            return Err(EmbeddingError::Rejected {
                status_code: status,
                message: "Invalid embedding API key".into(),
            });
        }
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Embedding API error");
            return Err(EmbeddingError::Rejected {
                status_code: status,
                message: error_body,
            });
        }

        let api_resp: EmbeddingApiResponse = response.json().await.map_err(|e| {
            EmbeddingError::Unavailable(format!("Failed to parse embedding response: {e}"))
        })?;

        Self::into_ordered(api_resp.data, inputs.len())
    }
}

// --- Embedding API types ---

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
    encoding_format: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingApiResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: usize,
}
