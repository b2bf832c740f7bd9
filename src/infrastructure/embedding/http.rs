//! HTTP embedding provider (OpenAI-compatible API)

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::embedding::{validate_input, EmbeddingProvider};
use crate::domain::DomainError;

/// Default model served by the local inference container
const DEFAULT_MODEL: &str = "all-MiniLM-L6-v2";
const DEFAULT_DIMENSIONS: usize = 384;
const DEFAULT_MAX_INPUT_CHARS: usize = 2000;
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration for the HTTP embedding provider
#[derive(Debug, Clone)]
pub struct HttpEmbedderConfig {
    /// Base URL of an OpenAI-compatible embeddings endpoint
    pub base_url: String,
    /// Optional bearer token
    pub api_key: Option<String>,
    /// Model name sent with each request
    pub model: String,
    /// Embedding dimensions the model produces
    pub dimensions: usize,
    /// Maximum accepted input length in characters; longer inputs are
    /// rejected, never truncated
    pub max_input_chars: usize,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl HttpEmbedderConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            dimensions: DEFAULT_DIMENSIONS,
            max_input_chars: DEFAULT_MAX_INPUT_CHARS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>, dimensions: usize) -> Self {
        self.model = model.into();
        self.dimensions = dimensions;
        self
    }

    pub fn with_max_input_chars(mut self, max_chars: usize) -> Self {
        self.max_input_chars = max_chars;
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// Embedding provider backed by an OpenAI-compatible `/v1/embeddings`
/// endpoint, typically a local inference server hosting a sentence
/// transformer.
#[derive(Debug)]
pub struct HttpEmbeddingProvider {
    client: reqwest::Client,
    config: HttpEmbedderConfig,
}

impl HttpEmbeddingProvider {
    pub fn new(config: HttpEmbedderConfig) -> Result<Self, DomainError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                DomainError::configuration(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self { client, config })
    }

    fn embeddings_url(&self) -> String {
        format!("{}/v1/embeddings", self.config.base_url)
    }

    async fn request(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, DomainError> {
        let body = EmbeddingsRequest {
            model: &self.config.model,
            input: texts,
        };

        let mut request = self.client.post(self.embeddings_url()).json(&body);
        if let Some(ref api_key) = self.config.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await.map_err(|e| {
            DomainError::provider("embeddings", format!("Request failed: {}", e))
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response.text().await.unwrap_or_default();
            return Err(DomainError::provider(
                "embeddings",
                format!("HTTP {}: {}", status, error_body),
            ));
        }

        let parsed: EmbeddingsResponse = response.json().await.map_err(|e| {
            DomainError::provider("embeddings", format!("Failed to parse response: {}", e))
        })?;

        if parsed.data.len() != texts.len() {
            return Err(DomainError::provider(
                "embeddings",
                format!(
                    "expected {} embeddings, received {}",
                    texts.len(),
                    parsed.data.len()
                ),
            ));
        }

        let mut data = parsed.data;
        data.sort_by_key(|item| item.index);

        for item in &data {
            if item.embedding.len() != self.config.dimensions {
                return Err(DomainError::provider(
                    "embeddings",
                    format!(
                        "model returned dimension {}, expected {}",
                        item.embedding.len(),
                        self.config.dimensions
                    ),
                ));
            }
        }

        Ok(data.into_iter().map(|item| item.embedding).collect())
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, DomainError> {
        validate_input(text, self.config.max_input_chars)?;

        let input = [text.to_string()];
        let embeddings = self.request(&input).await?;
        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| DomainError::provider("embeddings", "empty response"))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, DomainError> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        for text in texts {
            validate_input(text, self.config.max_input_chars)?;
        }

        self.request(texts).await
    }

    fn dimensions(&self) -> usize {
        self.config.dimensions
    }
}

// Wire types for the embeddings endpoint

#[derive(Debug, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}
