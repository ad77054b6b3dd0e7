//! Embedding service abstraction
//!
//! Provides:
//! - The `Embedder` trait implemented by remote providers
//! - An OpenAI-compatible client with bounded retries
//! - The hash-derived fallback used when no provider answers
//! - `EmbeddingGenerator`, which picks between the two

mod fallback;
mod generator;

pub use fallback::fallback_vector;
pub use generator::EmbeddingGenerator;

use crate::config::{AppConfig, EmbeddingConfig};
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use backoff::future::retry;
use backoff::ExponentialBackoffBuilder;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Trait for embedding generation
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate embedding for a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Get the model name
    fn model_name(&self) -> &str;

    /// Get the embedding dimension
    fn dimension(&self) -> usize;
}

/// A model identifier together with the vector length it produces
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSpec {
    pub name: String,
    pub dimensions: usize,
}

impl ModelSpec {
    pub fn new(name: impl Into<String>, dimensions: usize) -> Self {
        Self {
            name: name.into(),
            dimensions,
        }
    }
}

/// Model constants threaded into the generator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddingSettings {
    pub model: String,
    pub dimensions: usize,
    pub fallback_model: String,
    pub fallback_dimensions: usize,
    pub max_input_chars: usize,
}

impl EmbeddingSettings {
    pub fn primary(&self) -> ModelSpec {
        ModelSpec::new(&self.model, self.dimensions)
    }

    pub fn fallback(&self) -> ModelSpec {
        ModelSpec::new(&self.fallback_model, self.fallback_dimensions)
    }
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            model: crate::DEFAULT_EMBEDDING_MODEL.to_string(),
            dimensions: crate::DEFAULT_EMBEDDING_DIMENSION,
            fallback_model: crate::FALLBACK_EMBEDDING_MODEL.to_string(),
            fallback_dimensions: crate::FALLBACK_EMBEDDING_DIMENSION,
            max_input_chars: 8000,
        }
    }
}

/// Which path produced a vector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingSource {
    Primary,
    Fallback,
}

impl EmbeddingSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmbeddingSource::Primary => "primary",
            EmbeddingSource::Fallback => "fallback",
        }
    }
}

/// Output of [`EmbeddingGenerator::generate`]
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedEmbedding {
    pub vector: Vec<f32>,
    pub model: String,
    pub dimensions: usize,
    pub source: EmbeddingSource,
}

impl GeneratedEmbedding {
    pub fn spec(&self) -> ModelSpec {
        ModelSpec::new(&self.model, self.dimensions)
    }
}

/// Cut `text` to at most `max_chars` characters without splitting one
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// OpenAI embedding client
pub struct OpenAIEmbedder {
    client: reqwest::Client,
    api_key: String,
    model: String,
    dimension: usize,
    base_url: String,
    max_input_chars: usize,
    retry_budget: Duration,
}

#[derive(Serialize)]
struct OpenAIRequest<'a> {
    input: &'a str,
    model: &'a str,
}

#[derive(Deserialize)]
struct OpenAIResponse {
    data: Vec<OpenAIEmbedding>,
}

#[derive(Deserialize)]
struct OpenAIEmbedding {
    embedding: Vec<f32>,
}

impl OpenAIEmbedder {
    /// Create a new OpenAI embedder
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let api_key = config.api_key.clone().ok_or_else(|| AppError::Configuration {
            message: "embedding.api_key is required for the openai provider".to_string(),
        })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Configuration {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            api_key,
            model: config.model.clone(),
            dimension: config.dimension,
            base_url: config
                .api_base
                .clone()
                .unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
            max_input_chars: config.max_input_chars,
            retry_budget: Duration::from_secs(config.retry_budget_secs),
        })
    }

    /// Make request with retry
    async fn request_with_retry(&self, text: &str) -> Result<Vec<f32>> {
        let policy = ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_millis(200))
            .with_max_elapsed_time(Some(self.retry_budget))
            .build();

        retry(policy, || async { self.make_request(text).await }).await
    }

    async fn make_request(&self, text: &str) -> std::result::Result<Vec<f32>, backoff::Error<AppError>> {
        let url = format!("{}/embeddings", self.base_url);

        let request = OpenAIRequest {
            input: text,
            model: &self.model,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, model = %self.model, "Embedding request failed, retrying");
                backoff::Error::transient(AppError::EmbeddingProvider {
                    message: format!("Request failed: {}", e),
                })
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = AppError::EmbeddingProvider {
                message: format!("API error {}: {}", status, body),
            };
            if status.as_u16() == 429 || status.is_server_error() {
                tracing::warn!(status = status.as_u16(), "Embedding provider busy, retrying");
                return Err(backoff::Error::transient(err));
            }
            return Err(backoff::Error::permanent(err));
        }

        let result: OpenAIResponse = response.json().await.map_err(|e| {
            backoff::Error::permanent(AppError::EmbeddingProvider {
                message: format!("Failed to parse response: {}", e),
            })
        })?;

        let vector = result
            .data
            .into_iter()
            .next()
            .map(|e| e.embedding)
            .ok_or_else(|| {
                backoff::Error::permanent(AppError::EmbeddingProvider {
                    message: "Empty response".to_string(),
                })
            })?;

        if vector.len() != self.dimension {
            return Err(backoff::Error::permanent(AppError::EmbeddingProvider {
                message: format!(
                    "Model {} returned {} dimensions, expected {}",
                    self.model,
                    vector.len(),
                    self.dimension
                ),
            }));
        }

        Ok(vector)
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.request_with_retry(truncate_chars(text, self.max_input_chars))
            .await
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Deterministic embedder for tests and local development.
///
/// Each registered topic owns one axis; a text's vector has weight on
/// the axes whose keywords it mentions, so texts sharing topics are close.
pub struct MockEmbedder {
    model: String,
    dimension: usize,
    topics: Vec<(String, usize)>,
    failing: bool,
}

impl MockEmbedder {
    pub fn new(model: impl Into<String>, dimension: usize) -> Self {
        Self {
            model: model.into(),
            dimension,
            topics: Vec::new(),
            failing: false,
        }
    }

    /// An embedder whose every call fails like an unreachable provider
    pub fn failing(model: impl Into<String>, dimension: usize) -> Self {
        Self {
            failing: true,
            ..Self::new(model, dimension)
        }
    }

    /// Texts containing any of `keywords` get weight on the next free axis
    pub fn with_topic(mut self, keywords: &[&str]) -> Self {
        let axis = self.topics.iter().map(|(_, a)| a + 1).max().unwrap_or(0);
        for keyword in keywords {
            self.topics.push((keyword.to_lowercase(), axis));
        }
        self
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if self.failing {
            return Err(AppError::EmbeddingProvider {
                message: "provider unreachable".to_string(),
            });
        }

        let lowered = text.to_lowercase();
        let mut vector = vec![0.0f32; self.dimension];
        // Shared baseline keeps unrelated texts at a finite distance
        if let Some(last) = vector.last_mut() {
            *last = 0.1;
        }
        for (keyword, axis) in &self.topics {
            if *axis < self.dimension && lowered.contains(keyword.as_str()) {
                vector[*axis] = 1.0;
            }
        }
        Ok(vector)
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Create the configured provider, or `None` to run in fallback mode
pub fn create_embedder(config: &AppConfig) -> Result<Option<Arc<dyn Embedder>>> {
    match config.embedding.provider.as_str() {
        "openai" if config.provider_enabled() => {
            Ok(Some(Arc::new(OpenAIEmbedder::new(&config.embedding)?)))
        }
        "openai" => {
            tracing::warn!("No embedding API key configured, using fallback vectors");
            Ok(None)
        }
        "none" => Ok(None),
        other => Err(AppError::Configuration {
            message: format!("Unknown embedding provider: {}", other),
        }),
    }
}
