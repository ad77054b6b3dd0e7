use super::{
    fallback_vector, truncate_chars, Embedder, EmbeddingSettings, EmbeddingSource,
    GeneratedEmbedding, ModelSpec,
};
use crate::config::AppConfig;
use crate::errors::{AppError, Result};
use crate::metrics;
use std::sync::Arc;
use std::time::Instant;

/// Chooses between the configured provider and the hash fallback
#[derive(Clone)]
pub struct EmbeddingGenerator {
    provider: Option<Arc<dyn Embedder>>,
    settings: EmbeddingSettings,
}

impl EmbeddingGenerator {
    pub fn new(provider: Option<Arc<dyn Embedder>>, settings: EmbeddingSettings) -> Self {
        Self { provider, settings }
    }

    /// Build the provider described by `config`
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Ok(Self::new(
            super::create_embedder(config)?,
            config.embedding_settings(),
        ))
    }

    pub fn has_provider(&self) -> bool {
        self.provider.is_some()
    }

    pub fn settings(&self) -> &EmbeddingSettings {
        &self.settings
    }

    pub fn primary_model(&self) -> ModelSpec {
        match &self.provider {
            Some(provider) => ModelSpec::new(provider.model_name(), provider.dimension()),
            None => self.settings.primary(),
        }
    }

    pub fn fallback_model(&self) -> ModelSpec {
        self.settings.fallback()
    }

    /// Model stored vectors are expected to carry: the provider's when one
    /// is configured, the fallback's otherwise
    pub fn canonical_model(&self) -> ModelSpec {
        if self.has_provider() {
            self.primary_model()
        } else {
            self.fallback_model()
        }
    }

    /// Embed document text. Never fails: provider errors downgrade to the
    /// fallback vector.
    pub async fn generate(&self, text: &str) -> GeneratedEmbedding {
        if let Some(provider) = &self.provider {
            let start = Instant::now();
            let input = truncate_chars(text, self.settings.max_input_chars);

            match provider.embed(input).await {
                Ok(vector) if vector.len() == provider.dimension() => {
                    metrics::record_embedding(
                        EmbeddingSource::Primary.as_str(),
                        provider.model_name(),
                        start.elapsed(),
                    );
                    return GeneratedEmbedding {
                        dimensions: vector.len(),
                        vector,
                        model: provider.model_name().to_string(),
                        source: EmbeddingSource::Primary,
                    };
                }
                Ok(vector) => {
                    tracing::warn!(
                        model = provider.model_name(),
                        expected = provider.dimension(),
                        actual = vector.len(),
                        "Provider returned unexpected dimensions, using fallback"
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        model = provider.model_name(),
                        error = %e,
                        "Embedding provider failed, using fallback"
                    );
                }
            }
        }

        self.fallback(text)
    }

    /// Embed with the hash fallback only
    pub fn fallback(&self, text: &str) -> GeneratedEmbedding {
        let start = Instant::now();
        let spec = self.fallback_model();
        let vector = fallback_vector(text, spec.dimensions);

        metrics::record_embedding(
            EmbeddingSource::Fallback.as_str(),
            &spec.name,
            start.elapsed(),
        );

        GeneratedEmbedding {
            vector,
            model: spec.name,
            dimensions: spec.dimensions,
            source: EmbeddingSource::Fallback,
        }
    }

    /// Embed a search query with the provider. Unlike [`generate`], a
    /// missing or failing provider is an error: fallback query vectors are
    /// not comparable with stored provider vectors.
    ///
    /// [`generate`]: EmbeddingGenerator::generate
    pub async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let provider = self.provider.as_ref().ok_or_else(|| AppError::SearchUnavailable {
            message: "no embedding provider configured".to_string(),
        })?;

        let start = Instant::now();
        let input = truncate_chars(text, self.settings.max_input_chars);
        let vector = provider
            .embed(input)
            .await
            .map_err(|e| AppError::SearchUnavailable {
                message: format!("query embedding failed: {}", e),
            })?;

        if vector.len() != provider.dimension() {
            return Err(AppError::SearchUnavailable {
                message: format!(
                    "query embedding has {} dimensions, expected {}",
                    vector.len(),
                    provider.dimension()
                ),
            });
        }

        metrics::record_embedding(
            EmbeddingSource::Primary.as_str(),
            provider.model_name(),
            start.elapsed(),
        );
        Ok(vector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::MockEmbedder;

    fn settings() -> EmbeddingSettings {
        EmbeddingSettings {
            model: "mock-primary".into(),
            dimensions: 8,
            ..EmbeddingSettings::default()
        }
    }

    #[tokio::test]
    async fn test_no_provider_uses_fallback() {
        let generator = EmbeddingGenerator::new(None, EmbeddingSettings::default());

        let first = generator.generate("Hello world").await;
        let second = generator.generate("Hello world").await;

        assert_eq!(first.source, EmbeddingSource::Fallback);
        assert_eq!(first.vector.len(), 384);
        assert_eq!(first.dimensions, 384);
        assert_ne!(first.model, crate::DEFAULT_EMBEDDING_MODEL);
        assert_eq!(first.vector, second.vector);
        assert_eq!(generator.canonical_model(), generator.fallback_model());
    }

    #[tokio::test]
    async fn test_provider_success() {
        let provider = Arc::new(MockEmbedder::new("mock-primary", 8).with_topic(&["rust"]));
        let generator = EmbeddingGenerator::new(Some(provider), settings());

        let result = generator.generate("rust").await;
        assert_eq!(result.source, EmbeddingSource::Primary);
        assert_eq!(result.model, "mock-primary");
        assert_eq!(result.dimensions, 8);
        assert_eq!(generator.canonical_model(), ModelSpec::new("mock-primary", 8));
    }

    #[tokio::test]
    async fn test_provider_failure_falls_back_silently() {
        let provider = Arc::new(MockEmbedder::failing("mock-primary", 8));
        let generator = EmbeddingGenerator::new(Some(provider), settings());

        let result = generator.generate("rust").await;
        assert_eq!(result.source, EmbeddingSource::Fallback);
        assert_eq!(result.vector, fallback_vector("rust", 384));
    }

    #[tokio::test]
    async fn test_query_embedding_never_falls_back() {
        let generator = EmbeddingGenerator::new(None, settings());
        assert!(matches!(
            generator.embed_query("rust").await,
            Err(AppError::SearchUnavailable { .. })
        ));

        let provider = Arc::new(MockEmbedder::failing("mock-primary", 8));
        let generator = EmbeddingGenerator::new(Some(provider), settings());
        assert!(matches!(
            generator.embed_query("rust").await,
            Err(AppError::SearchUnavailable { .. })
        ));
    }
}
