//! Configuration management for folio services
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config/default.toml, config/{APP_ENV}.toml)
//! - Default values

use crate::embeddings::EmbeddingSettings;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Redis configuration (query embedding cache)
    #[serde(default)]
    pub redis: RedisConfig,

    /// Embedding provider configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Authentication configuration
    #[serde(default)]
    pub auth: AuthConfig,

    /// Retrieval tuning
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Timeout for read endpoints in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Timeout for regenerate/sync endpoints in seconds
    #[serde(default = "default_admin_timeout")]
    pub admin_timeout_secs: u64,

    /// Shutdown timeout in seconds
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Primary database URL (for writes)
    pub url: String,

    /// Read replica URL (optional, falls back to primary)
    pub read_url: Option<String>,

    /// Maximum number of connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum number of connections
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Idle timeout in seconds
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RedisConfig {
    /// Redis URL; caching is disabled when unset
    pub url: Option<String>,

    /// TTL for cached query embeddings in seconds
    #[serde(default = "default_redis_ttl")]
    pub query_embedding_ttl_secs: u64,

    /// Key prefix for namespacing
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmbeddingConfig {
    /// Embedding provider: openai, none
    #[serde(default = "default_embedding_provider")]
    pub provider: String,

    /// API key for embedding service
    pub api_key: Option<String>,

    /// API base URL (for custom endpoints)
    pub api_base: Option<String>,

    /// Primary model
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Primary model dimension
    #[serde(default = "default_embedding_dimension")]
    pub dimension: usize,

    /// Model tag for hash fallback vectors
    #[serde(default = "default_fallback_model")]
    pub fallback_model: String,

    /// Fallback vector dimension
    #[serde(default = "default_fallback_dimension")]
    pub fallback_dimension: usize,

    /// Request timeout in seconds
    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,

    /// Total time spent retrying transient provider failures
    #[serde(default = "default_retry_budget")]
    pub retry_budget_secs: u64,

    /// Input is truncated to this many characters before submission
    #[serde(default = "default_max_input_chars")]
    pub max_input_chars: usize,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AuthConfig {
    /// HS256 secret for administrative session tokens
    pub jwt_secret: Option<String>,

    /// Shared secret accepted for sync/regenerate calls
    pub sync_secret: Option<String>,

    /// JWT expiration in seconds
    #[serde(default = "default_jwt_expiration")]
    pub jwt_expiration_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetrievalConfig {
    /// Reciprocal Rank Fusion constant
    #[serde(default = "default_rrf_k")]
    pub rrf_k: f64,

    /// Neighbours stored per record
    #[serde(default = "default_recommendation_count")]
    pub recommendation_count: usize,

    /// Search limit when none is given
    #[serde(default = "default_search_limit")]
    pub default_search_limit: usize,

    /// Upper bound for search limit
    #[serde(default = "default_max_search_limit")]
    pub max_search_limit: usize,

    /// Per-kind sync cap when none is given
    #[serde(default = "default_sync_limit")]
    pub default_sync_limit: usize,

    /// Upper bound for per-kind sync cap
    #[serde(default = "default_max_sync_limit")]
    pub max_sync_limit: usize,

    /// Semantic hits further than this cosine distance are dropped from hybrid search
    #[serde(default = "default_semantic_max_distance")]
    pub semantic_max_distance: Option<f64>,

    /// Minimum trigram similarity for fuzzy matches
    #[serde(default = "default_fuzzy_threshold")]
    pub fuzzy_threshold: f64,

    /// Age after which the background path re-embeds records
    #[serde(default = "default_refresh_after_days")]
    pub refresh_after_days: i64,

    /// Collection searched by the hybrid ranker
    #[serde(default = "default_search_kind")]
    pub search_kind: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log filter (tracing EnvFilter syntax)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Metrics port (0 to disable)
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,

    /// Service name for logs
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    /// Requests per second across public read routes
    #[serde(default = "default_rate_limit")]
    pub requests_per_second: u32,

    /// Burst capacity
    #[serde(default = "default_burst")]
    pub burst: u32,

    /// Enable rate limiting
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_request_timeout() -> u64 { 15 }
fn default_admin_timeout() -> u64 { 300 }
fn default_shutdown_timeout() -> u64 { 30 }
fn default_max_connections() -> u32 { 10 }
fn default_min_connections() -> u32 { 1 }
fn default_connect_timeout() -> u64 { 10 }
fn default_idle_timeout() -> u64 { 300 }
fn default_redis_ttl() -> u64 { 86_400 }
fn default_key_prefix() -> String { "folio".to_string() }
fn default_embedding_provider() -> String { "openai".to_string() }
fn default_embedding_model() -> String { crate::DEFAULT_EMBEDDING_MODEL.to_string() }
fn default_embedding_dimension() -> usize { crate::DEFAULT_EMBEDDING_DIMENSION }
fn default_fallback_model() -> String { crate::FALLBACK_EMBEDDING_MODEL.to_string() }
fn default_fallback_dimension() -> usize { crate::FALLBACK_EMBEDDING_DIMENSION }
fn default_embedding_timeout() -> u64 { 30 }
fn default_retry_budget() -> u64 { 20 }
fn default_max_input_chars() -> usize { 8000 }
fn default_jwt_expiration() -> u64 { 3600 }
fn default_rrf_k() -> f64 { crate::DEFAULT_RRF_K }
fn default_recommendation_count() -> usize { crate::DEFAULT_RECOMMENDATION_COUNT }
fn default_search_limit() -> usize { 10 }
fn default_max_search_limit() -> usize { 50 }
fn default_sync_limit() -> usize { 50 }
fn default_max_sync_limit() -> usize { 500 }
fn default_semantic_max_distance() -> Option<f64> { Some(0.8) }
fn default_fuzzy_threshold() -> f64 { 0.3 }
fn default_refresh_after_days() -> i64 { 7 }
fn default_search_kind() -> String { "posts".to_string() }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }
fn default_metrics_port() -> u16 { 9090 }
fn default_service_name() -> String { "folio".to_string() }
fn default_rate_limit() -> u32 { 20 }
fn default_burst() -> u32 { 40 }
fn default_enabled() -> bool { true }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
            admin_timeout_secs: default_admin_timeout(),
            shutdown_timeout_secs: default_shutdown_timeout(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            api_key: None,
            api_base: None,
            model: default_embedding_model(),
            dimension: default_embedding_dimension(),
            fallback_model: default_fallback_model(),
            fallback_dimension: default_fallback_dimension(),
            timeout_secs: default_embedding_timeout(),
            retry_budget_secs: default_retry_budget(),
            max_input_chars: default_max_input_chars(),
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            rrf_k: default_rrf_k(),
            recommendation_count: default_recommendation_count(),
            default_search_limit: default_search_limit(),
            max_search_limit: default_max_search_limit(),
            default_sync_limit: default_sync_limit(),
            max_sync_limit: default_max_sync_limit(),
            semantic_max_distance: default_semantic_max_distance(),
            fuzzy_threshold: default_fuzzy_threshold(),
            refresh_after_days: default_refresh_after_days(),
            search_kind: default_search_kind(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_json_logging(),
            metrics_port: default_metrics_port(),
            service_name: default_service_name(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: default_rate_limit(),
            burst: default_burst(),
            enabled: default_enabled(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            .set_default("database.url", "postgres://localhost/folio")?
            // Load base config file
            .add_source(File::with_name("config/default").required(false))
            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            // Load local overrides
            .add_source(File::with_name("config/local").required(false))
            // e.g., APP__EMBEDDING__API_KEY=sk-...
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load from a specific TOML file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Timeout applied to public read routes
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }

    /// Timeout applied to regenerate and sync routes
    pub fn admin_timeout(&self) -> Duration {
        Duration::from_secs(self.server.admin_timeout_secs)
    }

    /// Age after which the background path refreshes vectors
    pub fn refresh_after(&self) -> chrono::Duration {
        chrono::Duration::days(self.retrieval.refresh_after_days)
    }

    /// Get the read database URL (falls back to primary)
    pub fn read_database_url(&self) -> &str {
        self.database.read_url.as_deref().unwrap_or(&self.database.url)
    }

    /// Whether a remote embedding provider is configured
    pub fn provider_enabled(&self) -> bool {
        self.embedding.provider == "openai" && self.embedding.api_key.is_some()
    }

    /// Embedding constants threaded into the generator and staleness policy
    pub fn embedding_settings(&self) -> EmbeddingSettings {
        EmbeddingSettings {
            model: self.embedding.model.clone(),
            dimensions: self.embedding.dimension,
            fallback_model: self.embedding.fallback_model.clone(),
            fallback_dimensions: self.embedding.fallback_dimension,
            max_input_chars: self.embedding.max_input_chars,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig {
                url: "postgres://localhost/folio".to_string(),
                read_url: None,
                max_connections: default_max_connections(),
                min_connections: default_min_connections(),
                connect_timeout_secs: default_connect_timeout(),
                idle_timeout_secs: default_idle_timeout(),
            },
            redis: RedisConfig {
                url: None,
                query_embedding_ttl_secs: default_redis_ttl(),
                key_prefix: default_key_prefix(),
            },
            embedding: EmbeddingConfig::default(),
            auth: AuthConfig {
                jwt_secret: None,
                sync_secret: None,
                jwt_expiration_secs: default_jwt_expiration(),
            },
            retrieval: RetrievalConfig::default(),
            observability: ObservabilityConfig::default(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.embedding.model, "text-embedding-3-small");
        assert_eq!(config.embedding.dimension, 1536);
        assert_eq!(config.embedding.fallback_dimension, 384);
        assert_eq!(config.retrieval.rrf_k, 60.0);
    }

    #[test]
    fn test_read_database_fallback() {
        let config = AppConfig::default();
        assert_eq!(config.read_database_url(), "postgres://localhost/folio");
    }

    #[test]
    fn test_provider_requires_key() {
        let mut config = AppConfig::default();
        assert!(!config.provider_enabled());

        config.embedding.api_key = Some("sk-test".into());
        assert!(config.provider_enabled());

        config.embedding.provider = "none".into();
        assert!(!config.provider_enabled());
    }

    #[test]
    fn test_embedding_settings_threaded() {
        let mut config = AppConfig::default();
        config.embedding.dimension = 3072;
        config.embedding.model = "text-embedding-3-large".into();

        let settings = config.embedding_settings();
        assert_eq!(settings.model, "text-embedding-3-large");
        assert_eq!(settings.dimensions, 3072);
        assert_eq!(settings.fallback_dimensions, 384);
    }
}
