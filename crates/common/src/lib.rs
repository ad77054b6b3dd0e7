//! Folio Common Library
//!
//! Shared code for the folio retrieval services including:
//! - Content model, text extraction and change hashing
//! - Embedding generation (provider client + deterministic fallback)
//! - Staleness policy
//! - Content store abstraction (PostgreSQL and in-memory)
//! - Error types, configuration, authentication, caching and metrics

pub mod auth;
pub mod cache;
pub mod config;
pub mod content;
pub mod db;
pub mod embeddings;
pub mod errors;
pub mod metrics;
pub mod staleness;
pub mod store;

// Re-export commonly used types
pub use config::AppConfig;
pub use content::{ContentKind, ContentRecord};
pub use embeddings::{EmbeddingGenerator, EmbeddingSettings, ModelSpec};
pub use errors::{AppError, Result};
pub use staleness::StalenessPolicy;
pub use store::ContentStore;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default primary embedding model
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// Default primary embedding dimension
pub const DEFAULT_EMBEDDING_DIMENSION: usize = 1536;

/// Model tag stored with vectors produced by the hash fallback
pub const FALLBACK_EMBEDDING_MODEL: &str = "folio-sha256-fallback-v1";

/// Dimension of fallback vectors
pub const FALLBACK_EMBEDDING_DIMENSION: usize = 384;

/// Reciprocal Rank Fusion smoothing constant
pub const DEFAULT_RRF_K: f64 = 60.0;

/// Number of neighbours precomputed onto each record
pub const DEFAULT_RECOMMENDATION_COUNT: usize = 3;
