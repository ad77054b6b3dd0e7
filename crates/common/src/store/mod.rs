//! Storage abstraction for content records and their vectors
//!
//! `ContentStore` is implemented by the PostgreSQL repository
//! ([`crate::db::Repository`]) and by [`InMemoryStore`] for tests and
//! local development.

mod memory;
pub mod trigram;

pub use memory::InMemoryStore;

use crate::content::{ContentKind, ContentRecord, StoredEmbedding};
use crate::embeddings::ModelSpec;
use crate::errors::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Coarse candidate selection for a sync pass
#[derive(Debug, Clone)]
pub struct CandidateFilter {
    /// Model stored vectors must carry
    pub canonical: ModelSpec,
    /// Select every published record regardless of state
    pub force: bool,
    /// Also select vectors generated before this instant
    pub expired_before: Option<DateTime<Utc>>,
}

/// One hit from a vector index query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub id: i64,
    /// Cosine distance, smaller is closer
    pub distance: f64,
}

/// Display fields returned to readers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub id: i64,
    pub kind: ContentKind,
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
}

/// A precomputed vector listed by bulk reads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddedVector {
    pub id: i64,
    pub vector: Vec<f32>,
    pub model: String,
    pub dimensions: usize,
}

/// Persistence used by the embedding pipeline and retrieval
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Check connectivity
    async fn ping(&self) -> Result<()>;

    /// Load one record, whatever its publication state
    async fn find(&self, kind: ContentKind, id: i64) -> Result<Option<ContentRecord>>;

    /// Published records that may need (re)embedding, ascending by id
    async fn embedding_candidates(
        &self,
        kind: ContentKind,
        filter: &CandidateFilter,
        limit: usize,
    ) -> Result<Vec<ContentRecord>>;

    /// Persist a complete vector with its metadata in one write
    async fn save_embedding(
        &self,
        kind: ContentKind,
        id: i64,
        embedding: &StoredEmbedding,
    ) -> Result<()>;

    /// Record that the stored vector was verified against the current text
    async fn mark_checked(&self, kind: ContentKind, id: i64) -> Result<()>;

    /// Visible records closest to `vector` among those embedded with
    /// `model`, ascending by distance then id
    async fn nearest(
        &self,
        kind: ContentKind,
        vector: &[f32],
        model: &ModelSpec,
        exclude: Option<i64>,
        max_distance: Option<f64>,
        limit: usize,
    ) -> Result<Vec<Neighbor>>;

    /// Display fields for `ids`, in the given order; ids that are missing
    /// or not visible are dropped
    async fn hydrate(&self, kind: ContentKind, ids: &[i64]) -> Result<Vec<DocumentSummary>>;

    /// Replace the precomputed neighbour list. Touches nothing else.
    async fn set_recommendations(&self, kind: ContentKind, id: i64, ids: &[i64]) -> Result<()>;

    /// Full-text ranking over title and description
    async fn lexical_ranking(&self, kind: ContentKind, query: &str, limit: usize) -> Result<Vec<i64>>;

    /// Trigram similarity ranking over title and description
    async fn fuzzy_ranking(
        &self,
        kind: ContentKind,
        query: &str,
        threshold: f64,
        limit: usize,
    ) -> Result<Vec<i64>>;

    /// Stored vectors of visible records, ascending by id
    async fn list_embedded(&self, kind: ContentKind, limit: usize) -> Result<Vec<EmbeddedVector>>;
}

/// Cosine distance (1 - cosine similarity). Zero-length vectors are
/// maximally distant.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 2.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    1.0 - dot / (norm_a.sqrt() * norm_b.sqrt())
}
