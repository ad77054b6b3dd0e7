//! Hybrid retrieval
//!
//! Three independent strategies rank the same published document set:
//! - Semantic (ascending cosine distance to the query vector)
//! - Lexical (PostgreSQL full-text relevance)
//! - Fuzzy (trigram similarity)
//!
//! Their rank positions are fused with Reciprocal Rank Fusion.

mod fusion;
mod fuzzy;
mod hybrid;
mod lexical;
mod semantic;

pub use fusion::{FusedHit, RrfFusion};
pub use fuzzy::FuzzyRetriever;
pub use hybrid::{HybridSearch, SearchHit, SearchOutcome, EMPTY_QUERY_MESSAGE};
pub use lexical::LexicalRetriever;
pub use semantic::SemanticRetriever;

use folio_common::config::AppConfig;
use folio_common::errors::Result;
use folio_common::ContentKind;
use serde::{Deserialize, Serialize};

/// Retrieval strategy
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Semantic,
    Lexical,
    Fuzzy,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Semantic => "semantic",
            Strategy::Lexical => "lexical",
            Strategy::Fuzzy => "fuzzy",
        }
    }
}

/// Parameters shared by all strategies
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub kind: ContentKind,
    pub query: String,
    /// Provider-model query vector; required by the semantic strategy
    pub query_embedding: Option<Vec<f32>>,
    pub limit: usize,
}

/// Common trait for all retrievers
#[async_trait::async_trait]
pub trait Retriever: Send + Sync {
    /// Ids ranked best first, at most `request.limit`
    async fn retrieve(&self, request: &SearchRequest) -> Result<Vec<i64>>;

    fn strategy(&self) -> Strategy;
}

/// Retrieval constants threaded from configuration
#[derive(Debug, Clone)]
pub struct RetrievalSettings {
    pub kind: ContentKind,
    pub rrf_k: f64,
    pub default_limit: usize,
    pub max_limit: usize,
    pub semantic_max_distance: Option<f64>,
    pub fuzzy_threshold: f64,
    pub recommendation_count: usize,
}

impl RetrievalSettings {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let retrieval = &config.retrieval;
        Ok(Self {
            kind: ContentKind::parse(&retrieval.search_kind)?,
            rrf_k: retrieval.rrf_k,
            default_limit: retrieval.default_search_limit,
            max_limit: retrieval.max_search_limit,
            semantic_max_distance: retrieval.semantic_max_distance,
            fuzzy_threshold: retrieval.fuzzy_threshold,
            recommendation_count: retrieval.recommendation_count,
        })
    }

    /// Clamp a requested limit into `1..=max_limit`
    pub fn clamp_limit(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.default_limit)
            .clamp(1, self.max_limit.max(1))
    }
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            kind: ContentKind::Post,
            rrf_k: folio_common::DEFAULT_RRF_K,
            default_limit: 10,
            max_limit: 50,
            semantic_max_distance: Some(0.8),
            fuzzy_threshold: 0.3,
            recommendation_count: folio_common::DEFAULT_RECOMMENDATION_COUNT,
        }
    }
}
