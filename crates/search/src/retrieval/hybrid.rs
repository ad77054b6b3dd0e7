//! Hybrid retrieval combining semantic, lexical and fuzzy search
//!
//! Uses RRF fusion over the three rankings, then hydrates display fields

use super::{
    fusion::RrfFusion, fuzzy::FuzzyRetriever, lexical::LexicalRetriever,
    semantic::SemanticRetriever, RetrievalSettings, Retriever, SearchRequest,
};
use chrono::{DateTime, Utc};
use folio_common::cache::{keys, Cache};
use folio_common::content::text_hash;
use folio_common::errors::Result;
use folio_common::{metrics, ContentStore, EmbeddingGenerator};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Message returned alongside an empty result set for a blank query
pub const EMPTY_QUERY_MESSAGE: &str = "Provide a search query with the q parameter";

/// One fused search result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub semantic_rank: Option<usize>,
    pub fts_rank: Option<usize>,
    pub fuzzy_rank: Option<usize>,
    pub combined_score: f64,
}

/// Search response body
#[derive(Debug, Clone, Serialize)]
pub struct SearchOutcome {
    pub query: String,
    pub results: Vec<SearchHit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub query_time_ms: u64,
}

/// Hybrid query ranker over the configured searchable kind
pub struct HybridSearch {
    store: Arc<dyn ContentStore>,
    generator: EmbeddingGenerator,
    cache: Option<Arc<Cache>>,
    settings: RetrievalSettings,
    fusion: RrfFusion,
    semantic: SemanticRetriever,
    lexical: LexicalRetriever,
    fuzzy: FuzzyRetriever,
}

impl HybridSearch {
    pub fn new(
        store: Arc<dyn ContentStore>,
        generator: EmbeddingGenerator,
        cache: Option<Arc<Cache>>,
        settings: RetrievalSettings,
    ) -> Self {
        // Stored vectors are only comparable with the provider model's
        let semantic = SemanticRetriever::new(
            store.clone(),
            generator.primary_model(),
            settings.semantic_max_distance,
        );
        let lexical = LexicalRetriever::new(store.clone());
        let fuzzy = FuzzyRetriever::new(store.clone(), settings.fuzzy_threshold);

        Self {
            store,
            generator,
            cache,
            fusion: RrfFusion::new(settings.rrf_k),
            settings,
            semantic,
            lexical,
            fuzzy,
        }
    }

    pub fn settings(&self) -> &RetrievalSettings {
        &self.settings
    }

    /// Run the three strategies and fuse their rankings.
    ///
    /// A blank query yields an empty result with a message. A query that
    /// cannot be embedded with the provider is `SearchUnavailable`.
    pub async fn search(&self, query: &str, limit: Option<usize>) -> Result<SearchOutcome> {
        let start = Instant::now();
        let query = query.trim();
        let limit = self.settings.clamp_limit(limit);

        if query.is_empty() {
            return Ok(SearchOutcome {
                query: String::new(),
                results: vec![],
                message: Some(EMPTY_QUERY_MESSAGE.to_string()),
                query_time_ms: start.elapsed().as_millis() as u64,
            });
        }

        let query_embedding = self.query_embedding(query).await?;

        let request = SearchRequest {
            kind: self.settings.kind,
            query: query.to_string(),
            query_embedding: Some(query_embedding),
            limit,
        };

        let (semantic, lexical, fuzzy) = tokio::try_join!(
            self.semantic.retrieve(&request),
            self.lexical.retrieve(&request),
            self.fuzzy.retrieve(&request),
        )?;

        let rankings = [
            (self.semantic.strategy(), semantic),
            (self.lexical.strategy(), lexical),
            (self.fuzzy.strategy(), fuzzy),
        ];
        for (strategy, ids) in &rankings {
            debug!(strategy = strategy.as_str(), count = ids.len(), "Strategy ranking");
        }

        let fused = self.fusion.fuse(&rankings, limit);
        let ids: Vec<i64> = fused.iter().map(|hit| hit.id).collect();
        let summaries = self.store.hydrate(self.settings.kind, &ids).await?;
        let mut by_id: HashMap<i64, _> = summaries.into_iter().map(|s| (s.id, s)).collect();

        let results: Vec<SearchHit> = fused
            .into_iter()
            .filter_map(|hit| {
                let summary = by_id.remove(&hit.id)?;
                Some(SearchHit {
                    id: hit.id,
                    title: summary.title,
                    slug: summary.slug,
                    description: summary.description,
                    published_at: summary.published_at,
                    semantic_rank: hit.semantic_rank,
                    fts_rank: hit.fts_rank,
                    fuzzy_rank: hit.fuzzy_rank,
                    combined_score: hit.score,
                })
            })
            .collect();

        let elapsed = start.elapsed();
        metrics::record_search(elapsed.as_secs_f64(), "hybrid", results.len());

        Ok(SearchOutcome {
            query: query.to_string(),
            results,
            message: None,
            query_time_ms: elapsed.as_millis() as u64,
        })
    }

    /// Provider-model query vector, served from Redis when cached
    async fn query_embedding(&self, query: &str) -> Result<Vec<f32>> {
        if !self.generator.has_provider() {
            return self.generator.embed_query(query).await;
        }

        let model = self.generator.primary_model();
        let key = keys::query_embedding(&model.name, &text_hash(query));

        if let Some(cache) = &self.cache {
            match cache.get::<Vec<f32>>(&key).await {
                Ok(Some(vector)) if vector.len() == model.dimensions => {
                    metrics::record_cache(true, "query_embedding");
                    return Ok(vector);
                }
                Ok(_) => metrics::record_cache(false, "query_embedding"),
                Err(e) => warn!(error = %e, "Query embedding cache read failed"),
            }
        }

        let vector = self.generator.embed_query(query).await?;

        if let Some(cache) = &self.cache {
            if let Err(e) = cache.set(&key, &vector).await {
                warn!(error = %e, "Query embedding cache write failed");
            }
        }

        Ok(vector)
    }
}
