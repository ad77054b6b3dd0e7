//! Semantic retrieval over stored vectors

use super::{Retriever, SearchRequest, Strategy};
use folio_common::errors::{AppError, Result};
use folio_common::{ContentStore, ModelSpec};
use std::sync::Arc;

/// Nearest neighbours of the query vector among records embedded with
/// the provider model
pub struct SemanticRetriever {
    store: Arc<dyn ContentStore>,
    model: ModelSpec,
    max_distance: Option<f64>,
}

impl SemanticRetriever {
    pub fn new(store: Arc<dyn ContentStore>, model: ModelSpec, max_distance: Option<f64>) -> Self {
        Self {
            store,
            model,
            max_distance,
        }
    }
}

#[async_trait::async_trait]
impl Retriever for SemanticRetriever {
    async fn retrieve(&self, request: &SearchRequest) -> Result<Vec<i64>> {
        let embedding = request
            .query_embedding
            .as_ref()
            .ok_or_else(|| AppError::Validation {
                message: "Semantic retrieval requires a query embedding".to_string(),
                field: None,
            })?;

        let neighbors = self
            .store
            .nearest(
                request.kind,
                embedding,
                &self.model,
                None,
                self.max_distance,
                request.limit,
            )
            .await?;

        Ok(neighbors.into_iter().map(|n| n.id).collect())
    }

    fn strategy(&self) -> Strategy {
        Strategy::Semantic
    }
}
