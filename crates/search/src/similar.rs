//! Nearest-neighbour search over stored vectors
//!
//! Two phases: the vector index resolves an id + distance list, then the
//! relational store hydrates display fields for those ids.

use folio_common::content::StoredEmbedding;
use folio_common::errors::Result;
use folio_common::store::DocumentSummary;
use folio_common::{ContentKind, ContentStore, ModelSpec};
use std::sync::Arc;
use tracing::debug;

/// Similarity search within one content kind
#[derive(Clone)]
pub struct SimilaritySearch {
    store: Arc<dyn ContentStore>,
}

impl SimilaritySearch {
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self { store }
    }

    /// Ids of the `k` visible records closest to record `id`, nearest
    /// first. A record that is missing or has no vector has no neighbours.
    pub async fn similar(&self, kind: ContentKind, id: i64, k: usize) -> Result<Vec<i64>> {
        let Some(record) = self.store.find(kind, id).await? else {
            debug!(kind = %kind, id, "Similarity source not found");
            return Ok(vec![]);
        };

        match &record.embedding {
            Some(embedding) => self.similar_to_vector(kind, id, embedding, k).await,
            None => {
                debug!(kind = %kind, id, "Similarity source has no vector");
                Ok(vec![])
            }
        }
    }

    /// Neighbours of an already loaded vector, excluding `id` itself.
    ///
    /// Only vectors of the same model and dimensions are compared.
    pub async fn similar_to_vector(
        &self,
        kind: ContentKind,
        id: i64,
        embedding: &StoredEmbedding,
        k: usize,
    ) -> Result<Vec<i64>> {
        if k == 0 || embedding.vector.is_empty() {
            return Ok(vec![]);
        }

        let model = ModelSpec::new(embedding.model.clone(), embedding.dimensions);
        let neighbors = self
            .store
            .nearest(kind, &embedding.vector, &model, Some(id), None, k)
            .await?;

        Ok(neighbors
            .into_iter()
            .map(|n| n.id)
            .filter(|neighbor| *neighbor != id)
            .collect())
    }

    /// [`similar`](Self::similar) followed by hydration
    pub async fn similar_documents(
        &self,
        kind: ContentKind,
        id: i64,
        k: usize,
    ) -> Result<Vec<DocumentSummary>> {
        let ids = self.similar(kind, id, k).await?;
        if ids.is_empty() {
            return Ok(vec![]);
        }
        self.store.hydrate(kind, &ids).await
    }
}
