//! Precomputed "related content" lists

use crate::similar::SimilaritySearch;
use folio_common::content::StoredEmbedding;
use folio_common::errors::Result;
use folio_common::store::DocumentSummary;
use folio_common::{ContentKind, ContentStore};
use std::sync::Arc;
use tracing::{debug, info};

/// Computes and stores each record's nearest neighbours
#[derive(Clone)]
pub struct Recommender {
    similarity: SimilaritySearch,
    store: Arc<dyn ContentStore>,
    count: usize,
}

impl Recommender {
    pub fn new(store: Arc<dyn ContentStore>, count: usize) -> Self {
        Self {
            similarity: SimilaritySearch::new(store.clone()),
            store,
            count,
        }
    }

    pub fn similarity(&self) -> &SimilaritySearch {
        &self.similarity
    }

    /// Recompute neighbours from a freshly generated vector and persist
    /// them. Only `recommended_ids` is written, so the record is not
    /// considered edited and no re-embedding follows.
    pub async fn refresh(
        &self,
        kind: ContentKind,
        id: i64,
        embedding: &StoredEmbedding,
    ) -> Result<Vec<i64>> {
        let ids = self
            .similarity
            .similar_to_vector(kind, id, embedding, self.count)
            .await?;

        self.store.set_recommendations(kind, id, &ids).await?;
        info!(kind = %kind, id, recommended = ?ids, "Recommendations updated");
        Ok(ids)
    }

    /// Stored neighbours of a record, hydrated. Ids whose records were
    /// unpublished since precomputation are dropped.
    pub async fn recommendations(&self, kind: ContentKind, id: i64) -> Result<Vec<DocumentSummary>> {
        let Some(record) = self.store.find(kind, id).await? else {
            return Ok(vec![]);
        };

        let ids: Vec<i64> = record
            .recommended_ids
            .iter()
            .copied()
            .filter(|other| *other != id)
            .collect();
        if ids.is_empty() {
            return Ok(vec![]);
        }

        let documents = self.store.hydrate(kind, &ids).await?;
        if documents.len() < ids.len() {
            debug!(
                kind = %kind,
                id,
                dropped = ids.len() - documents.len(),
                "Dropped recommendations that are no longer visible"
            );
        }
        Ok(documents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use folio_common::content::{KindDetails, PublicationState};
    use folio_common::store::InMemoryStore;
    use folio_common::ContentRecord;

    fn note(id: i64, vector: Vec<f32>) -> ContentRecord {
        ContentRecord {
            id,
            kind: ContentKind::Note,
            status: PublicationState::Published,
            title: format!("Note {}", id),
            slug: format!("note-{}", id),
            description: None,
            body: serde_json::Value::Null,
            details: KindDetails::Note {
                quote_author: None,
                quote_source: None,
            },
            published_at: Some(Utc::now()),
            updated_at: Utc::now(),
            embedding: Some(StoredEmbedding {
                dimensions: vector.len(),
                vector,
                model: "test-model".into(),
                text_hash: "0000000000000000".into(),
                generated_at: Utc::now(),
            }),
            recommended_ids: vec![],
        }
    }

    #[tokio::test]
    async fn test_refresh_persists_neighbours() {
        let store = Arc::new(InMemoryStore::new());
        for (id, v) in [(1, [1.0, 0.0]), (2, [0.8, 0.2]), (3, [0.2, 0.8]), (4, [0.0, 1.0])] {
            store.insert(note(id, v.to_vec())).await;
        }

        let recommender = Recommender::new(store.clone(), 2);
        let source = store.find(ContentKind::Note, 1).await.unwrap().unwrap();
        let ids = recommender
            .refresh(ContentKind::Note, 1, source.embedding.as_ref().unwrap())
            .await
            .unwrap();
        assert_eq!(ids, vec![2, 3]);

        let stored = store.find(ContentKind::Note, 1).await.unwrap().unwrap();
        assert_eq!(stored.recommended_ids, vec![2, 3]);
        assert_eq!(stored.updated_at, source.updated_at);
    }

    #[tokio::test]
    async fn test_unpublished_recommendations_are_hidden() {
        let store = Arc::new(InMemoryStore::new());
        for (id, v) in [(1, [1.0, 0.0]), (2, [0.8, 0.2]), (3, [0.2, 0.8])] {
            store.insert(note(id, v.to_vec())).await;
        }

        let recommender = Recommender::new(store.clone(), 3);
        let source = store.find(ContentKind::Note, 1).await.unwrap().unwrap();
        recommender
            .refresh(ContentKind::Note, 1, source.embedding.as_ref().unwrap())
            .await
            .unwrap();

        store
            .set_status(ContentKind::Note, 2, PublicationState::Draft)
            .await
            .unwrap();

        let docs = recommender.recommendations(ContentKind::Note, 1).await.unwrap();
        let ids: Vec<i64> = docs.iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![3]);
    }
}
