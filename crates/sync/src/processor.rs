//! Single-record embedding processor
//!
//! Extracts text, hashes it, consults the staleness policy and, when the
//! stored vector cannot be reused, generates and stores a new one. The
//! record's recommendations are recomputed after every generation.

use chrono::Utc;
use folio_common::content::{text_hash, StoredEmbedding};
use folio_common::embeddings::EmbeddingSource;
use folio_common::errors::{AppError, Result};
use folio_common::staleness::StaleReason;
use folio_common::{ContentKind, ContentRecord, ContentStore, EmbeddingGenerator, StalenessPolicy};
use folio_search::Recommender;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// What processing did to a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshAction {
    Generated,
    Unchanged,
}

/// Result of processing one record
#[derive(Debug, Clone, Serialize)]
pub struct RefreshReport {
    pub kind: ContentKind,
    pub id: i64,
    pub action: RefreshAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<StaleReason>,
    pub model: String,
    pub dimensions: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<EmbeddingSource>,
    pub text_hash: String,
    pub recommended_ids: Vec<i64>,
}

/// Embeds one record at a time
pub struct EmbeddingProcessor {
    store: Arc<dyn ContentStore>,
    generator: EmbeddingGenerator,
    policy: StalenessPolicy,
    recommender: Recommender,
}

impl EmbeddingProcessor {
    pub fn new(
        store: Arc<dyn ContentStore>,
        generator: EmbeddingGenerator,
        policy: StalenessPolicy,
        recommendation_count: usize,
    ) -> Self {
        Self {
            recommender: Recommender::new(store.clone(), recommendation_count),
            store,
            generator,
            policy,
        }
    }

    pub fn store(&self) -> &Arc<dyn ContentStore> {
        &self.store
    }

    pub fn generator(&self) -> &EmbeddingGenerator {
        &self.generator
    }

    pub fn policy(&self) -> &StalenessPolicy {
        &self.policy
    }

    /// Targeted path: load the record and embed it if stale (or `force`)
    #[instrument(skip(self, kind), fields(kind = %kind))]
    pub async fn refresh(&self, kind: ContentKind, id: i64, force: bool) -> Result<RefreshReport> {
        let record = self
            .store
            .find(kind, id)
            .await?
            .ok_or_else(|| AppError::DocumentNotFound {
                kind: kind.to_string(),
                id,
            })?;

        self.process(&record, force, false).await
    }

    /// Embed an already loaded record.
    ///
    /// Empty extracted text is [`AppError::EmptyContent`]; the record is
    /// only marked checked so later passes skip it until it is edited. The
    /// vector is stored in a single write once complete.
    ///
    /// With `refresh_expired`, a current vector older than the refresh
    /// interval is regenerated too.
    #[instrument(skip(self, record), fields(kind = %record.kind, id = record.id))]
    pub async fn process(
        &self,
        record: &ContentRecord,
        force: bool,
        refresh_expired: bool,
    ) -> Result<RefreshReport> {
        let text = record.source_text();
        if text.trim().is_empty() {
            self.store.mark_checked(record.kind, record.id).await?;
            return Err(AppError::EmptyContent {
                kind: record.kind.to_string(),
                id: record.id,
            });
        }

        let hash = text_hash(&text);
        let reason = self
            .policy
            .stale_reason(record.embedding.as_ref(), &hash)
            .or_else(|| {
                (refresh_expired && self.policy.is_expired(record, Utc::now()))
                    .then_some(StaleReason::Expired)
            });

        if !force {
            if let (None, Some(stored)) = (reason, &record.embedding) {
                self.store.mark_checked(record.kind, record.id).await?;
                debug!("Stored vector is current");
                return Ok(RefreshReport {
                    kind: record.kind,
                    id: record.id,
                    action: RefreshAction::Unchanged,
                    reason: None,
                    model: stored.model.clone(),
                    dimensions: stored.dimensions,
                    source: None,
                    text_hash: hash,
                    recommended_ids: record.recommended_ids.clone(),
                });
            }
        }

        let generated = self.generator.generate(&text).await;
        let source = generated.source;
        let embedding = StoredEmbedding {
            dimensions: generated.dimensions,
            vector: generated.vector,
            model: generated.model,
            text_hash: hash,
            generated_at: Utc::now(),
        };

        self.store
            .save_embedding(record.kind, record.id, &embedding)
            .await?;

        info!(
            model = %embedding.model,
            dimensions = embedding.dimensions,
            source = source.as_str(),
            reason = ?reason,
            "Embedding stored"
        );

        let recommended_ids = match self
            .recommender
            .refresh(record.kind, record.id, &embedding)
            .await
        {
            Ok(ids) => ids,
            Err(e) => {
                // The vector is already stored; stale recommendations are
                // rebuilt on the next generation
                warn!(error = %e, "Failed to update recommendations");
                record.recommended_ids.clone()
            }
        };

        Ok(RefreshReport {
            kind: record.kind,
            id: record.id,
            action: RefreshAction::Generated,
            reason,
            model: embedding.model,
            dimensions: embedding.dimensions,
            source: Some(source),
            text_hash: embedding.text_hash,
            recommended_ids,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use folio_common::content::{KindDetails, PublicationState};
    use folio_common::embeddings::{EmbeddingSettings, MockEmbedder};
    use folio_common::store::InMemoryStore;
    use serde_json::json;

    fn note(id: i64, title: &str) -> ContentRecord {
        ContentRecord {
            id,
            kind: ContentKind::Note,
            status: PublicationState::Published,
            title: title.to_string(),
            slug: format!("note-{}", id),
            description: None,
            body: json!(null),
            details: KindDetails::Note {
                quote_author: None,
                quote_source: None,
            },
            published_at: Some(Utc::now()),
            updated_at: Utc::now(),
            embedding: None,
            recommended_ids: vec![],
        }
    }

    fn processor(store: Arc<InMemoryStore>, generator: EmbeddingGenerator) -> EmbeddingProcessor {
        let policy = StalenessPolicy::new(generator.canonical_model(), Duration::days(7));
        EmbeddingProcessor::new(store, generator, policy, 3)
    }

    #[tokio::test]
    async fn test_generates_then_reuses() {
        let store = Arc::new(InMemoryStore::new());
        store.insert(note(1, "Hello world")).await;
        let generator = EmbeddingGenerator::new(None, EmbeddingSettings::default());
        let processor = processor(store.clone(), generator);

        let first = processor.refresh(ContentKind::Note, 1, false).await.unwrap();
        assert_eq!(first.action, RefreshAction::Generated);
        assert_eq!(first.reason, Some(StaleReason::Missing));
        assert_eq!(first.dimensions, 384);
        assert_eq!(first.source, Some(EmbeddingSource::Fallback));

        let second = processor.refresh(ContentKind::Note, 1, false).await.unwrap();
        assert_eq!(second.action, RefreshAction::Unchanged);

        let forced = processor.refresh(ContentKind::Note, 1, true).await.unwrap();
        assert_eq!(forced.action, RefreshAction::Generated);
    }

    #[tokio::test]
    async fn test_provider_outage_stores_fallback() {
        let store = Arc::new(InMemoryStore::new());
        store.insert(note(1, "Hello world")).await;
        let generator = EmbeddingGenerator::new(
            Some(Arc::new(MockEmbedder::failing("primary", 8))),
            EmbeddingSettings::default(),
        );
        let processor = processor(store.clone(), generator);

        let report = processor.refresh(ContentKind::Note, 1, false).await.unwrap();
        assert_eq!(report.source, Some(EmbeddingSource::Fallback));

        let stored = store.find(ContentKind::Note, 1).await.unwrap().unwrap();
        let embedding = stored.embedding.unwrap();
        assert_eq!(embedding.vector.len(), embedding.dimensions);
        assert_ne!(embedding.model, "primary");
    }

    #[tokio::test]
    async fn test_empty_text_is_not_embedded() {
        let store = Arc::new(InMemoryStore::new());
        store.insert(note(1, "   ")).await;
        let generator = EmbeddingGenerator::new(None, EmbeddingSettings::default());
        let processor = processor(store.clone(), generator);

        let err = processor.refresh(ContentKind::Note, 1, true).await.unwrap_err();
        assert!(matches!(err, AppError::EmptyContent { .. }));
        let stored = store.find(ContentKind::Note, 1).await.unwrap().unwrap();
        assert!(stored.embedding.is_none());
    }

    #[tokio::test]
    async fn test_empty_text_is_marked_checked() {
        let store = Arc::new(InMemoryStore::new());
        store.insert(note(1, "")).await;
        let generator = EmbeddingGenerator::new(None, EmbeddingSettings::default());
        let processor = processor(store.clone(), generator);
        let filter = processor.policy().candidate_filter(false, false, Utc::now());

        let record = store.find(ContentKind::Note, 1).await.unwrap().unwrap();
        assert!(processor.process(&record, false, false).await.is_err());
        let candidates = store
            .embedding_candidates(ContentKind::Note, &filter, 10)
            .await
            .unwrap();
        assert!(candidates.is_empty());
    }

    #[tokio::test]
    async fn test_expired_vector_regenerates_only_when_asked() {
        let store = Arc::new(InMemoryStore::new());
        store.insert(note(1, "Hello world")).await;
        let generator = EmbeddingGenerator::new(None, EmbeddingSettings::default());
        let processor = processor(store.clone(), generator);
        processor.refresh(ContentKind::Note, 1, false).await.unwrap();

        let mut record = store.find(ContentKind::Note, 1).await.unwrap().unwrap();
        if let Some(embedding) = record.embedding.as_mut() {
            embedding.generated_at = Utc::now() - Duration::days(30);
        }

        let kept = processor.process(&record, false, false).await.unwrap();
        assert_eq!(kept.action, RefreshAction::Unchanged);

        let renewed = processor.process(&record, false, true).await.unwrap();
        assert_eq!(renewed.action, RefreshAction::Generated);
        assert_eq!(renewed.reason, Some(StaleReason::Expired));
    }

    #[tokio::test]
    async fn test_missing_record() {
        let store = Arc::new(InMemoryStore::new());
        let generator = EmbeddingGenerator::new(None, EmbeddingSettings::default());
        let processor = processor(store, generator);

        let err = processor.refresh(ContentKind::Post, 9, false).await.unwrap_err();
        assert!(matches!(err, AppError::DocumentNotFound { id: 9, .. }));
    }
}
