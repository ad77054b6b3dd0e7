//! In-memory [`ContentStore`] for tests and local development.
//!
//! Vector search is brute-force cosine distance. Lexical ranking counts
//! query-term occurrences in title and description (every term must
//! occur); fuzzy ranking uses [`super::trigram::similarity`].
//!
//! Each record carries a content revision bumped by edits. A sync
//! candidate is any record whose last embed or check happened at an
//! older revision, mirroring `updated_at` on the SQL side.

use super::{
    cosine_distance, trigram, CandidateFilter, ContentStore, DocumentSummary, EmbeddedVector,
    Neighbor,
};
use crate::content::{ContentKind, ContentRecord, PublicationState, StoredEmbedding};
use crate::embeddings::ModelSpec;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "in", "is", "it", "of", "on",
    "or", "the", "to", "with",
];

struct Entry {
    record: ContentRecord,
    revision: u64,
    checked_revision: Option<u64>,
}

/// In-memory store keyed by kind and id
pub struct InMemoryStore {
    entries: RwLock<BTreeMap<(ContentKind, i64), Entry>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
        }
    }

    /// Insert or replace a record. A record inserted with an embedding
    /// counts as checked at its current revision.
    pub async fn insert(&self, record: ContentRecord) {
        let checked_revision = record.embedding.as_ref().map(|_| 0);
        self.entries.write().await.insert(
            (record.kind, record.id),
            Entry {
                record,
                revision: 0,
                checked_revision,
            },
        );
    }

    /// Apply a content edit, bumping the revision and `updated_at`
    pub async fn edit<F>(&self, kind: ContentKind, id: i64, f: F) -> Result<()>
    where
        F: FnOnce(&mut ContentRecord),
    {
        let mut entries = self.entries.write().await;
        let entry = entries
            .get_mut(&(kind, id))
            .ok_or_else(|| not_found(kind, id))?;
        f(&mut entry.record);
        entry.record.updated_at = Utc::now();
        entry.revision += 1;
        Ok(())
    }

    pub async fn update_body(&self, kind: ContentKind, id: i64, body: serde_json::Value) -> Result<()> {
        self.edit(kind, id, |record| record.body = body).await
    }

    pub async fn set_status(&self, kind: ContentKind, id: i64, status: PublicationState) -> Result<()> {
        self.edit(kind, id, |record| record.status = status).await
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn not_found(kind: ContentKind, id: i64) -> AppError {
    AppError::DocumentNotFound {
        kind: kind.to_string(),
        id,
    }
}

fn summary(record: &ContentRecord) -> DocumentSummary {
    DocumentSummary {
        id: record.id,
        kind: record.kind,
        title: record.title.clone(),
        slug: record.slug.clone(),
        description: record.description.clone(),
        published_at: record.published_at,
    }
}

fn normalize_term(word: &str) -> String {
    let word = word.to_lowercase();
    match word.strip_suffix('s') {
        Some(stem) if stem.len() >= 3 => stem.to_string(),
        _ => word,
    }
}

fn terms(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(normalize_term)
        .collect()
}

fn searchable_text(record: &ContentRecord) -> String {
    format!(
        "{} {}",
        record.title,
        record.description.as_deref().unwrap_or_default()
    )
}

fn is_candidate(entry: &Entry, filter: &CandidateFilter) -> bool {
    if filter.force {
        return true;
    }
    match &entry.record.embedding {
        // Records with nothing to embed are checked, not saved
        None => entry.checked_revision != Some(entry.revision),
        Some(embedding) => {
            embedding.model != filter.canonical.name
                || embedding.dimensions != filter.canonical.dimensions
                || entry.checked_revision != Some(entry.revision)
                || filter
                    .expired_before
                    .is_some_and(|cutoff| embedding.generated_at < cutoff)
        }
    }
}

#[async_trait]
impl ContentStore for InMemoryStore {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn find(&self, kind: ContentKind, id: i64) -> Result<Option<ContentRecord>> {
        Ok(self
            .entries
            .read()
            .await
            .get(&(kind, id))
            .map(|entry| entry.record.clone()))
    }

    async fn embedding_candidates(
        &self,
        kind: ContentKind,
        filter: &CandidateFilter,
        limit: usize,
    ) -> Result<Vec<ContentRecord>> {
        let entries = self.entries.read().await;
        Ok(entries
            .range((kind, i64::MIN)..=(kind, i64::MAX))
            .map(|(_, entry)| entry)
            .filter(|entry| entry.record.status == PublicationState::Published)
            .filter(|entry| is_candidate(entry, filter))
            .take(limit)
            .map(|entry| entry.record.clone())
            .collect())
    }

    async fn save_embedding(
        &self,
        kind: ContentKind,
        id: i64,
        embedding: &StoredEmbedding,
    ) -> Result<()> {
        let mut entries = self.entries.write().await;
        let entry = entries
            .get_mut(&(kind, id))
            .ok_or_else(|| not_found(kind, id))?;
        entry.record.embedding = Some(embedding.clone());
        entry.checked_revision = Some(entry.revision);
        Ok(())
    }

    async fn mark_checked(&self, kind: ContentKind, id: i64) -> Result<()> {
        let mut entries = self.entries.write().await;
        let entry = entries
            .get_mut(&(kind, id))
            .ok_or_else(|| not_found(kind, id))?;
        entry.checked_revision = Some(entry.revision);
        Ok(())
    }

    async fn nearest(
        &self,
        kind: ContentKind,
        vector: &[f32],
        model: &ModelSpec,
        exclude: Option<i64>,
        max_distance: Option<f64>,
        limit: usize,
    ) -> Result<Vec<Neighbor>> {
        let now = Utc::now();
        let capability = kind.capability();
        let entries = self.entries.read().await;

        let mut neighbors: Vec<Neighbor> = entries
            .range((kind, i64::MIN)..=(kind, i64::MAX))
            .map(|(_, entry)| &entry.record)
            .filter(|record| Some(record.id) != exclude)
            .filter(|record| capability.is_visible(record, now))
            .filter_map(|record| {
                let embedding = record.embedding.as_ref()?;
                if embedding.model != model.name || embedding.dimensions != model.dimensions {
                    return None;
                }
                Some(Neighbor {
                    id: record.id,
                    distance: cosine_distance(vector, &embedding.vector),
                })
            })
            .filter(|n| max_distance.map_or(true, |max| n.distance <= max))
            .collect();

        neighbors.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(Ordering::Equal)
                .then(a.id.cmp(&b.id))
        });
        neighbors.truncate(limit);
        Ok(neighbors)
    }

    async fn hydrate(&self, kind: ContentKind, ids: &[i64]) -> Result<Vec<DocumentSummary>> {
        let now = Utc::now();
        let capability = kind.capability();
        let entries = self.entries.read().await;

        Ok(ids
            .iter()
            .filter_map(|id| entries.get(&(kind, *id)))
            .map(|entry| &entry.record)
            .filter(|record| capability.is_visible(record, now))
            .map(summary)
            .collect())
    }

    async fn set_recommendations(&self, kind: ContentKind, id: i64, ids: &[i64]) -> Result<()> {
        let mut entries = self.entries.write().await;
        let entry = entries
            .get_mut(&(kind, id))
            .ok_or_else(|| not_found(kind, id))?;
        entry.record.recommended_ids = ids.to_vec();
        Ok(())
    }

    async fn lexical_ranking(&self, kind: ContentKind, query: &str, limit: usize) -> Result<Vec<i64>> {
        let query_terms: Vec<String> = terms(query)
            .into_iter()
            .filter(|t| !STOP_WORDS.contains(&t.as_str()))
            .collect();
        if query_terms.is_empty() {
            return Ok(Vec::new());
        }

        let now = Utc::now();
        let capability = kind.capability();
        let entries = self.entries.read().await;

        let mut scored: Vec<(i64, usize)> = entries
            .range((kind, i64::MIN)..=(kind, i64::MAX))
            .map(|(_, entry)| &entry.record)
            .filter(|record| capability.is_visible(record, now))
            .filter_map(|record| {
                let words = terms(&searchable_text(record));
                let mut total = 0;
                for term in &query_terms {
                    let hits = words.iter().filter(|w| *w == term).count();
                    if hits == 0 {
                        return None;
                    }
                    total += hits;
                }
                Some((record.id, total))
            })
            .collect();

        scored.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        Ok(scored.into_iter().take(limit).map(|(id, _)| id).collect())
    }

    async fn fuzzy_ranking(
        &self,
        kind: ContentKind,
        query: &str,
        threshold: f64,
        limit: usize,
    ) -> Result<Vec<i64>> {
        let now = Utc::now();
        let capability = kind.capability();
        let entries = self.entries.read().await;

        let mut scored: Vec<(i64, f64)> = entries
            .range((kind, i64::MIN)..=(kind, i64::MAX))
            .map(|(_, entry)| &entry.record)
            .filter(|record| capability.is_visible(record, now))
            .map(|record| {
                let title = trigram::similarity(&record.title, query);
                let description = record
                    .description
                    .as_deref()
                    .map_or(0.0, |d| trigram::similarity(d, query));
                (record.id, title.max(description))
            })
            .filter(|(_, score)| *score >= threshold)
            .collect();

        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        Ok(scored.into_iter().take(limit).map(|(id, _)| id).collect())
    }

    async fn list_embedded(&self, kind: ContentKind, limit: usize) -> Result<Vec<EmbeddedVector>> {
        let now = Utc::now();
        let capability = kind.capability();
        let entries = self.entries.read().await;

        Ok(entries
            .range((kind, i64::MIN)..=(kind, i64::MAX))
            .map(|(_, entry)| &entry.record)
            .filter(|record| capability.is_visible(record, now))
            .filter_map(|record| {
                record.embedding.as_ref().map(|e| EmbeddedVector {
                    id: record.id,
                    vector: e.vector.clone(),
                    model: e.model.clone(),
                    dimensions: e.dimensions,
                })
            })
            .take(limit)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::KindDetails;
    use serde_json::json;

    fn post(id: i64, title: &str, description: Option<&str>) -> ContentRecord {
        ContentRecord {
            id,
            kind: ContentKind::Post,
            status: PublicationState::Published,
            title: title.to_string(),
            slug: format!("post-{id}"),
            description: description.map(String::from),
            body: json!(null),
            details: KindDetails::Post { tags: vec![] },
            published_at: None,
            updated_at: Utc::now(),
            embedding: None,
            recommended_ids: vec![],
        }
    }

    fn embedding(vector: Vec<f32>) -> StoredEmbedding {
        StoredEmbedding {
            dimensions: vector.len(),
            vector,
            model: "m".into(),
            text_hash: "h".into(),
            generated_at: Utc::now(),
        }
    }

    fn filter() -> CandidateFilter {
        CandidateFilter {
            canonical: ModelSpec::new("m", 2),
            force: false,
            expired_before: None,
        }
    }

    #[tokio::test]
    async fn test_candidates_follow_revisions() {
        let store = InMemoryStore::new();
        store.insert(post(1, "One", None)).await;

        assert_eq!(store.embedding_candidates(ContentKind::Post, &filter(), 10).await.unwrap().len(), 1);

        store.save_embedding(ContentKind::Post, 1, &embedding(vec![1.0, 0.0])).await.unwrap();
        assert!(store.embedding_candidates(ContentKind::Post, &filter(), 10).await.unwrap().is_empty());

        store.update_body(ContentKind::Post, 1, json!("changed")).await.unwrap();
        assert_eq!(store.embedding_candidates(ContentKind::Post, &filter(), 10).await.unwrap().len(), 1);

        store.mark_checked(ContentKind::Post, 1).await.unwrap();
        assert!(store.embedding_candidates(ContentKind::Post, &filter(), 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_nearest_orders_and_filters() {
        let store = InMemoryStore::new();
        for (id, v) in [(1, vec![1.0, 0.0]), (2, vec![0.0, 1.0]), (3, vec![1.0, 0.0]), (4, vec![0.9, 0.1])] {
            let mut record = post(id, "t", None);
            record.embedding = Some(embedding(v));
            store.insert(record).await;
        }
        store.set_status(ContentKind::Post, 3, PublicationState::Draft).await.unwrap();

        let hits = store
            .nearest(ContentKind::Post, &[1.0, 0.0], &ModelSpec::new("m", 2), Some(1), None, 10)
            .await
            .unwrap();
        let ids: Vec<i64> = hits.iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![4, 2]);

        let other_model = store
            .nearest(ContentKind::Post, &[1.0, 0.0], &ModelSpec::new("other", 2), None, None, 10)
            .await
            .unwrap();
        assert!(other_model.is_empty());
    }

    #[tokio::test]
    async fn test_lexical_requires_all_terms() {
        let store = InMemoryStore::new();
        store.insert(post(1, "Programming tutorials", None)).await;
        store.insert(post(2, "Programming in Rust", Some("A programming tutorial"))).await;
        store.insert(post(3, "Gardening tutorials", None)).await;

        let ids = store
            .lexical_ranking(ContentKind::Post, "programming tutorials", 10)
            .await
            .unwrap();
        assert_eq!(ids, vec![2, 1]);
    }

    #[tokio::test]
    async fn test_hydrate_keeps_order_and_drops_drafts() {
        let store = InMemoryStore::new();
        store.insert(post(1, "a", None)).await;
        store.insert(post(2, "b", None)).await;
        store.insert(post(3, "c", None)).await;
        store.set_status(ContentKind::Post, 2, PublicationState::Draft).await.unwrap();

        let docs = store.hydrate(ContentKind::Post, &[3, 2, 1, 99]).await.unwrap();
        let ids: Vec<i64> = docs.iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![3, 1]);
    }
}
