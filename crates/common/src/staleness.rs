//! Staleness policy
//!
//! Decides whether a record's stored vector must be (re)computed. The
//! canonical model is passed in at construction; see
//! [`crate::EmbeddingGenerator::canonical_model`].

use crate::content::{ContentRecord, StoredEmbedding};
use crate::embeddings::ModelSpec;
use crate::store::CandidateFilter;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

/// Why a stored vector is stale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StaleReason {
    /// No vector stored
    Missing,
    /// Extracted text changed since the last embed
    TextChanged,
    /// Stored under a different model
    ModelChanged,
    /// Dimensions differ from the canonical value, or from the vector length
    DimensionDrift,
    /// Current, but generated before the refresh interval
    Expired,
}

#[derive(Debug, Clone)]
pub struct StalenessPolicy {
    canonical: ModelSpec,
    refresh_after: Duration,
}

impl StalenessPolicy {
    pub fn new(canonical: ModelSpec, refresh_after: Duration) -> Self {
        Self {
            canonical,
            refresh_after,
        }
    }

    pub fn canonical(&self) -> &ModelSpec {
        &self.canonical
    }

    /// First reason the stored vector cannot be reused, if any
    pub fn stale_reason(&self, stored: Option<&StoredEmbedding>, fresh_hash: &str) -> Option<StaleReason> {
        let Some(stored) = stored else {
            return Some(StaleReason::Missing);
        };

        if stored.dimensions != self.canonical.dimensions || stored.vector.len() != stored.dimensions {
            return Some(StaleReason::DimensionDrift);
        }
        if stored.model != self.canonical.name {
            return Some(StaleReason::ModelChanged);
        }
        if stored.text_hash != fresh_hash {
            return Some(StaleReason::TextChanged);
        }
        None
    }

    /// Whether `record` needs a new vector for text hashing to `fresh_hash`
    pub fn is_stale(&self, record: &ContentRecord, fresh_hash: &str) -> bool {
        self.stale_reason(record.embedding.as_ref(), fresh_hash).is_some()
    }

    /// Generation time before which vectors are refreshed by the
    /// background path
    pub fn expiry_cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - self.refresh_after
    }

    /// Time-based trigger; independent of [`is_stale`](Self::is_stale)
    pub fn is_expired(&self, record: &ContentRecord, now: DateTime<Utc>) -> bool {
        record
            .embedding
            .as_ref()
            .is_some_and(|e| e.generated_at < self.expiry_cutoff(now))
    }

    /// Store prefilter matching this policy
    pub fn candidate_filter(&self, force: bool, refresh_expired: bool, now: DateTime<Utc>) -> CandidateFilter {
        CandidateFilter {
            canonical: self.canonical.clone(),
            force,
            expired_before: refresh_expired.then(|| self.expiry_cutoff(now)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{ContentKind, KindDetails, PublicationState};
    use serde_json::json;

    fn policy() -> StalenessPolicy {
        StalenessPolicy::new(ModelSpec::new("model-a", 3), Duration::days(7))
    }

    fn stored(model: &str, vector: Vec<f32>, hash: &str) -> StoredEmbedding {
        StoredEmbedding {
            dimensions: 3,
            vector,
            model: model.into(),
            text_hash: hash.into(),
            generated_at: Utc::now(),
        }
    }

    #[test]
    fn test_missing_vector_is_stale() {
        assert_eq!(policy().stale_reason(None, "h"), Some(StaleReason::Missing));
    }

    #[test]
    fn test_fresh_vector() {
        let e = stored("model-a", vec![0.1, 0.2, 0.3], "h");
        assert_eq!(policy().stale_reason(Some(&e), "h"), None);
    }

    #[test]
    fn test_each_trigger() {
        let p = policy();

        let e = stored("model-a", vec![0.1, 0.2, 0.3], "old");
        assert_eq!(p.stale_reason(Some(&e), "new"), Some(StaleReason::TextChanged));

        let e = stored("model-b", vec![0.1, 0.2, 0.3], "h");
        assert_eq!(p.stale_reason(Some(&e), "h"), Some(StaleReason::ModelChanged));

        let mut e = stored("model-a", vec![0.1; 4], "h");
        e.dimensions = 4;
        assert_eq!(p.stale_reason(Some(&e), "h"), Some(StaleReason::DimensionDrift));
    }

    #[test]
    fn test_dimension_drift_wins_over_hash_match() {
        let e = stored("model-a", vec![0.1, 0.2], "h");
        assert_eq!(policy().stale_reason(Some(&e), "h"), Some(StaleReason::DimensionDrift));
    }

    #[test]
    fn test_expiry_is_separate() {
        let now = Utc::now();
        let mut e = stored("model-a", vec![0.1, 0.2, 0.3], "h");
        e.generated_at = now - Duration::days(8);

        let record = ContentRecord {
            id: 1,
            kind: ContentKind::Post,
            status: PublicationState::Published,
            title: "t".into(),
            slug: "t".into(),
            description: None,
            body: json!(null),
            details: KindDetails::Post { tags: vec![] },
            published_at: None,
            updated_at: now,
            embedding: Some(e),
            recommended_ids: vec![],
        };

        let p = policy();
        assert!(!p.is_stale(&record, "h"));
        assert!(p.is_expired(&record, now));
        assert!(p.candidate_filter(false, true, now).expired_before.is_some());
        assert!(p.candidate_filter(false, false, now).expired_before.is_none());
    }
}
