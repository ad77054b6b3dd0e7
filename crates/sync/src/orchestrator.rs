//! Batch sync
//!
//! Selects stale candidates per kind and processes them one at a time.
//! A failing record is counted and the pass moves on.

use crate::processor::{EmbeddingProcessor, RefreshAction};
use chrono::Utc;
use folio_common::errors::Result;
use folio_common::{metrics, ContentKind};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Parameters of one sync pass
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Kinds to process, in order. Empty means every kind.
    pub kinds: Vec<ContentKind>,
    pub limit_per_kind: usize,
    pub force: bool,
    /// Also refresh vectors older than the refresh interval
    pub refresh_expired: bool,
}

impl SyncOptions {
    pub fn new(kinds: Vec<ContentKind>, limit_per_kind: usize) -> Self {
        Self {
            kinds,
            limit_per_kind,
            force: false,
            refresh_expired: false,
        }
    }

    /// Requested kinds without duplicates, first occurrence wins
    pub fn resolved_kinds(&self) -> Vec<ContentKind> {
        if self.kinds.is_empty() {
            return ContentKind::ALL.to_vec();
        }
        let mut kinds = Vec::with_capacity(self.kinds.len());
        for kind in &self.kinds {
            if !kinds.contains(kind) {
                kinds.push(*kind);
            }
        }
        kinds
    }
}

/// A record that could not be embedded
#[derive(Debug, Clone, Serialize)]
pub struct SyncFailure {
    pub id: i64,
    pub error: String,
}

/// Counters for one kind
#[derive(Debug, Clone, Serialize)]
pub struct KindSummary {
    pub kind: ContentKind,
    pub queued: usize,
    pub processed: usize,
    pub generated: usize,
    pub skipped: usize,
    pub failed: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<SyncFailure>,
}

impl KindSummary {
    fn new(kind: ContentKind) -> Self {
        Self {
            kind,
            queued: 0,
            processed: 0,
            generated: 0,
            skipped: 0,
            failed: 0,
            failures: Vec::new(),
        }
    }
}

/// Counters summed over every kind
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncTotals {
    pub queued: usize,
    pub processed: usize,
    pub generated: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Outcome of a sync pass
#[derive(Debug, Clone, Serialize)]
pub struct SyncSummary {
    pub kinds: Vec<KindSummary>,
    pub totals: SyncTotals,
    pub elapsed_ms: u64,
}

impl SyncSummary {
    pub fn kind(&self, kind: ContentKind) -> Option<&KindSummary> {
        self.kinds.iter().find(|summary| summary.kind == kind)
    }
}

/// Sequential staleness sweep over one or more kinds
pub struct BatchSync {
    processor: Arc<EmbeddingProcessor>,
}

impl BatchSync {
    pub fn new(processor: Arc<EmbeddingProcessor>) -> Self {
        Self { processor }
    }

    /// Run one pass. Only a failure to list candidates aborts it.
    pub async fn run(&self, options: &SyncOptions) -> Result<SyncSummary> {
        let start = Instant::now();
        let now = Utc::now();
        let filter = self
            .processor
            .policy()
            .candidate_filter(options.force, options.refresh_expired, now);

        let mut summaries = Vec::new();
        for kind in options.resolved_kinds() {
            let kind_start = Instant::now();
            let candidates = self
                .processor
                .store()
                .embedding_candidates(kind, &filter, options.limit_per_kind)
                .await?;

            let mut summary = KindSummary::new(kind);
            summary.queued = candidates.len();
            info!(kind = %kind, queued = summary.queued, force = options.force, "Sync started");

            for record in &candidates {
                summary.processed += 1;
                match self
                    .processor
                    .process(record, options.force, options.refresh_expired)
                    .await {
                    Ok(report) if report.action == RefreshAction::Generated => summary.generated += 1,
                    Ok(_) => summary.skipped += 1,
                    Err(e) => {
                        warn!(kind = %kind, id = record.id, error = %e, "Record failed to sync");
                        summary.failed += 1;
                        summary.failures.push(SyncFailure {
                            id: record.id,
                            error: e.to_string(),
                        });
                    }
                }
            }

            metrics::record_sync(
                kind.collection_name(),
                summary.generated,
                summary.skipped,
                summary.failed,
                kind_start.elapsed(),
            );
            info!(
                kind = %kind,
                processed = summary.processed,
                generated = summary.generated,
                skipped = summary.skipped,
                failed = summary.failed,
                "Sync finished"
            );
            summaries.push(summary);
        }

        let totals = summaries.iter().fold(SyncTotals::default(), |mut acc, s| {
            acc.queued += s.queued;
            acc.processed += s.processed;
            acc.generated += s.generated;
            acc.skipped += s.skipped;
            acc.failed += s.failed;
            acc
        });

        Ok(SyncSummary {
            kinds: summaries,
            totals,
            elapsed_ms: start.elapsed().as_millis() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolved_kinds() {
        let all = SyncOptions::new(vec![], 10);
        assert_eq!(all.resolved_kinds(), ContentKind::ALL.to_vec());

        let ordered = SyncOptions::new(
            vec![ContentKind::Note, ContentKind::Post, ContentKind::Note],
            10,
        );
        assert_eq!(
            ordered.resolved_kinds(),
            vec![ContentKind::Note, ContentKind::Post]
        );
    }
}
