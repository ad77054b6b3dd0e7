//! Reciprocal Rank Fusion (RRF) for combining ranked lists
//!
//! Each document scores `Σ 1/(k + rank)` over the lists it appears in,
//! with 1-based ranks. Raw scores of the strategies are never compared.

use super::Strategy;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;

/// RRF fusion parameters
#[derive(Debug, Clone)]
pub struct RrfFusion {
    /// Smoothing constant (canonically 60)
    pub k: f64,
}

impl Default for RrfFusion {
    fn default() -> Self {
        Self {
            k: folio_common::DEFAULT_RRF_K,
        }
    }
}

/// One fused document with its per-strategy ranks
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FusedHit {
    pub id: i64,
    pub semantic_rank: Option<usize>,
    pub fts_rank: Option<usize>,
    pub fuzzy_rank: Option<usize>,
    pub score: f64,
}

impl FusedHit {
    fn new(id: i64) -> Self {
        Self {
            id,
            semantic_rank: None,
            fts_rank: None,
            fuzzy_rank: None,
            score: 0.0,
        }
    }

    fn rank_slot(&mut self, strategy: Strategy) -> &mut Option<usize> {
        match strategy {
            Strategy::Semantic => &mut self.semantic_rank,
            Strategy::Lexical => &mut self.fts_rank,
            Strategy::Fuzzy => &mut self.fuzzy_rank,
        }
    }
}

impl RrfFusion {
    pub fn new(k: f64) -> Self {
        Self { k }
    }

    /// Fuse ranked id lists. Sorted by descending score, ties by lowest id.
    pub fn fuse(&self, lists: &[(Strategy, Vec<i64>)], limit: usize) -> Vec<FusedHit> {
        let mut hits: HashMap<i64, FusedHit> = HashMap::new();

        for (strategy, ids) in lists {
            for (position, id) in ids.iter().enumerate() {
                let hit = hits.entry(*id).or_insert_with(|| FusedHit::new(*id));
                let slot = hit.rank_slot(*strategy);
                // A strategy counts once per document, at its best rank
                if slot.is_some() {
                    continue;
                }
                let rank = position + 1;
                *slot = Some(rank);
                hit.score += 1.0 / (self.k + rank as f64);
            }
        }

        let mut results: Vec<FusedHit> = hits.into_values().collect();
        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then(a.id.cmp(&b.id))
        });
        results.truncate(limit);
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rrf_fusion() {
        let fusion = RrfFusion::default();

        // Semantic: [1, 2, 3]
        // Lexical:  [2, 1, 4]
        let results = fusion.fuse(
            &[
                (Strategy::Semantic, vec![1, 2, 3]),
                (Strategy::Lexical, vec![2, 1, 4]),
            ],
            10,
        );

        // 1 and 2 tie on score; lower id wins
        assert_eq!(results[0].id, 1);
        assert_eq!(results[1].id, 2);
        assert_eq!(results[0].semantic_rank, Some(1));
        assert_eq!(results[0].fts_rank, Some(2));
        assert_eq!(results[0].fuzzy_rank, None);
        assert!((results[0].score - (1.0 / 61.0 + 1.0 / 62.0)).abs() < 1e-12);
        // 3 and 4 tie at rank 3 in one list each
        assert_eq!(results[2].id, 3);
        assert_eq!(results[3].id, 4);
    }

    #[test]
    fn test_first_everywhere_beats_first_once() {
        let fusion = RrfFusion::default();
        let results = fusion.fuse(
            &[
                (Strategy::Semantic, vec![7, 3]),
                (Strategy::Lexical, vec![7]),
                (Strategy::Fuzzy, vec![7]),
            ],
            10,
        );
        let solo = fusion.fuse(&[(Strategy::Semantic, vec![3])], 10);

        assert_eq!(results[0].id, 7);
        assert!(results[0].score > solo[0].score);
    }

    #[test]
    fn test_limit_and_empty() {
        let fusion = RrfFusion::new(1.0);
        assert!(fusion.fuse(&[], 5).is_empty());

        let results = fusion.fuse(&[(Strategy::Fuzzy, vec![5, 4, 3, 2, 1])], 2);
        let ids: Vec<i64> = results.iter().map(|h| h.id).collect();
        assert_eq!(ids, vec![5, 4]);
        assert!((results[0].score - 0.5).abs() < 1e-12);
    }
}
