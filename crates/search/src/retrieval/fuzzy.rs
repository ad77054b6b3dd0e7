//! Fuzzy retrieval using trigram similarity

use super::{Retriever, SearchRequest, Strategy};
use folio_common::errors::Result;
use folio_common::ContentStore;
use std::sync::Arc;

/// Typo-tolerant matching on title and description
pub struct FuzzyRetriever {
    store: Arc<dyn ContentStore>,
    threshold: f64,
}

impl FuzzyRetriever {
    pub fn new(store: Arc<dyn ContentStore>, threshold: f64) -> Self {
        Self { store, threshold }
    }
}

#[async_trait::async_trait]
impl Retriever for FuzzyRetriever {
    async fn retrieve(&self, request: &SearchRequest) -> Result<Vec<i64>> {
        let query = request.query.trim();
        if query.is_empty() {
            return Ok(vec![]);
        }

        self.store
            .fuzzy_ranking(request.kind, query, self.threshold, request.limit)
            .await
    }

    fn strategy(&self) -> Strategy {
        Strategy::Fuzzy
    }
}
