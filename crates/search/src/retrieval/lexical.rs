//! Lexical retrieval using PostgreSQL full-text search

use super::{Retriever, SearchRequest, Strategy};
use folio_common::errors::Result;
use folio_common::ContentStore;
use std::sync::Arc;

/// Full-text ranking over title and description
pub struct LexicalRetriever {
    store: Arc<dyn ContentStore>,
}

impl LexicalRetriever {
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self { store }
    }

    /// Reduce the query to plain words for `plainto_tsquery`
    fn prepare_query(query: &str) -> String {
        query
            .split_whitespace()
            .map(|w| w.chars().filter(|c| c.is_alphanumeric()).collect::<String>())
            .filter(|w| !w.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[async_trait::async_trait]
impl Retriever for LexicalRetriever {
    async fn retrieve(&self, request: &SearchRequest) -> Result<Vec<i64>> {
        let query = Self::prepare_query(&request.query);
        if query.is_empty() {
            return Ok(vec![]);
        }

        self.store
            .lexical_ranking(request.kind, &query, request.limit)
            .await
    }

    fn strategy(&self) -> Strategy {
        Strategy::Lexical
    }
}
