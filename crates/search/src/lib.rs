//! Folio retrieval
//!
//! - Similarity search over stored vectors (query, then hydrate)
//! - Precomputed "related content" recommendations
//! - Hybrid search: semantic, lexical and fuzzy rankings fused with RRF

mod recommend;
pub mod retrieval;
mod similar;

pub use recommend::Recommender;
pub use retrieval::{HybridSearch, RetrievalSettings, SearchHit, SearchOutcome};
pub use similar::SimilaritySearch;
