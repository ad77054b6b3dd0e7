//! Folio embedding sync
//!
//! - [`EmbeddingProcessor`]: embed one record when stale, then refresh its
//!   recommendations (regenerate endpoint and content-changed hook)
//! - [`BatchSync`]: sequential sweep over the stale records of each kind

pub mod orchestrator;
pub mod processor;

pub use orchestrator::{BatchSync, KindSummary, SyncOptions, SyncSummary, SyncTotals};
pub use processor::{EmbeddingProcessor, RefreshAction, RefreshReport};
