//! API handlers module

pub mod embeddings;
pub mod health;
pub mod search;
