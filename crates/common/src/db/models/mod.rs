//! Row models for raw content queries
//!
//! The three content tables share the embedding columns but differ in
//! their kind-specific fields, so rows are read through `FromQueryResult`
//! with per-kind select lists that fill absent columns with NULLs.

use super::vector::parse_literal;
use crate::content::{
    ActivityType, ContentKind, ContentRecord, KindDetails, PublicationState, StoredEmbedding,
};
use crate::errors::Result;
use chrono::{DateTime, Utc};
use sea_orm::FromQueryResult;

const COMMON_COLUMNS: &str = "id, title, slug, body, status, published_at, updated_at, \
     embedding::text AS embedding_text, embedding_model, embedding_dimensions, \
     embedding_text_hash, embedding_generated_at, \
     COALESCE(recommended_ids, '{}') AS recommended_ids";

/// Select list for full content rows of `kind`
pub fn content_columns(kind: ContentKind) -> String {
    let specific = match kind {
        ContentKind::Post => {
            "description, COALESCE(tags, '{}') AS tags, \
             NULL::text AS quote_author, NULL::text AS quote_source, \
             NULL::text AS activity_type, NULL::text AS creator, \
             ARRAY[]::text[] AS participants"
        }
        ContentKind::Note => {
            "NULL::text AS description, ARRAY[]::text[] AS tags, \
             quote_author, quote_source, \
             NULL::text AS activity_type, NULL::text AS creator, \
             ARRAY[]::text[] AS participants"
        }
        ContentKind::Activity => {
            "description, ARRAY[]::text[] AS tags, \
             NULL::text AS quote_author, NULL::text AS quote_source, \
             activity_type, creator, COALESCE(participants, '{}') AS participants"
        }
    };
    format!("{}, {}", COMMON_COLUMNS, specific)
}

/// Expression for the description column (notes have none)
pub fn description_expr(kind: ContentKind) -> &'static str {
    match kind {
        ContentKind::Note => "NULL::text",
        ContentKind::Post | ContentKind::Activity => "description",
    }
}

/// Full content row
#[derive(Debug, Clone, FromQueryResult)]
pub struct ContentRow {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    pub body: serde_json::Value,
    pub status: String,
    pub published_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
    pub tags: Vec<String>,
    pub quote_author: Option<String>,
    pub quote_source: Option<String>,
    pub activity_type: Option<String>,
    pub creator: Option<String>,
    pub participants: Vec<String>,
    pub embedding_text: Option<String>,
    pub embedding_model: Option<String>,
    pub embedding_dimensions: Option<i32>,
    pub embedding_text_hash: Option<String>,
    pub embedding_generated_at: Option<DateTime<Utc>>,
    pub recommended_ids: Vec<i64>,
}

impl ContentRow {
    pub fn into_record(self, kind: ContentKind) -> Result<ContentRecord> {
        let embedding = match (
            self.embedding_text,
            self.embedding_model,
            self.embedding_dimensions,
            self.embedding_text_hash,
            self.embedding_generated_at,
        ) {
            (Some(text), Some(model), Some(dimensions), Some(text_hash), Some(generated_at)) => {
                Some(StoredEmbedding {
                    vector: parse_literal(&text)?,
                    model,
                    dimensions: dimensions.max(0) as usize,
                    text_hash,
                    generated_at,
                })
            }
            _ => None,
        };

        let details = match kind {
            ContentKind::Post => KindDetails::Post { tags: self.tags },
            ContentKind::Note => KindDetails::Note {
                quote_author: self.quote_author,
                quote_source: self.quote_source,
            },
            ContentKind::Activity => KindDetails::Activity {
                activity_type: self
                    .activity_type
                    .as_deref()
                    .map(ActivityType::from_db)
                    .unwrap_or(ActivityType::Other),
                creator: self.creator,
                participants: self.participants,
            },
        };

        Ok(ContentRecord {
            id: self.id,
            kind,
            status: PublicationState::from_db(&self.status),
            title: self.title,
            slug: self.slug,
            description: self.description,
            body: self.body,
            details,
            published_at: self.published_at,
            updated_at: self.updated_at,
            embedding,
            recommended_ids: self.recommended_ids,
        })
    }
}

#[derive(Debug, FromQueryResult)]
pub struct IdRow {
    pub id: i64,
}

#[derive(Debug, FromQueryResult)]
pub struct NeighborRow {
    pub id: i64,
    pub distance: f64,
}

#[derive(Debug, FromQueryResult)]
pub struct SummaryRow {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
}

#[derive(Debug, FromQueryResult)]
pub struct VectorRow {
    pub id: i64,
    pub embedding_text: String,
    pub embedding_model: String,
    pub embedding_dimensions: i32,
}
