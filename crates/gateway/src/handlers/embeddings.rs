//! Embedding handlers
//!
//! Reads never generate document vectors on demand; regeneration and
//! sync require an administrator.

use crate::extract::AppJson;
use crate::handlers::search::parse_limit;
use crate::middleware::auth::{authorize_headers, optional_admin, AdminAuth};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use chrono::{DateTime, Utc};
use folio_common::embeddings::EmbeddingSource;
use folio_common::errors::{AppError, Result};
use folio_common::store::{DocumentSummary, EmbeddedVector};
use folio_common::ContentKind;
use folio_sync::{RefreshAction, RefreshReport, SyncOptions, SyncSummary};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use validator::Validate;

/// Which parts of a stored embedding to return
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    Full,
    VectorOnly,
    MetadataOnly,
}

impl ResponseFormat {
    pub fn parse(value: Option<&str>) -> Result<Self> {
        match value.map(str::trim) {
            None | Some("") | Some("full") => Ok(ResponseFormat::Full),
            Some("vector-only") => Ok(ResponseFormat::VectorOnly),
            Some("metadata-only") => Ok(ResponseFormat::MetadataOnly),
            Some(other) => Err(AppError::InvalidFormat {
                message: format!(
                    "format must be full, vector-only or metadata-only, got '{}'",
                    other
                ),
            }),
        }
    }

    fn includes_vector(&self) -> bool {
        !matches!(self, ResponseFormat::MetadataOnly)
    }

    fn includes_metadata(&self) -> bool {
        !matches!(self, ResponseFormat::VectorOnly)
    }
}

fn parse_id(raw: &str) -> Result<i64> {
    match raw.trim().parse::<i64>() {
        Ok(id) if id >= 1 => Ok(id),
        _ => Err(AppError::Validation {
            message: format!("id must be a positive integer, got '{}'", raw),
            field: Some("id".to_string()),
        }),
    }
}

// ----------------------------------------------------------------------------
// GET /embeddings/{kind}/{id}
// ----------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
pub struct FetchParams {
    /// Include the extracted source text
    #[serde(default)]
    pub content: bool,
    pub format: Option<String>,
    /// Regenerate first if stale (admin only)
    #[serde(default)]
    pub regenerate: bool,
}

#[derive(Debug, Serialize)]
pub struct EmbeddingMetadata {
    pub title: String,
    pub slug: String,
    pub model: String,
    pub dimensions: usize,
    pub text_hash: String,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct EmbeddingResponse {
    pub kind: ContentKind,
    pub id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vector: Option<Vec<f32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<EmbeddingMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommendations: Option<Vec<DocumentSummary>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regenerated: Option<RefreshAction>,
}

/// Fetch one record's stored embedding
pub async fn get_embedding(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, String)>,
    Query(params): Query<FetchParams>,
    headers: HeaderMap,
) -> Result<Json<EmbeddingResponse>> {
    let kind = ContentKind::parse(&kind)?;
    let id = parse_id(&id)?;
    let format = ResponseFormat::parse(params.format.as_deref())?;

    let admin = if params.regenerate {
        let principal = authorize_headers(&state, &headers).map_err(|e| {
            warn!(kind = %kind, id, error = %e, "Rejected unauthorized regeneration");
            e
        })?;
        Some(principal)
    } else {
        optional_admin(&state, &headers)
    };

    let not_found = || AppError::DocumentNotFound {
        kind: kind.to_string(),
        id,
    };

    // Drafts are only visible to administrators
    let mut record = state
        .store
        .find(kind, id)
        .await?
        .filter(|record| admin.is_some() || record.is_visible())
        .ok_or_else(not_found)?;

    let mut regenerated = None;
    if params.regenerate {
        let report = state.processor.refresh(kind, id, false).await?;
        regenerated = Some(report.action);
        record = state.store.find(kind, id).await?.ok_or_else(not_found)?;
    }

    let embedding = record
        .embedding
        .as_ref()
        .ok_or_else(|| AppError::EmbeddingNotFound {
            kind: kind.to_string(),
            id,
        })?;

    let canonical = state.processor.policy().canonical();
    if embedding.dimensions != canonical.dimensions || embedding.vector.len() != embedding.dimensions {
        return Err(AppError::DimensionMismatch {
            expected: canonical.dimensions,
            actual: embedding.vector.len(),
        });
    }

    let recommendations = if format.includes_metadata() {
        Some(state.recommender.recommendations(kind, id).await?)
    } else {
        None
    };

    Ok(Json(EmbeddingResponse {
        kind,
        id,
        vector: format
            .includes_vector()
            .then(|| embedding.vector.clone()),
        metadata: format.includes_metadata().then(|| EmbeddingMetadata {
            title: record.title.clone(),
            slug: record.slug.clone(),
            model: embedding.model.clone(),
            dimensions: embedding.dimensions,
            text_hash: embedding.text_hash.clone(),
            generated_at: embedding.generated_at,
        }),
        content: params.content.then(|| record.source_text()),
        recommendations,
        regenerated,
    }))
}

// ----------------------------------------------------------------------------
// GET /embeddings
// ----------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
pub struct BulkParams {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub id: Option<String>,
    pub q: Option<String>,
    pub limit: Option<String>,
}

/// Vector generated for free text
#[derive(Debug, Serialize)]
pub struct QueryEmbedding {
    pub query: String,
    pub model: String,
    pub dimensions: usize,
    pub source: EmbeddingSource,
    pub vector: Vec<f32>,
}

/// One stored vector
#[derive(Debug, Serialize)]
pub struct StoredVector {
    pub kind: ContentKind,
    #[serde(flatten)]
    pub embedding: EmbeddedVector,
}

/// Precomputed vectors of one kind
#[derive(Debug, Serialize)]
pub struct BulkEmbeddings {
    pub kind: ContentKind,
    pub count: usize,
    pub items: Vec<EmbeddedVector>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum EmbeddingsResponse {
    Query(QueryEmbedding),
    Single(StoredVector),
    Bulk(BulkEmbeddings),
}

/// Embed free text (`q`), read one stored vector (`type` + `id`) or list
/// stored vectors of a kind (`type`)
pub async fn query_embeddings(
    State(state): State<AppState>,
    Query(params): Query<BulkParams>,
    headers: HeaderMap,
) -> Result<Json<EmbeddingsResponse>> {
    if let Some(query) = params.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        let generated = state.generator.generate(query).await;
        return Ok(Json(EmbeddingsResponse::Query(QueryEmbedding {
            query: query.to_string(),
            model: generated.model,
            dimensions: generated.dimensions,
            source: generated.source,
            vector: generated.vector,
        })));
    }

    let kind = params
        .kind
        .as_deref()
        .ok_or_else(|| AppError::Validation {
            message: "Provide q, type, or type and id".to_string(),
            field: None,
        })
        .and_then(ContentKind::parse)?;

    if let Some(raw_id) = params.id.as_deref() {
        let id = parse_id(raw_id)?;
        let admin = optional_admin(&state, &headers);
        let record = state
            .store
            .find(kind, id)
            .await?
            .filter(|record| admin.is_some() || record.is_visible())
            .ok_or_else(|| AppError::DocumentNotFound {
                kind: kind.to_string(),
                id,
            })?;

        let embedding = record.embedding.ok_or_else(|| AppError::EmbeddingNotFound {
            kind: kind.to_string(),
            id,
        })?;

        return Ok(Json(EmbeddingsResponse::Single(StoredVector {
            kind,
            embedding: EmbeddedVector {
                id,
                vector: embedding.vector,
                model: embedding.model,
                dimensions: embedding.dimensions,
            },
        })));
    }

    let retrieval = &state.config.retrieval;
    let limit = parse_limit(params.limit.as_deref())?
        .unwrap_or(retrieval.default_sync_limit)
        .clamp(1, retrieval.max_sync_limit.max(1));

    let items = state.store.list_embedded(kind, limit).await?;
    Ok(Json(EmbeddingsResponse::Bulk(BulkEmbeddings {
        kind,
        count: items.len(),
        items,
    })))
}

// ----------------------------------------------------------------------------
// POST /embeddings/regenerate
// ----------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
pub struct RegenerateRequest {
    #[validate(length(min = 1))]
    pub kind: String,

    #[validate(range(min = 1))]
    pub id: i64,

    #[serde(default)]
    pub force: bool,
}

/// Regenerate one record's vector when stale, or unconditionally with
/// `force`
pub async fn regenerate(
    State(state): State<AppState>,
    AdminAuth(principal): AdminAuth,
    AppJson(request): AppJson<RegenerateRequest>,
) -> Result<Json<RefreshReport>> {
    request.validate()?;
    let kind = ContentKind::parse(&request.kind)?;

    info!(
        kind = %kind,
        id = request.id,
        force = request.force,
        subject = %principal.subject,
        "Regeneration requested"
    );

    let report = state
        .processor
        .refresh(kind, request.id, request.force)
        .await?;
    Ok(Json(report))
}

// ----------------------------------------------------------------------------
// POST /embeddings/sync
// ----------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SyncRequest {
    /// Empty means every kind
    #[serde(default)]
    pub kinds: Vec<String>,

    #[serde(default)]
    pub force: bool,

    #[validate(range(min = 1))]
    pub limit_per_collection: Option<usize>,
}

/// Run one sync pass over the requested kinds
pub async fn sync(
    State(state): State<AppState>,
    AdminAuth(principal): AdminAuth,
    AppJson(request): AppJson<SyncRequest>,
) -> Result<Json<SyncSummary>> {
    request.validate()?;

    let retrieval = &state.config.retrieval;
    let limit = request
        .limit_per_collection
        .unwrap_or(retrieval.default_sync_limit);
    if limit > retrieval.max_sync_limit {
        return Err(AppError::Validation {
            message: format!(
                "limitPerCollection must be at most {}",
                retrieval.max_sync_limit
            ),
            field: Some("limitPerCollection".to_string()),
        });
    }

    // Unknown kinds fail before any work starts
    let kinds = request
        .kinds
        .iter()
        .map(|k| ContentKind::parse(k))
        .collect::<Result<Vec<_>>>()?;

    info!(
        kinds = ?kinds,
        force = request.force,
        limit,
        subject = %principal.subject,
        "Sync requested"
    );

    let options = SyncOptions {
        kinds,
        limit_per_kind: limit,
        force: request.force,
        refresh_expired: false,
    };
    let summary = state.sync.run(&options).await?;
    Ok(Json(summary))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_format() {
        assert_eq!(ResponseFormat::parse(None).unwrap(), ResponseFormat::Full);
        assert_eq!(
            ResponseFormat::parse(Some("vector-only")).unwrap(),
            ResponseFormat::VectorOnly
        );
        assert!(!ResponseFormat::MetadataOnly.includes_vector());
        assert!(!ResponseFormat::VectorOnly.includes_metadata());
        assert!(ResponseFormat::parse(Some("xml")).is_err());
    }

    #[test]
    fn test_parse_id() {
        assert_eq!(parse_id("42").unwrap(), 42);
        assert!(parse_id("forty-two").is_err());
        assert!(parse_id("0").is_err());
    }

    #[test]
    fn test_sync_request_validation() {
        let request: SyncRequest =
            serde_json::from_str(r#"{"kinds":["posts"],"limitPerCollection":0}"#).unwrap();
        assert!(request.validate().is_err());

        let request: SyncRequest = serde_json::from_str(r#"{}"#).unwrap();
        assert!(request.validate().is_ok());
        assert!(request.kinds.is_empty());
    }
}
