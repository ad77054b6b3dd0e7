//! Hybrid search handler

use crate::AppState;
use axum::{
    extract::{Query, State},
    Json,
};
use folio_common::errors::{AppError, Result};
use folio_search::SearchOutcome;
use serde::Deserialize;

/// `GET /search` query string
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
    /// Kept as text so a non-numeric value is a 400 with our error body
    pub limit: Option<String>,
}

/// Parse a numeric `limit` and clamp it into `1..=max`
pub(crate) fn parse_limit(raw: Option<&str>) -> Result<Option<usize>> {
    let Some(raw) = raw.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };

    let value: i64 = raw.parse().map_err(|_| AppError::Validation {
        message: format!("limit must be a number, got '{}'", raw),
        field: Some("limit".to_string()),
    })?;
    Ok(Some(value.max(1) as usize))
}

/// Perform a hybrid search over the searchable kind
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchOutcome>> {
    let limit = parse_limit(params.limit.as_deref())?;
    let query = params.q.unwrap_or_default();

    let outcome = state.search.search(&query, limit).await?;

    tracing::info!(
        query = %outcome.query,
        results = outcome.results.len(),
        latency_ms = outcome.query_time_ms,
        "Search completed"
    );

    Ok(Json(outcome))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_limit() {
        assert_eq!(parse_limit(None).unwrap(), None);
        assert_eq!(parse_limit(Some("")).unwrap(), None);
        assert_eq!(parse_limit(Some("7")).unwrap(), Some(7));
        assert_eq!(parse_limit(Some("-3")).unwrap(), Some(1));
        assert!(matches!(
            parse_limit(Some("ten")),
            Err(AppError::Validation { .. })
        ));
    }
}
