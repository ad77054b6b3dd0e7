//! Health check handlers

use crate::AppState;
use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Serialize)]
pub struct ReadyResponse {
    pub status: String,
    pub checks: HealthChecks,
    pub embedding: EmbeddingStatus,
}

#[derive(Serialize)]
pub struct HealthChecks {
    pub database: CheckResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache: Option<CheckResult>,
}

#[derive(Serialize)]
pub struct CheckResult {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Which model new vectors are produced with
#[derive(Serialize)]
pub struct EmbeddingStatus {
    /// `primary` when a provider is configured, `fallback` otherwise
    pub mode: String,
    pub model: String,
    pub dimensions: usize,
}

impl CheckResult {
    fn from_outcome(outcome: folio_common::Result<()>, start: std::time::Instant) -> Self {
        match outcome {
            Ok(()) => CheckResult {
                status: "up".to_string(),
                latency_ms: Some(start.elapsed().as_millis() as u64),
                error: None,
            },
            Err(e) => {
                tracing::warn!(error = %e, "Readiness check failed");
                CheckResult {
                    status: "down".to_string(),
                    latency_ms: None,
                    error: Some(e.public_message()),
                }
            }
        }
    }
}

/// Liveness probe - always returns healthy if server is running
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: folio_common::VERSION.to_string(),
    })
}

/// Readiness probe - checks the store and, when configured, the cache
pub async fn ready(State(state): State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    let start = std::time::Instant::now();
    let database = CheckResult::from_outcome(state.store.ping().await, start);

    let cache = match &state.cache {
        Some(cache) => {
            let start = std::time::Instant::now();
            Some(CheckResult::from_outcome(cache.ping().await, start))
        }
        None => None,
    };

    // The cache is optional; only the store decides readiness
    let ready = database.status == "up";
    let canonical = state.generator.canonical_model();

    let body = ReadyResponse {
        status: if ready { "ready" } else { "not_ready" }.to_string(),
        checks: HealthChecks { database, cache },
        embedding: EmbeddingStatus {
            mode: if state.generator.has_provider() {
                "primary"
            } else {
                "fallback"
            }
            .to_string(),
            model: canonical.name,
            dimensions: canonical.dimensions,
        },
    };

    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body))
}
