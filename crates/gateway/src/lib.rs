//! Folio HTTP gateway
//!
//! Routes:
//! - `GET /health`, `GET /ready`
//! - `GET /embeddings/{kind}/{id}` and `GET /embeddings` (reads)
//! - `POST /embeddings/regenerate` and `POST /embeddings/sync` (admin)
//! - `GET /search` (hybrid search)

pub mod extract;
pub mod handlers;
pub mod middleware;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use folio_common::{
    auth::AdminAuthorizer, cache::Cache, config::AppConfig, errors::Result, ContentStore,
    EmbeddingGenerator, StalenessPolicy,
};
use folio_search::{HybridSearch, Recommender, RetrievalSettings};
use folio_sync::{BatchSync, EmbeddingProcessor};
use middleware::rate_limit::{create_rate_limiter, rate_limit_middleware, GlobalRateLimiter};
use std::sync::Arc;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

/// Maximum concurrent requests (backpressure control)
const MAX_CONCURRENT_REQUESTS: usize = 100;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn ContentStore>,
    pub generator: EmbeddingGenerator,
    pub processor: Arc<EmbeddingProcessor>,
    pub sync: Arc<BatchSync>,
    pub search: Arc<HybridSearch>,
    pub recommender: Recommender,
    pub authorizer: Arc<AdminAuthorizer>,
    pub cache: Option<Arc<Cache>>,
}

impl AppState {
    /// Wire every component from configuration
    pub fn new(
        config: AppConfig,
        store: Arc<dyn ContentStore>,
        generator: EmbeddingGenerator,
        cache: Option<Arc<Cache>>,
    ) -> Result<Self> {
        let settings = RetrievalSettings::from_config(&config)?;
        let policy = StalenessPolicy::new(generator.canonical_model(), config.refresh_after());

        let processor = Arc::new(EmbeddingProcessor::new(
            store.clone(),
            generator.clone(),
            policy,
            settings.recommendation_count,
        ));
        let recommender = Recommender::new(store.clone(), settings.recommendation_count);
        let search = HybridSearch::new(store.clone(), generator.clone(), cache.clone(), settings);

        Ok(Self {
            authorizer: Arc::new(AdminAuthorizer::from_config(&config.auth)),
            config: Arc::new(config),
            sync: Arc::new(BatchSync::new(processor.clone())),
            search: Arc::new(search),
            store,
            generator,
            processor,
            recommender,
            cache,
        })
    }
}

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    let mut read_routes = Router::new()
        .route("/embeddings", get(handlers::embeddings::query_embeddings))
        .route("/embeddings/{kind}/{id}", get(handlers::embeddings::get_embedding))
        .route("/search", get(handlers::search::search))
        .layer(TimeoutLayer::new(state.config.request_timeout()));

    let rate_limit = &state.config.rate_limit;
    if rate_limit.enabled {
        let limiter: Arc<GlobalRateLimiter> =
            create_rate_limiter(rate_limit.requests_per_second, rate_limit.burst);
        read_routes = read_routes.layer(axum_middleware::from_fn_with_state(
            limiter,
            rate_limit_middleware,
        ));
    }

    let admin_routes = Router::new()
        .route("/embeddings/regenerate", post(handlers::embeddings::regenerate))
        .route("/embeddings/sync", post(handlers::embeddings::sync))
        .layer(TimeoutLayer::new(state.config.admin_timeout()));

    let health_routes = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready));

    Router::new()
        .merge(read_routes)
        .merge(admin_routes)
        .merge(health_routes)
        .layer(axum_middleware::from_fn(middleware::metrics::track_requests))
        .layer(ConcurrencyLimitLayer::new(MAX_CONCURRENT_REQUESTS))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(propagate_id)
        .layer(request_id)
        .with_state(state)
}
