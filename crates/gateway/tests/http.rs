//! Router behaviour against the in-memory store

use axum::{
    body::{to_bytes, Body},
    http::{header::AUTHORIZATION, Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use folio_common::content::{text_hash, KindDetails, PublicationState, StoredEmbedding};
use folio_common::embeddings::{EmbeddingSettings, MockEmbedder};
use folio_common::store::InMemoryStore;
use folio_common::{AppConfig, ContentKind, ContentRecord, ContentStore, EmbeddingGenerator};
use folio_gateway::{create_router, AppState};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio_test::assert_ok;
use tower::ServiceExt;

const SECRET: &str = "test-sync-secret";
const MODEL: &str = "test-embed";

fn post(id: i64, title: &str, status: PublicationState) -> ContentRecord {
    ContentRecord {
        id,
        kind: ContentKind::Post,
        status,
        title: title.to_string(),
        slug: format!("post-{}", id),
        description: Some(format!("About {}", title)),
        body: json!(null),
        details: KindDetails::Post { tags: vec![] },
        published_at: Some(Utc::now() - Duration::days(2)),
        updated_at: Utc::now() - Duration::days(2),
        embedding: None,
        recommended_ids: vec![],
    }
}

fn embedded(mut record: ContentRecord, vector: Vec<f32>, model: &str) -> ContentRecord {
    record.embedding = Some(StoredEmbedding {
        dimensions: vector.len(),
        vector,
        model: model.to_string(),
        text_hash: text_hash(&record.title),
        generated_at: Utc::now() - Duration::days(1),
    });
    record
}

async fn app() -> (Router, Arc<InMemoryStore>) {
    let store = Arc::new(InMemoryStore::new());
    store
        .insert(embedded(
            post(1, "Rust ownership", PublicationState::Published),
            vec![1.0, 0.0, 0.0, 0.0],
            MODEL,
        ))
        .await;
    store
        .insert(embedded(
            post(2, "Borrow checker", PublicationState::Published),
            vec![0.9, 0.1, 0.0, 0.0],
            MODEL,
        ))
        .await;
    store
        .insert(embedded(
            post(3, "Unpublished thoughts", PublicationState::Draft),
            vec![0.0, 1.0, 0.0, 0.0],
            MODEL,
        ))
        .await;
    // Stored under a previous model with a different length
    store
        .insert(embedded(
            post(4, "Legacy vector", PublicationState::Published),
            vec![0.5; 8],
            "old-model",
        ))
        .await;
    store
        .insert(post(5, "Not yet embedded", PublicationState::Published))
        .await;

    let mut config = AppConfig::default();
    config.auth.sync_secret = Some(SECRET.to_string());
    config.rate_limit.enabled = false;

    let settings = EmbeddingSettings {
        model: MODEL.to_string(),
        dimensions: 4,
        ..EmbeddingSettings::default()
    };
    let generator = EmbeddingGenerator::new(Some(Arc::new(MockEmbedder::new(MODEL, 4))), settings);

    let content_store: Arc<dyn ContentStore> = store.clone();
    let state = assert_ok!(AppState::new(config, content_store, generator, None));
    (create_router(state), store)
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header(AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

#[tokio::test]
async fn health_reports_version() {
    let (app, _) = app().await;
    let (status, body) = send(app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn regenerate_without_credentials_changes_nothing() {
    let (app, store) = app().await;
    let before = store.find(ContentKind::Post, 1).await.unwrap().unwrap();

    let (status, body) = send(
        app,
        post_json(
            "/embeddings/regenerate",
            json!({"kind": "posts", "id": 1, "force": true}),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"]["code"].is_string());

    let after = store.find(ContentKind::Post, 1).await.unwrap().unwrap();
    assert_eq!(before.embedding, after.embedding);
}

#[tokio::test]
async fn regenerate_with_wrong_secret_is_rejected() {
    let (app, _) = app().await;
    let (status, _) = send(
        app,
        post_json(
            "/embeddings/regenerate",
            json!({"kind": "posts", "id": 1, "force": true}),
            Some("not-the-secret"),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn authorized_regenerate_writes_a_vector() {
    let (app, store) = app().await;
    let (status, body) = send(
        app,
        post_json(
            "/embeddings/regenerate",
            json!({"kind": "posts", "id": 5}),
            Some(SECRET),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["action"], "generated");
    assert_eq!(body["dimensions"], 4);

    let record = store.find(ContentKind::Post, 5).await.unwrap().unwrap();
    let embedding = record.embedding.unwrap();
    assert_eq!(embedding.model, MODEL);
    assert_eq!(embedding.vector.len(), 4);
}

#[tokio::test]
async fn regenerate_rejects_unknown_kind() {
    let (app, _) = app().await;
    let (status, _) = send(
        app,
        post_json(
            "/embeddings/regenerate",
            json!({"kind": "videos", "id": 1}),
            Some(SECRET),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn fetch_returns_vector_and_metadata() {
    let (app, _) = app().await;
    let (status, body) = send(app, get("/embeddings/posts/1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["vector"].as_array().unwrap().len(), 4);
    assert_eq!(body["metadata"]["model"], MODEL);
    assert!(body.get("content").is_none());
}

#[tokio::test]
async fn fetch_honours_format() {
    let (app, _) = app().await;
    let (status, body) = send(app.clone(), get("/embeddings/posts/1?format=metadata-only")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.get("vector").is_none());
    assert_eq!(body["metadata"]["dimensions"], 4);

    let (status, _) = send(app, get("/embeddings/posts/1?format=xml")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn fetch_rejects_bad_kind_and_id() {
    let (app, _) = app().await;
    let (status, _) = send(app.clone(), get("/embeddings/videos/1")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(app, get("/embeddings/posts/abc")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn drafts_are_hidden_from_anonymous_callers() {
    let (app, _) = app().await;
    let (status, _) = send(app.clone(), get("/embeddings/posts/3")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let request = Request::builder()
        .uri("/embeddings/posts/3")
        .header(AUTHORIZATION, format!("Bearer {}", SECRET))
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(app, request).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn missing_vector_is_not_found() {
    let (app, _) = app().await;
    let (status, body) = send(app, get("/embeddings/posts/5")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "EMBEDDING_NOT_FOUND");
}

#[tokio::test]
async fn vector_from_another_model_is_a_conflict() {
    let (app, _) = app().await;
    let (status, body) = send(app, get("/embeddings/posts/4")).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "DIMENSION_MISMATCH");
}

#[tokio::test]
async fn regenerate_on_fetch_requires_credentials() {
    let (app, store) = app().await;
    let (status, _) = send(app.clone(), get("/embeddings/posts/5?regenerate=true")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let record = store.find(ContentKind::Post, 5).await.unwrap().unwrap();
    assert!(record.embedding.is_none());

    let request = Request::builder()
        .uri("/embeddings/posts/4?regenerate=true")
        .header(AUTHORIZATION, format!("Bearer {}", SECRET))
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["regenerated"], "generated");
    assert_eq!(body["metadata"]["model"], MODEL);
}

#[tokio::test]
async fn bulk_listing_and_free_text() {
    let (app, _) = app().await;
    let (status, body) = send(app.clone(), get("/embeddings?type=posts")).await;
    assert_eq!(status, StatusCode::OK);
    // Drafts and unembedded records are left out
    let ids: Vec<i64> = body["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["id"].as_i64().unwrap())
        .collect();
    assert!(ids.contains(&1));
    assert!(!ids.contains(&3));
    assert!(!ids.contains(&5));

    let (status, body) = send(app.clone(), get("/embeddings?q=ownership")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["model"], MODEL);
    assert_eq!(body["vector"].as_array().unwrap().len(), 4);

    let (status, _) = send(app, get("/embeddings")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn empty_search_query_returns_a_message() {
    let (app, _) = app().await;
    let (status, body) = send(app, get("/search?q=%20%20")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["results"].as_array().unwrap().is_empty());
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn non_numeric_search_limit_is_rejected() {
    let (app, _) = app().await;
    let (status, body) = send(app, get("/search?q=rust&limit=ten")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn search_finds_published_posts() {
    let (app, _) = app().await;
    let (status, body) = send(app, get("/search?q=rust%20ownership&limit=5")).await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<i64> = body["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|hit| hit["id"].as_i64().unwrap())
        .collect();
    assert!(ids.contains(&1));
    assert!(!ids.contains(&3));
}

#[tokio::test]
async fn sync_requires_credentials() {
    let (app, store) = app().await;
    let (status, _) = send(app, post_json("/embeddings/sync", json!({}), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let record = store.find(ContentKind::Post, 5).await.unwrap().unwrap();
    assert!(record.embedding.is_none());
}

#[tokio::test]
async fn sync_embeds_stale_posts() {
    let (app, store) = app().await;
    let (status, body) = send(
        app.clone(),
        post_json(
            "/embeddings/sync",
            json!({"kinds": ["posts"], "limitPerCollection": 10}),
            Some(SECRET),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["totals"]["generated"].as_u64().unwrap() >= 2);
    assert_eq!(body["totals"]["failed"], 0);

    let record = store.find(ContentKind::Post, 5).await.unwrap().unwrap();
    assert!(record.embedding.is_some());

    let (status, _) = send(
        app,
        post_json(
            "/embeddings/sync",
            json!({"kinds": ["videos"]}),
            Some(SECRET),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn malformed_regenerate_body_is_a_bad_request() {
    let (app, store) = app().await;
    let before = store.find(ContentKind::Post, 1).await.unwrap().unwrap();

    let (status, body) = send(
        app.clone(),
        post_json(
            "/embeddings/regenerate",
            json!({"kind": "posts", "id": "abc"}),
            Some(SECRET),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let after = store.find(ContentKind::Post, 1).await.unwrap().unwrap();
    assert_eq!(before.embedding, after.embedding);

    let (status, body) = send(
        app,
        post_json(
            "/embeddings/sync",
            json!({"kinds": "posts", "limitPerCollection": "ten"}),
            Some(SECRET),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}
