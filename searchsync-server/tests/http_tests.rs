//! HTTP surface tests, driven in-process through `tower::ServiceExt::oneshot`

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use axum::Router;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use searchsync::cache::backend::MemoryCacheBackend;
use searchsync::{
    EntityRow, MemoryPrimaryStore, MemorySearchEngine, PrimaryStore, SearchEngine, ServiceConfig,
    SyncCoordinator,
};
use searchsync_server::{build_router, AppState};

const TOKEN: &str = "s3cret";

struct TestApp {
    coordinator: Arc<SyncCoordinator>,
    store: Arc<MemoryPrimaryStore>,
    engine: Arc<MemorySearchEngine>,
    router: Router,
}

impl TestApp {
    async fn new(config: ServiceConfig) -> Self {
        let rows = vec![
            EntityRow::new("p1", "Classic Hoodie")
                .with_brand("Northwind")
                .with_category("apparel")
                .with_price(999.0),
            EntityRow::new("p2", "Trail Running Shoe")
                .with_brand("Acme")
                .with_category("footwear")
                .with_price(120.0),
        ];
        let store = Arc::new(MemoryPrimaryStore::with_rows(rows));
        let engine = Arc::new(MemorySearchEngine::new());
        let coordinator = SyncCoordinator::from_parts(
            config,
            engine.clone(),
            store.clone(),
            Arc::new(MemoryCacheBackend::new(1000)),
        )
        .await
        .expect("coordinator");
        coordinator
            .index_manager()
            .rebuild()
            .await
            .expect("seed rebuild");

        let router = build_router(AppState {
            coordinator: coordinator.clone(),
            admin_token: Some(TOKEN.to_string()),
        });
        Self {
            coordinator,
            store,
            engine,
            router,
        }
    }

    async fn get(&self, uri: &str) -> Response {
        let request = Request::builder()
            .uri(uri)
            .body(Body::empty())
            .expect("request");
        self.router.clone().oneshot(request).await.expect("response")
    }

    async fn admin(&self, method: &str, uri: &str, token: Option<&str>, body: Value) -> Response {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json");
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        let request = builder.body(Body::from(body.to_string())).expect("request");
        self.router.clone().oneshot(request).await.expect("response")
    }

    /// GET until the response reports a cache hit
    async fn get_until_hit(&self, uri: &str) -> Response {
        for _ in 0..100 {
            let response = self.get(uri).await;
            if header(&response, "x-cache-status") == "HIT" {
                return response;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("{} never became a cache hit", uri);
    }
}

fn test_config() -> ServiceConfig {
    let mut config = ServiceConfig::in_memory();
    config.router.search_timeout = Duration::from_millis(100);
    config.index.retry_backoff = Duration::from_millis(1);
    config
}

fn header(response: &Response, name: &str) -> String {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

async fn read_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json")
}

#[tokio::test]
async fn test_stale_entity_until_revalidated() {
    let mut config = test_config();
    config.listener.invalidate_on_apply = false;
    let app = TestApp::new(config).await;

    let first = app.get("/entity/p1").await;
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(header(&first, "x-cache-status"), "MISS");
    assert_eq!(header(&first, "x-data-freshness"), "fresh");
    assert_eq!(read_json(first).await["price"], 999.0);

    let hit = app.get_until_hit("/entity/p1").await;
    assert_eq!(read_json(hit).await["price"], 999.0);

    app.store
        .upsert(EntityRow::new("p1", "Classic Hoodie").with_price(899.0))
        .await
        .unwrap();
    let mut indexed = false;
    for _ in 0..100 {
        if let Ok(Some(doc)) = app.engine.get("products", "p1").await {
            if doc.price == 899.0 {
                indexed = true;
                break;
            }
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(indexed);

    let stale = app.get("/entity/p1").await;
    assert_eq!(header(&stale, "x-cache-status"), "HIT");
    assert_eq!(header(&stale, "x-data-freshness"), "cached");
    assert_eq!(read_json(stale).await["price"], 999.0);

    let revalidated = app
        .admin("POST", "/revalidate", Some(TOKEN), json!({"type": "entity", "id": "p1"}))
        .await;
    assert_eq!(revalidated.status(), StatusCode::OK);
    assert_eq!(read_json(revalidated).await["keys_deleted"], 1);

    let fresh = app.get("/entity/p1").await;
    assert_eq!(header(&fresh, "x-cache-status"), "MISS");
    assert_eq!(read_json(fresh).await["price"], 899.0);
}

#[tokio::test]
async fn test_search_cache_headers() {
    let app = TestApp::new(test_config()).await;

    let response = app.get("/search?q=hoodie&limit=10").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        header(&response, "cache-control"),
        "public, s-maxage=30, stale-while-revalidate=60, stale-if-error=300"
    );
    assert_eq!(
        header(&response, "cdn-cache-control"),
        "max-age=30, stale-while-revalidate=60, stale-if-error=300"
    );
    let body = read_json(response).await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["hits"][0]["id"], "p1");
    assert_eq!(body["limit"], 10);
}

#[tokio::test]
async fn test_degraded_search_is_not_shared_cacheable() {
    let app = TestApp::new(test_config()).await;
    app.engine.set_available(false);

    let response = app.get("/search?q=shoe").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header(&response, "x-data-freshness"), "degraded");
    assert!(header(&response, "cache-control").contains("s-maxage=0"));
    assert_eq!(read_json(response).await["hits"][0]["id"], "p2");
}

#[tokio::test]
async fn test_read_errors() {
    let app = TestApp::new(test_config()).await;

    let missing = app.get("/entity/nope").await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    assert_eq!(read_json(missing).await["code"], "not_found");

    let invalid = app.get("/search?limit=500").await;
    assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);
    assert_eq!(read_json(invalid).await["code"], "invalid_request");

    app.engine.set_available(false);
    app.store.set_available(false);
    let down = app.get("/entity/p1").await;
    assert_eq!(down.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(read_json(down).await["code"], "unavailable");
}

#[tokio::test]
async fn test_admin_requires_bearer_token() {
    let app = TestApp::new(test_config()).await;

    let missing = app.admin("POST", "/reindex", None, json!({})).await;
    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);
    let wrong = app.admin("GET", "/stats", Some("guess"), json!({})).await;
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);

    let disabled = build_router(AppState {
        coordinator: app.coordinator.clone(),
        admin_token: None,
    });
    let request = Request::builder()
        .method("POST")
        .uri("/reindex")
        .header("authorization", format!("Bearer {}", TOKEN))
        .body(Body::empty())
        .expect("request");
    let response = disabled.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_reindex_and_status() {
    let app = TestApp::new(test_config()).await;

    let response = app.admin("POST", "/reindex", Some(TOKEN), json!({})).await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let status = read_json(response).await["status"].clone();
    assert!(status == "started" || status == "already_running");

    let manager = app.coordinator.index_manager();
    for _ in 0..100 {
        if !manager.is_rebuilding() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    let response = app.admin("GET", "/reindex/status", Some(TOKEN), json!({})).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["running"], false);
    assert_eq!(body["current"]["name"], "products_3");
    assert_eq!(body["last_report"]["documents_indexed"], 2);

    let health = read_json(app.get("/health").await).await;
    assert_eq!(health["status"], "ok");
    assert_eq!(health["generation"], "products_3");
}

#[tokio::test]
async fn test_revalidate_namespaces_and_stats() {
    let app = TestApp::new(test_config()).await;
    app.get("/search?q=hoodie").await;

    let response = app
        .admin("POST", "/revalidate", Some(TOKEN), json!({"type": "category", "category": "apparel"}))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert!(body["bumped"]["search"].is_number());
    assert!(body["bumped"]["listing"].is_number());
    assert!(body["bumped"]["facets"].is_number());

    let bad = app
        .admin("POST", "/revalidate", Some(TOKEN), json!({"type": "tag"}))
        .await;
    assert_eq!(bad.status(), StatusCode::BAD_REQUEST);

    let stats = read_json(app.admin("GET", "/stats", Some(TOKEN), json!({})).await).await;
    assert_eq!(stats["router"]["fresh"], 1);
    assert!(stats["cache"]["misses"].as_u64().unwrap() >= 1);
    assert_eq!(stats["cache_backend"], "memory");
    assert_eq!(stats["invalidation"]["total_events"].as_u64(), Some(2));
}
