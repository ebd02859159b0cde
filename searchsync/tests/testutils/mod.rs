//! Test utilities for searchsync integration tests
//!
//! `TestFixture` runs a full coordinator over in-memory components and keeps
//! typed handles to them so tests can inject failures.

#![allow(dead_code)]

use searchsync::cache::backend::MemoryCacheBackend;
use searchsync::{
    EntityRow, MemoryPrimaryStore, MemorySearchEngine, ServiceConfig, SyncCoordinator,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

pub struct TestFixture {
    pub coordinator: Arc<SyncCoordinator>,
    pub store: Arc<MemoryPrimaryStore>,
    pub engine: Arc<MemorySearchEngine>,
    pub backend: Arc<MemoryCacheBackend>,
}

impl TestFixture {
    pub async fn new(rows: Vec<EntityRow>) -> Self {
        Self::with_config(rows, test_config()).await
    }

    pub async fn with_config(rows: Vec<EntityRow>, config: ServiceConfig) -> Self {
        let store = Arc::new(MemoryPrimaryStore::with_rows(rows));
        let engine = Arc::new(MemorySearchEngine::new());
        let backend = Arc::new(MemoryCacheBackend::new(1000));
        let coordinator =
            SyncCoordinator::from_parts(config, engine.clone(), store.clone(), backend.clone())
                .await
                .expect("coordinator should start");

        // Bootstrap only creates an empty generation; index the seed rows
        coordinator
            .index_manager()
            .rebuild()
            .await
            .expect("seed rebuild should succeed");

        Self {
            coordinator,
            store,
            engine,
            backend,
        }
    }
}

/// Short timeouts so fallback paths run quickly
pub fn test_config() -> ServiceConfig {
    let mut config = ServiceConfig::in_memory();
    config.router.search_timeout = Duration::from_millis(100);
    config.cache.operation_timeout = Duration::from_millis(100);
    config.index.batch_size = 2;
    config.index.retry_backoff = Duration::from_millis(1);
    config
}

pub fn catalog() -> Vec<EntityRow> {
    vec![
        EntityRow::new("p1", "Classic Hoodie")
            .with_brand("Northwind")
            .with_category("apparel")
            .with_price(999.0)
            .with_stock(5),
        EntityRow::new("p2", "Trail Running Shoe")
            .with_brand("Acme")
            .with_category("footwear")
            .with_price(120.0)
            .with_stock(0),
        EntityRow::new("p3", "Rain Jacket")
            .with_brand("Northwind")
            .with_category("apparel")
            .with_price(180.0)
            .with_stock(12),
        EntityRow::new("p4", "Wool Socks")
            .with_brand("Acme")
            .with_category("apparel")
            .with_price(15.0)
            .with_stock(40),
    ]
}

/// Poll `check` until it returns true or two seconds pass
pub async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..100 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}
