// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Query Router - the read path
//!
//! cache → search engine → primary store. A cache hit short-circuits; a
//! fresh engine answer is written back to the cache without waiting; a
//! degraded answer from the primary store is returned but never cached.

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::errors::{RouterError, StrategyError};
use super::freshness::{CacheControl, CacheStatus, Freshness};
use super::request::{validate_entity_id, FacetParams, QueryRequest, SearchParams};
use super::router_config::RouterConfig;
use super::strategy::{PrimaryStoreStrategy, QueryOutput, ReadStrategy, SearchEngineStrategy};
use crate::cache::{CacheStore, ContentTier};
use crate::search::SearchEngine;
use crate::store::PrimaryStore;

/// A routed answer with its provenance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutedResponse {
    pub output: QueryOutput,
    pub freshness: Freshness,
    pub cache_status: CacheStatus,
    pub cache_control: CacheControl,
    pub tier: ContentTier,
    /// Cache key the request maps to
    pub key: Option<String>,
}

#[derive(Debug, Default)]
struct RouterStats {
    cached: AtomicU64,
    fresh: AtomicU64,
    degraded: AtomicU64,
    unavailable: AtomicU64,
    rejected: AtomicU64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RouterStatsSnapshot {
    pub cached: u64,
    pub fresh: u64,
    pub degraded: u64,
    pub unavailable: u64,
    pub rejected: u64,
}

pub struct QueryRouter {
    cache: Arc<CacheStore>,
    strategies: Vec<Arc<dyn ReadStrategy>>,
    config: RouterConfig,
    stats: RouterStats,
}

impl QueryRouter {
    /// Default chain: search engine (via `alias`), then primary store
    pub fn new(
        cache: Arc<CacheStore>,
        engine: Arc<dyn SearchEngine>,
        alias: impl Into<String>,
        store: Arc<dyn PrimaryStore>,
        config: RouterConfig,
    ) -> Self {
        let strategies: Vec<Arc<dyn ReadStrategy>> = vec![
            Arc::new(SearchEngineStrategy::new(
                engine,
                alias,
                config.search_timeout,
            )),
            Arc::new(PrimaryStoreStrategy::new(store, config.fallback_timeout)),
        ];
        Self::with_strategies(cache, strategies, config)
    }

    pub fn with_strategies(
        cache: Arc<CacheStore>,
        strategies: Vec<Arc<dyn ReadStrategy>>,
        config: RouterConfig,
    ) -> Self {
        Self {
            cache,
            strategies,
            config,
            stats: RouterStats::default(),
        }
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<CacheStore> {
        &self.cache
    }

    pub fn stats(&self) -> RouterStatsSnapshot {
        RouterStatsSnapshot {
            cached: self.stats.cached.load(Ordering::Relaxed),
            fresh: self.stats.fresh.load(Ordering::Relaxed),
            degraded: self.stats.degraded.load(Ordering::Relaxed),
            unavailable: self.stats.unavailable.load(Ordering::Relaxed),
            rejected: self.stats.rejected.load(Ordering::Relaxed),
        }
    }

    fn reject(&self, error: RouterError) -> RouterError {
        self.stats.rejected.fetch_add(1, Ordering::Relaxed);
        error
    }

    /// Validate raw search parameters and route them
    pub async fn search(&self, params: &SearchParams) -> Result<RoutedResponse, RouterError> {
        let query = params
            .validate(&self.config)
            .map_err(|e| self.reject(e))?;
        self.query(QueryRequest::Search(query)).await
    }

    pub async fn entity(&self, id: &str) -> Result<RoutedResponse, RouterError> {
        let id = validate_entity_id(id).map_err(|e| self.reject(e))?;
        self.query(QueryRequest::Entity { id }).await
    }

    pub async fn facets(&self, params: &FacetParams) -> Result<RoutedResponse, RouterError> {
        self.query(QueryRequest::Facets(params.validate())).await
    }

    /// Route an already validated request
    pub async fn query(&self, request: QueryRequest) -> Result<RoutedResponse, RouterError> {
        let tier = request.tier();
        let policy = *self.cache.config().policy(tier);
        let key = request.cache_key(&self.cache.key_builder());
        if key.is_none() {
            warn!("Could not build a cache key for {:?}; bypassing cache", request);
        }

        if let Some(key) = &key {
            if let Some(output) = self.cache.get_json::<QueryOutput>(key).await {
                self.stats.cached.fetch_add(1, Ordering::Relaxed);
                return Ok(RoutedResponse {
                    output,
                    freshness: Freshness::Cached,
                    cache_status: CacheStatus::Hit,
                    cache_control: CacheControl::from_policy(&policy),
                    tier,
                    key: Some(key.clone()),
                });
            }
        }

        // Deletes that land while the strategies run fence off the write-back
        let epoch = key
            .as_deref()
            .map(|key| self.cache.invalidation_epoch(key))
            .unwrap_or_default();

        let mut failures: Vec<String> = Vec::new();
        for strategy in &self.strategies {
            let timeout = strategy.timeout();
            let result = tokio::time::timeout(timeout, strategy.execute(&request))
                .await
                .unwrap_or(Err(StrategyError::Timeout(timeout)));

            let output = match result {
                Ok(output) => output,
                Err(e) => {
                    warn!("Read strategy '{}' failed: {}", strategy.name(), e);
                    failures.push(format!("{}: {}", strategy.name(), e));
                    continue;
                }
            };

            let freshness = strategy.freshness();
            let cache_control = match freshness {
                Freshness::Degraded => {
                    self.stats.degraded.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        "Serving degraded {} read from '{}'",
                        tier,
                        strategy.name()
                    );
                    CacheControl::degraded(&policy)
                }
                _ => {
                    self.stats.fresh.fetch_add(1, Ordering::Relaxed);
                    if let Some(key) = &key {
                        self.write_back(key, &output, policy.ttl, epoch);
                    }
                    CacheControl::from_policy(&policy)
                }
            };

            return Ok(RoutedResponse {
                output,
                freshness,
                cache_status: CacheStatus::Miss,
                cache_control,
                tier,
                key,
            });
        }

        self.stats.unavailable.fetch_add(1, Ordering::Relaxed);
        Err(RouterError::Unavailable(failures.join("; ")))
    }

    fn write_back(&self, key: &str, output: &QueryOutput, ttl: std::time::Duration, epoch: u64) {
        if !output.is_cacheable() {
            debug!("Not caching negative result for '{}'", key);
            return;
        }
        match serde_json::to_vec(output) {
            Ok(bytes) => self.cache.spawn_write_back(key.to_string(), bytes, ttl, epoch),
            Err(e) => warn!("Could not serialize result for '{}': {}", key, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::backend::MemoryCacheBackend;
    use crate::cache::{CacheConfig, InvalidationDispatcher};
    use crate::document::{DocumentMapper, EntityRow};
    use crate::search::MemorySearchEngine;
    use crate::store::MemoryPrimaryStore;
    use std::time::Duration;
    use tokio::sync::Notify;

    struct Fixture {
        engine: Arc<MemorySearchEngine>,
        store: Arc<MemoryPrimaryStore>,
        router: QueryRouter,
    }

    async fn fixture() -> Fixture {
        let rows = vec![
            EntityRow::new("p1", "Classic Hoodie").with_brand("Northwind"),
            EntityRow::new("p2", "Trail Shoe").with_brand("Acme"),
        ];
        let engine = Arc::new(MemorySearchEngine::new());
        engine.create_index("products_1").await.unwrap();
        engine.promote("products", "products_1", "products_1").await.unwrap();
        for row in &rows {
            engine
                .upsert("products", DocumentMapper::new().map(row).unwrap())
                .await
                .unwrap();
        }
        let store = Arc::new(MemoryPrimaryStore::with_rows(rows));
        let cache = Arc::new(CacheStore::new(
            Arc::new(MemoryCacheBackend::new(100)),
            CacheConfig::in_memory(),
        ));
        let config = RouterConfig {
            search_timeout: Duration::from_millis(100),
            ..RouterConfig::default()
        };
        let router = QueryRouter::new(cache, engine.clone(), "products", store.clone(), config);
        Fixture {
            engine,
            store,
            router,
        }
    }

    async fn eventually_hit(router: &QueryRouter, id: &str) -> RoutedResponse {
        for _ in 0..50 {
            let response = router.entity(id).await.unwrap();
            if response.cache_status == CacheStatus::Hit {
                return response;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("entity {} never cached", id);
    }

    #[tokio::test]
    async fn test_miss_then_hit() {
        let f = fixture().await;
        let first = f.router.entity("p1").await.unwrap();
        assert_eq!(first.cache_status, CacheStatus::Miss);
        assert_eq!(first.freshness, Freshness::Fresh);
        assert_eq!(first.key.as_deref(), Some("entity:p1:v1"));

        let hit = eventually_hit(&f.router, "p1").await;
        assert_eq!(hit.freshness, Freshness::Cached);
        assert_eq!(hit.output, first.output);
    }

    #[tokio::test]
    async fn test_engine_down_falls_back_to_store() {
        let f = fixture().await;
        f.engine.set_available(false);

        let response = f.router.search(&SearchParams::text("HOODIE")).await.unwrap();
        assert_eq!(response.freshness, Freshness::Degraded);
        assert_eq!(response.cache_control.s_maxage, 0);
        match &response.output {
            QueryOutput::Page(page) => {
                assert_eq!(page.total, 1);
                assert_eq!(page.hits[0].id, "p1");
            }
            other => panic!("unexpected output {:?}", other),
        }

        // Degraded results are not cached
        tokio::time::sleep(Duration::from_millis(20)).await;
        let again = f.router.search(&SearchParams::text("hoodie")).await.unwrap();
        assert_eq!(again.cache_status, CacheStatus::Miss);
        assert_eq!(f.router.stats().degraded, 2);
    }

    #[tokio::test]
    async fn test_engine_timeout_falls_back() {
        let f = fixture().await;
        f.engine.set_latency(Duration::from_millis(500));

        let response = f.router.entity("p2").await.unwrap();
        assert_eq!(response.freshness, Freshness::Degraded);
    }

    #[tokio::test]
    async fn test_everything_down_is_unavailable() {
        let f = fixture().await;
        f.engine.set_available(false);
        f.store.set_available(false);

        let err = f.router.entity("p1").await.unwrap_err();
        assert!(matches!(err, RouterError::Unavailable(_)));
        assert_eq!(f.router.stats().unavailable, 1);
    }

    #[tokio::test]
    async fn test_invalid_request_never_reaches_backends() {
        let f = fixture().await;
        f.engine.set_available(false);
        f.store.set_available(false);

        let err = f.router.entity("bad id!").await.unwrap_err();
        assert!(matches!(err, RouterError::InvalidRequest { .. }));
        assert_eq!(f.router.cache().stats().misses, 0);
        assert_eq!(f.router.stats().rejected, 1);
    }

    #[tokio::test]
    async fn test_missing_entity_not_cached() {
        let f = fixture().await;
        let first = f.router.entity("nope").await.unwrap();
        assert_eq!(first.output, QueryOutput::Entity(None));

        tokio::time::sleep(Duration::from_millis(20)).await;
        let second = f.router.entity("nope").await.unwrap();
        assert_eq!(second.cache_status, CacheStatus::Miss);
    }

    #[tokio::test]
    async fn test_listing_and_search_use_separate_namespaces() {
        let f = fixture().await;
        let listing = f.router.search(&SearchParams::default()).await.unwrap();
        let search = f.router.search(&SearchParams::text("shoe")).await.unwrap();

        assert_eq!(listing.tier, ContentTier::Listing);
        assert!(listing.key.unwrap().starts_with("listing:"));
        assert_eq!(search.tier, ContentTier::Search);
        assert!(search.key.unwrap().starts_with("search:"));
    }

    /// Engine stand-in that parks inside `execute` until released
    struct GatedStrategy {
        entered: Arc<Notify>,
        release: Arc<Notify>,
        output: QueryOutput,
    }

    #[async_trait::async_trait]
    impl ReadStrategy for GatedStrategy {
        fn name(&self) -> &'static str {
            "gated"
        }

        fn freshness(&self) -> Freshness {
            Freshness::Fresh
        }

        fn timeout(&self) -> Duration {
            Duration::from_secs(5)
        }

        async fn execute(&self, _request: &QueryRequest) -> Result<QueryOutput, StrategyError> {
            self.entered.notify_one();
            self.release.notified().await;
            Ok(self.output.clone())
        }
    }

    #[tokio::test]
    async fn test_invalidation_during_read_is_not_overwritten() {
        let cache = Arc::new(CacheStore::new(
            Arc::new(MemoryCacheBackend::new(100)),
            CacheConfig::in_memory(),
        ));
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let stale = DocumentMapper::new()
            .map(&EntityRow::new("p1", "Old Hoodie"))
            .unwrap();
        let strategy: Arc<dyn ReadStrategy> = Arc::new(GatedStrategy {
            entered: entered.clone(),
            release: release.clone(),
            output: QueryOutput::Entity(Some(stale)),
        });
        let router = Arc::new(QueryRouter::with_strategies(
            cache.clone(),
            vec![strategy],
            RouterConfig::default(),
        ));
        let dispatcher = InvalidationDispatcher::new(cache.clone(), 10);

        let read = {
            let router = router.clone();
            tokio::spawn(async move { router.entity("p1").await })
        };
        entered.notified().await;
        dispatcher.invalidate_entity("p1").await;
        release.notify_one();

        let response = read.await.unwrap().unwrap();
        assert_eq!(response.cache_status, CacheStatus::Miss);
        assert_eq!(response.key.as_deref(), Some("entity:p1:v1"));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(cache.get("entity:p1:v1").await, None);

        // A read that starts after the invalidation is cached as usual
        release.notify_one();
        router.entity("p1").await.unwrap();
        let mut cached = None;
        for _ in 0..50 {
            cached = cache.get("entity:p1:v1").await;
            if cached.is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(cached.is_some());
    }
}
