// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Sync Coordinator - wires the store, engine, cache, index manager, change
//! listener and query router into one running service.

use log::info;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;

use crate::cache::{
    create_cache_backend, CacheBackend, CacheStatsSnapshot, CacheStore, ContentTier,
    InvalidationDispatcher, InvalidationStats,
};
use crate::changefeed::{
    change_feed, ChangeCaptureListener, ChangeFeedSender, ListenerHandle, ListenerStatsSnapshot,
};
use crate::config::ServiceConfig;
use crate::error::{SyncError, SyncResult};
use crate::index::{IndexManager, RebuildStatus};
use crate::router::{QueryRouter, RouterStatsSnapshot};
use crate::search::{MemorySearchEngine, SearchEngine};
use crate::store::{create_primary_store, PrimaryStore};

const INVALIDATION_HISTORY: usize = 1000;

/// Counters from every component, as served by the admin stats endpoint
#[derive(Debug, Clone, Serialize)]
pub struct ServiceStats {
    pub cache: CacheStatsSnapshot,
    pub cache_backend: &'static str,
    pub router: RouterStatsSnapshot,
    pub listener: ListenerStatsSnapshot,
    pub invalidation: InvalidationStats,
    pub index: RebuildStatus,
}

/// Sync Coordinator - owns every component of a running service
///
/// Reads go through [`Self::router`]. Writes go to [`Self::store`]; the store
/// publishes change events which the listener applies to the current index
/// generation.
pub struct SyncCoordinator {
    config: ServiceConfig,
    engine: Arc<dyn SearchEngine>,
    store: Arc<dyn PrimaryStore>,
    cache: Arc<CacheStore>,
    dispatcher: Arc<InvalidationDispatcher>,
    manager: Arc<IndexManager>,
    listener: Arc<ChangeCaptureListener>,
    router: Arc<QueryRouter>,
    feed: ChangeFeedSender,
    listener_handle: Mutex<Option<ListenerHandle>>,
}

impl SyncCoordinator {
    /// Create a coordinator from configuration (Simplified API)
    ///
    /// Opens the primary store and cache backend the configuration names,
    /// uses the in-process search engine, and starts the change listener.
    ///
    /// # Arguments
    /// * `config` - Service configuration; validated before anything opens
    ///
    /// # Returns
    /// * `Ok(Arc<SyncCoordinator>)` - Running coordinator with a current generation
    /// * `Err(SyncError)` - Invalid configuration or a component failed to start
    pub async fn from_config(config: ServiceConfig) -> SyncResult<Arc<Self>> {
        config.validate().map_err(SyncError::Config)?;

        let data_dir = config.server.data_dir.clone();
        let store_path = data_dir
            .as_ref()
            .map(|dir| dir.join("store"))
            .unwrap_or_default();
        let store = create_primary_store(config.server.store, store_path)?;
        let backend = create_cache_backend(&config.cache, data_dir.as_deref())?;
        let engine: Arc<dyn SearchEngine> = Arc::new(MemorySearchEngine::new());

        Self::from_parts(config, engine, store, backend).await
    }

    /// Create a coordinator from existing components (Advanced API)
    ///
    /// # Arguments
    /// * `config` - Service configuration
    /// * `engine` - Search engine holding the index generations
    /// * `store` - Primary store; receives the change feed sender
    /// * `backend` - Cache backend behind the cache store
    ///
    /// # Returns
    /// * `Ok(Arc<SyncCoordinator>)` - Running coordinator
    /// * `Err(SyncError)` - Bootstrap of the index failed
    pub async fn from_parts(
        config: ServiceConfig,
        engine: Arc<dyn SearchEngine>,
        store: Arc<dyn PrimaryStore>,
        backend: Arc<dyn CacheBackend>,
    ) -> SyncResult<Arc<Self>> {
        let cache = Arc::new(CacheStore::new(backend, config.cache.clone()));
        let advanced = cache
            .sync_versions(ContentTier::ALL.iter().map(|tier| tier.namespace()))
            .await;
        if advanced > 0 {
            info!("Restored {} namespace version(s) from the cache backend", advanced);
        }

        let dispatcher = Arc::new(InvalidationDispatcher::new(
            Arc::clone(&cache),
            INVALIDATION_HISTORY,
        ));

        let manager = Arc::new(
            IndexManager::new(
                Arc::clone(&engine),
                Arc::clone(&store),
                config.index.clone(),
            )
            .with_dispatcher(Arc::clone(&dispatcher)),
        );
        let generation = manager.bootstrap().await?;
        info!("Serving index generation '{}'", generation.name);

        let router = Arc::new(QueryRouter::new(
            Arc::clone(&cache),
            Arc::clone(&engine),
            manager.alias(),
            Arc::clone(&store),
            config.router.clone(),
        ));

        let (feed, receivers) =
            change_feed(config.listener.partitions, config.listener.channel_capacity);
        let listener = Arc::new(ChangeCaptureListener::new(
            Arc::clone(&manager),
            Arc::clone(&store),
            Arc::clone(&dispatcher),
            config.listener.clone(),
        ));
        let handle = listener.spawn(receivers);
        store.set_change_feed(feed.clone());

        Ok(Arc::new(Self {
            config,
            engine,
            store,
            cache,
            dispatcher,
            manager,
            listener,
            router,
            feed,
            listener_handle: Mutex::new(Some(handle)),
        }))
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn router(&self) -> &Arc<QueryRouter> {
        &self.router
    }

    pub fn index_manager(&self) -> &Arc<IndexManager> {
        &self.manager
    }

    pub fn dispatcher(&self) -> &Arc<InvalidationDispatcher> {
        &self.dispatcher
    }

    pub fn cache(&self) -> &Arc<CacheStore> {
        &self.cache
    }

    pub fn store(&self) -> &Arc<dyn PrimaryStore> {
        &self.store
    }

    pub fn engine(&self) -> &Arc<dyn SearchEngine> {
        &self.engine
    }

    pub fn listener(&self) -> &Arc<ChangeCaptureListener> {
        &self.listener
    }

    /// Sender for publishing change events from outside the primary store
    pub fn change_feed(&self) -> &ChangeFeedSender {
        &self.feed
    }

    pub fn stats(&self) -> ServiceStats {
        ServiceStats {
            cache: self.cache.stats(),
            cache_backend: self.cache.backend_name(),
            router: self.router.stats(),
            listener: self.listener.stats(),
            invalidation: self.dispatcher.stats(),
            index: self.manager.status(),
        }
    }

    /// Stop the listener workers and cancel any running rebuild
    pub async fn shutdown(&self) {
        self.manager.cancel();
        let handle = self.listener_handle.lock().take();
        if let Some(handle) = handle {
            handle.shutdown();
            handle.join().await;
        }
        info!("Sync coordinator stopped");
    }
}
