// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Timeout-bounded cache facade
//!
//! [`CacheStore`] is the only way the rest of the crate touches a cache
//! backend. Every call is bounded by `operation_timeout`; failures are
//! counted and logged, then turned into a miss (reads) or dropped (writes),
//! so a cache outage never fails a request.

use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::backend::CacheBackend;
use super::cache_config::{CacheConfig, ContentTier};
use super::errors::{CacheError, CacheResult};
use super::key_builder::{CacheKeyBuilder, VersionCounters, INITIAL_VERSION};

/// Cache access counters
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    sets: AtomicU64,
    deletes: AtomicU64,
    timeouts: AtomicU64,
    errors: AtomicU64,
}

/// Point-in-time copy of [`CacheStats`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStatsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub sets: u64,
    pub deletes: u64,
    pub timeouts: u64,
    pub errors: u64,
}

impl CacheStatsSnapshot {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

impl CacheStats {
    pub fn snapshot(&self) -> CacheStatsSnapshot {
        CacheStatsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            sets: self.sets.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

/// Striped invalidation epochs fencing in-flight write-backs
const INVALIDATION_STRIPES: usize = 64;

fn version_key(namespace: &str) -> String {
    format!("version:{}", namespace)
}

pub struct CacheStore {
    backend: Arc<dyn CacheBackend>,
    versions: Arc<VersionCounters>,
    config: CacheConfig,
    stats: CacheStats,
    invalidations: [AtomicU64; INVALIDATION_STRIPES],
}

impl CacheStore {
    pub fn new(backend: Arc<dyn CacheBackend>, config: CacheConfig) -> Self {
        Self {
            backend,
            versions: Arc::new(VersionCounters::new()),
            config,
            stats: CacheStats::default(),
            invalidations: std::array::from_fn(|_| AtomicU64::new(0)),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn versions(&self) -> &Arc<VersionCounters> {
        &self.versions
    }

    /// Key builder reading this store's version counters
    pub fn key_builder(&self) -> CacheKeyBuilder {
        CacheKeyBuilder::new(self.versions.clone())
    }

    /// Configured TTL for a content tier
    pub fn ttl_for(&self, tier: ContentTier) -> Duration {
        self.config.policy(tier).ttl
    }

    pub fn stats(&self) -> CacheStatsSnapshot {
        self.stats.snapshot()
    }

    async fn bounded<T, F>(&self, op: &str, key: &str, fut: F) -> CacheResult<T>
    where
        F: Future<Output = CacheResult<T>>,
    {
        let timeout = self.config.operation_timeout;
        match tokio::time::timeout(timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                self.stats.errors.fetch_add(1, Ordering::Relaxed);
                Err(e)
            }
            Err(_) => {
                self.stats.timeouts.fetch_add(1, Ordering::Relaxed);
                debug!("Cache {} '{}' timed out after {:?}", op, key, timeout);
                Err(CacheError::Timeout(timeout))
            }
        }
    }

    /// Raw lookup. Backend errors and timeouts read as a miss.
    pub async fn get(&self, key: &str) -> Option<Vec<u8>> {
        if !self.config.enabled {
            return None;
        }
        match self.bounded("get", key, self.backend.get(key)).await {
            Ok(Some(value)) => {
                self.stats.hits.fetch_add(1, Ordering::Relaxed);
                Some(value)
            }
            Ok(None) => {
                self.stats.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            Err(e) => {
                self.stats.misses.fetch_add(1, Ordering::Relaxed);
                debug!("Cache get '{}' treated as miss: {}", key, e);
                None
            }
        }
    }

    /// Typed lookup; undecodable payloads are deleted and read as a miss
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let bytes = self.get(key).await?;
        match serde_json::from_slice(&bytes) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Dropping undecodable cache entry '{}': {}", key, e);
                self.del(key).await;
                None
            }
        }
    }

    /// Write an entry. Returns whether the write landed; failures are logged.
    pub async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> bool {
        if !self.config.enabled {
            return false;
        }
        match self.bounded("set", key, self.backend.set(key, value, ttl)).await {
            Ok(()) => {
                self.stats.sets.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(e) => {
                warn!("Cache set '{}' failed: {}", key, e);
                false
            }
        }
    }

    pub async fn set_json<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) -> bool {
        match serde_json::to_vec(value) {
            Ok(bytes) => self.set(key, bytes, ttl).await,
            Err(e) => {
                warn!("Cache set '{}' skipped, serialization failed: {}", key, e);
                false
            }
        }
    }

    fn stripe(&self, key: &str) -> &AtomicU64 {
        &self.invalidations[crc32fast::hash(key.as_bytes()) as usize % INVALIDATION_STRIPES]
    }

    /// Current invalidation epoch for `key`. Any delete touching the key
    /// advances it.
    pub fn invalidation_epoch(&self, key: &str) -> u64 {
        self.stripe(key).load(Ordering::SeqCst)
    }

    fn mark_invalidated(&self, key: &str) {
        self.stripe(key).fetch_add(1, Ordering::SeqCst);
    }

    fn mark_all_invalidated(&self) {
        for stripe in &self.invalidations {
            stripe.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Fire-and-forget write of a value computed while the key's epoch was
    /// `epoch`. The write is skipped when a delete touched the key since
    /// then, and undone when one lands while the write is in flight.
    pub fn spawn_write_back(
        self: &Arc<Self>,
        key: String,
        value: Vec<u8>,
        ttl: Duration,
        epoch: u64,
    ) {
        if !self.config.enabled {
            return;
        }
        if self.invalidation_epoch(&key) != epoch {
            debug!("Skipping write-back of '{}', invalidated during read", key);
            return;
        }
        let store = Arc::clone(self);
        tokio::spawn(async move {
            if store.invalidation_epoch(&key) != epoch {
                debug!("Skipping write-back of '{}', invalidated during read", key);
                return;
            }
            if store.set(&key, value, ttl).await && store.invalidation_epoch(&key) != epoch {
                debug!("Write-back of '{}' raced an invalidation, removing", key);
                store.del(&key).await;
            }
        });
    }

    /// Delete an entry. In-flight write-backs for the key are fenced off
    /// before the backend call.
    pub async fn del(&self, key: &str) -> bool {
        self.mark_invalidated(key);
        match self.bounded("del", key, self.backend.del(key)).await {
            Ok(existed) => {
                self.stats.deletes.fetch_add(1, Ordering::Relaxed);
                existed
            }
            Err(e) => {
                warn!("Cache del '{}' failed: {}", key, e);
                false
            }
        }
    }

    /// Delete by glob; returns the number of removed entries (0 on failure)
    pub async fn del_pattern(&self, pattern: &str) -> usize {
        self.mark_all_invalidated();
        match self
            .bounded("del_pattern", pattern, self.backend.del_pattern(pattern))
            .await
        {
            Ok(removed) => {
                self.stats
                    .deletes
                    .fetch_add(removed as u64, Ordering::Relaxed);
                removed
            }
            Err(e) => {
                warn!("Cache del_pattern '{}' failed: {}", pattern, e);
                0
            }
        }
    }

    /// Bump a namespace version and mirror the bump to the backend.
    ///
    /// The local counter always advances, so invalidation takes effect in
    /// this process even when the backend is down.
    pub async fn incr_version(&self, namespace: &str) -> u64 {
        let local = self.versions.bump(namespace);
        let key = version_key(namespace);
        match self.bounded("incr", &key, self.backend.incr(&key)).await {
            Ok(bumps) => self.versions.observe(namespace, INITIAL_VERSION + bumps),
            Err(e) => {
                warn!("Version mirror for '{}' failed: {}", namespace, e);
                local
            }
        }
    }

    /// Seed local counters from the backend so keys built after a restart
    /// never reuse an earlier version. Returns how many namespaces advanced.
    pub async fn sync_versions<I, S>(&self, namespaces: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut advanced = 0;
        for namespace in namespaces {
            let namespace = namespace.as_ref();
            let key = version_key(namespace);
            match self.bounded("counter", &key, self.backend.counter(&key)).await {
                Ok(Some(bumps)) => {
                    let before = self.versions.current(namespace);
                    if self.versions.observe(namespace, INITIAL_VERSION + bumps) > before {
                        advanced += 1;
                    }
                }
                Ok(None) => {}
                Err(e) => warn!("Could not read version for '{}': {}", namespace, e),
            }
        }
        advanced
    }
}
