// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Bounded in-process cache backend

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use super::glob_to_regex;
use super::traits::CacheBackend;
use crate::cache::cache_config::MAX_TTL;
use crate::cache::errors::{CacheError, CacheResult};

#[derive(Debug, Clone)]
struct MemoryEntry {
    value: Vec<u8>,
    expires_at: Instant,
}

impl MemoryEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Entries plus an expiry-ordered index over the same keys
#[derive(Default)]
struct Entries {
    map: HashMap<String, MemoryEntry>,
    by_expiry: BTreeSet<(Instant, String)>,
}

impl Entries {
    fn len(&self) -> usize {
        self.map.len()
    }

    fn insert(&mut self, key: String, entry: MemoryEntry) {
        self.by_expiry.insert((entry.expires_at, key.clone()));
        if let Some(old) = self.map.insert(key.clone(), entry) {
            self.by_expiry.remove(&(old.expires_at, key));
        }
    }

    fn remove(&mut self, key: &str) -> Option<MemoryEntry> {
        let entry = self.map.remove(key)?;
        self.by_expiry.remove(&(entry.expires_at, key.to_string()));
        Some(entry)
    }

    /// Remove the entry that expires first
    fn pop_soonest(&mut self) -> Option<(String, MemoryEntry)> {
        let (_, key) = self.by_expiry.pop_first()?;
        let entry = self.map.remove(&key)?;
        Some((key, entry))
    }

    fn soonest_expiry(&self) -> Option<Instant> {
        self.by_expiry.first().map(|(at, _)| *at)
    }
}

/// HashMap-backed cache. When full, expired entries go first, then the
/// entry closest to expiry.
pub struct MemoryCacheBackend {
    entries: RwLock<Entries>,
    counters: Mutex<HashMap<String, u64>>,
    max_entries: usize,
    available: AtomicBool,
    latency_ms: AtomicU64,
}

impl MemoryCacheBackend {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: RwLock::new(Entries::default()),
            counters: Mutex::new(HashMap::new()),
            max_entries: max_entries.max(1),
            available: AtomicBool::new(true),
            latency_ms: AtomicU64::new(0),
        }
    }

    /// Simulate an outage: every call fails
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Delay every call by `latency`
    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms
            .store(latency.as_millis() as u64, Ordering::SeqCst);
    }

    /// Live (unexpired) entry count
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .map
            .values()
            .filter(|e| !e.is_expired(now))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    async fn gate(&self) -> CacheResult<()> {
        let latency = self.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(CacheError::Unavailable(
                "memory cache marked unavailable".to_string(),
            ))
        }
    }

    /// Evict until one more entry fits. Each eviction is a pop from the
    /// front of the expiry index, so expired entries leave before live ones.
    fn make_room(&self, entries: &mut Entries) {
        let now = Instant::now();
        while entries.soonest_expiry().is_some_and(|at| at <= now) {
            entries.pop_soonest();
        }
        while entries.len() >= self.max_entries {
            if entries.pop_soonest().is_none() {
                break;
            }
        }
    }
}

#[async_trait]
impl CacheBackend for MemoryCacheBackend {
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        self.gate().await?;
        let now = Instant::now();
        let entries = self.entries.read();
        Ok(entries
            .map
            .get(key)
            .filter(|e| !e.is_expired(now))
            .map(|e| e.value.clone()))
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> CacheResult<()> {
        self.gate().await?;
        let entry = MemoryEntry {
            value,
            expires_at: Instant::now() + ttl.min(MAX_TTL),
        };
        let mut entries = self.entries.write();
        if !entries.map.contains_key(key) {
            self.make_room(&mut entries);
        }
        entries.insert(key.to_string(), entry);
        Ok(())
    }

    async fn del(&self, key: &str) -> CacheResult<bool> {
        self.gate().await?;
        let now = Instant::now();
        let removed = self.entries.write().remove(key);
        Ok(removed.is_some_and(|e| !e.is_expired(now)))
    }

    async fn del_pattern(&self, pattern: &str) -> CacheResult<usize> {
        self.gate().await?;
        let regex = glob_to_regex(pattern)?;
        let mut entries = self.entries.write();
        let matched: Vec<String> = entries
            .map
            .keys()
            .filter(|key| regex.is_match(key))
            .cloned()
            .collect();
        for key in &matched {
            entries.remove(key);
        }
        Ok(matched.len())
    }

    async fn incr(&self, key: &str) -> CacheResult<u64> {
        self.gate().await?;
        let mut counters = self.counters.lock();
        let value = counters.entry(key.to_string()).or_insert(0);
        *value += 1;
        Ok(*value)
    }

    async fn counter(&self, key: &str) -> CacheResult<Option<u64>> {
        self.gate().await?;
        Ok(self.counters.lock().get(key).copied())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_and_expiry() {
        let backend = MemoryCacheBackend::new(10);
        backend
            .set("a", b"1".to_vec(), Duration::from_secs(60))
            .await
            .unwrap();
        backend
            .set("b", b"2".to_vec(), Duration::from_millis(20))
            .await
            .unwrap();

        assert_eq!(backend.get("a").await.unwrap(), Some(b"1".to_vec()));
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(backend.get("b").await.unwrap(), None);
        assert_eq!(backend.len(), 1);
    }

    #[tokio::test]
    async fn test_capacity_evicts_soonest_expiry() {
        let backend = MemoryCacheBackend::new(2);
        backend.set("short", vec![1], Duration::from_secs(5)).await.unwrap();
        backend.set("long", vec![2], Duration::from_secs(500)).await.unwrap();
        backend.set("new", vec![3], Duration::from_secs(50)).await.unwrap();

        assert_eq!(backend.get("short").await.unwrap(), None);
        assert!(backend.get("long").await.unwrap().is_some());
        assert!(backend.get("new").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_expired_entries_leave_before_live_ones() {
        let backend = MemoryCacheBackend::new(3);
        backend.set("stale", vec![1], Duration::from_millis(10)).await.unwrap();
        backend.set("live-a", vec![2], Duration::from_secs(5)).await.unwrap();
        backend.set("live-b", vec![3], Duration::from_secs(50)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;

        backend.set("new", vec![4], Duration::from_secs(60)).await.unwrap();
        assert!(backend.get("live-a").await.unwrap().is_some());
        assert!(backend.get("live-b").await.unwrap().is_some());
        assert!(backend.get("new").await.unwrap().is_some());
        assert_eq!(backend.len(), 3);
    }

    #[tokio::test]
    async fn test_eviction_index_follows_overwrites_and_deletes() {
        let backend = MemoryCacheBackend::new(3);
        backend.set("a", vec![1], Duration::from_secs(1)).await.unwrap();
        backend.set("b", vec![2], Duration::from_secs(20)).await.unwrap();
        backend.set("c", vec![3], Duration::from_secs(30)).await.unwrap();

        // Overwriting "a" with a long TTL makes "b" the soonest expiry
        backend.set("a", vec![9], Duration::from_secs(100)).await.unwrap();
        backend.set("d", vec![4], Duration::from_secs(40)).await.unwrap();
        assert_eq!(backend.get("b").await.unwrap(), None);
        assert_eq!(backend.get("a").await.unwrap(), Some(vec![9]));

        assert!(backend.del("c").await.unwrap());
        assert_eq!(backend.del_pattern("d").await.unwrap(), 1);
        backend.set("e", vec![5], Duration::from_secs(5)).await.unwrap();
        backend.set("f", vec![6], Duration::from_secs(6)).await.unwrap();
        assert_eq!(backend.len(), 3);

        // Full again: the next insert evicts "e", never a deleted key
        backend.set("g", vec![7], Duration::from_secs(70)).await.unwrap();
        assert_eq!(backend.get("e").await.unwrap(), None);
        assert!(backend.get("a").await.unwrap().is_some());
        assert!(backend.get("f").await.unwrap().is_some());
        assert!(backend.get("g").await.unwrap().is_some());

        let entries = backend.entries.read();
        assert_eq!(entries.map.len(), entries.by_expiry.len());
    }

    #[tokio::test]
    async fn test_unbounded_ttl_is_clamped() {
        let backend = MemoryCacheBackend::new(10);
        backend.set("forever", vec![1], Duration::MAX).await.unwrap();
        assert_eq!(backend.get("forever").await.unwrap(), Some(vec![1]));
    }

    #[tokio::test]
    async fn test_del_pattern() {
        let backend = MemoryCacheBackend::new(10);
        let ttl = Duration::from_secs(60);
        backend.set("search:abc:v1", vec![1], ttl).await.unwrap();
        backend.set("search:def:v2", vec![1], ttl).await.unwrap();
        backend.set("listing:abc:v1", vec![1], ttl).await.unwrap();

        assert_eq!(backend.del_pattern("search:*").await.unwrap(), 2);
        assert!(backend.get("listing:abc:v1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_counters() {
        let backend = MemoryCacheBackend::new(10);
        assert_eq!(backend.counter("version:search").await.unwrap(), None);
        assert_eq!(backend.incr("version:search").await.unwrap(), 1);
        assert_eq!(backend.incr("version:search").await.unwrap(), 2);
        assert_eq!(backend.counter("version:search").await.unwrap(), Some(2));
    }

    #[tokio::test]
    async fn test_unavailable_backend_errors() {
        let backend = MemoryCacheBackend::new(10);
        backend.set_available(false);
        assert!(matches!(
            backend.get("a").await,
            Err(CacheError::Unavailable(_))
        ));
    }
}
