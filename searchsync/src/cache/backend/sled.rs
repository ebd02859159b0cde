// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Sled cache backend
//!
//! Entries are bincode-encoded with an absolute expiry in epoch millis and
//! removed lazily on read. Counters live in a separate tree as big-endian u64.
//! Every tree access runs on the blocking pool.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use super::glob_to_regex;
use super::traits::CacheBackend;
use crate::blocking::run_blocking;
use crate::cache::cache_config::MAX_TTL;
use crate::cache::errors::CacheResult;

const ENTRY_TREE: &str = "cache_entries";
const COUNTER_TREE: &str = "cache_counters";

#[derive(Debug, Serialize, Deserialize)]
struct SledEntry {
    value: Vec<u8>,
    expires_at_ms: i64,
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn decode_counter(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    if bytes.len() == 8 {
        buf.copy_from_slice(bytes);
    }
    u64::from_be_bytes(buf)
}

pub struct SledCacheBackend {
    db: sled::Db,
    entries: sled::Tree,
    counters: sled::Tree,
}

impl SledCacheBackend {
    pub fn open<P: AsRef<Path>>(path: P) -> CacheResult<Self> {
        let db = sled::open(path)?;
        let entries = db.open_tree(ENTRY_TREE)?;
        let counters = db.open_tree(COUNTER_TREE)?;
        Ok(Self {
            db,
            entries,
            counters,
        })
    }

    /// Drop every expired entry; returns how many were removed
    pub fn purge_expired(&self) -> CacheResult<usize> {
        let now = now_ms();
        let mut removed = 0;
        for item in self.entries.iter() {
            let (key, value) = item?;
            let expired = bincode::deserialize::<SledEntry>(&value)
                .map(|e| e.expires_at_ms <= now)
                .unwrap_or(true);
            if expired {
                self.entries.remove(key)?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    pub fn flush(&self) -> CacheResult<()> {
        self.db.flush()?;
        Ok(())
    }
}

#[async_trait]
impl CacheBackend for SledCacheBackend {
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        let entries = self.entries.clone();
        let key = key.to_string();
        run_blocking(move || -> CacheResult<Option<Vec<u8>>> {
            let Some(bytes) = entries.get(key.as_bytes())? else {
                return Ok(None);
            };
            let entry: SledEntry = bincode::deserialize(&bytes)?;
            if entry.expires_at_ms <= now_ms() {
                entries.remove(key.as_bytes())?;
                return Ok(None);
            }
            Ok(Some(entry.value))
        })
        .await
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> CacheResult<()> {
        let entries = self.entries.clone();
        let key = key.to_string();
        run_blocking(move || -> CacheResult<()> {
            let entry = SledEntry {
                value,
                expires_at_ms: now_ms() + ttl.min(MAX_TTL).as_millis() as i64,
            };
            entries.insert(key.as_bytes(), bincode::serialize(&entry)?)?;
            Ok(())
        })
        .await
    }

    async fn del(&self, key: &str) -> CacheResult<bool> {
        let entries = self.entries.clone();
        let key = key.to_string();
        run_blocking(move || -> CacheResult<bool> {
            Ok(entries.remove(key.as_bytes())?.is_some())
        })
        .await
    }

    async fn del_pattern(&self, pattern: &str) -> CacheResult<usize> {
        let regex = glob_to_regex(pattern)?;
        let entries = self.entries.clone();
        run_blocking(move || -> CacheResult<usize> {
            let mut removed = 0;
            for key in entries.iter().keys() {
                let key = key?;
                if regex.is_match(&String::from_utf8_lossy(&key)) {
                    entries.remove(key)?;
                    removed += 1;
                }
            }
            Ok(removed)
        })
        .await
    }

    async fn incr(&self, key: &str) -> CacheResult<u64> {
        let counters = self.counters.clone();
        let key = key.to_string();
        run_blocking(move || -> CacheResult<u64> {
            let updated = counters.update_and_fetch(key.as_bytes(), |old| {
                let next = old.map(decode_counter).unwrap_or(0) + 1;
                Some(next.to_be_bytes().to_vec())
            })?;
            Ok(updated.map(|v| decode_counter(&v)).unwrap_or(0))
        })
        .await
    }

    async fn counter(&self, key: &str) -> CacheResult<Option<u64>> {
        let counters = self.counters.clone();
        let key = key.to_string();
        run_blocking(move || -> CacheResult<Option<u64>> {
            Ok(counters.get(key.as_bytes())?.map(|v| decode_counter(&v)))
        })
        .await
    }

    fn name(&self) -> &'static str {
        "sled"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_sled_entries_expire() {
        let temp_dir = TempDir::new().unwrap();
        let backend = SledCacheBackend::open(temp_dir.path()).unwrap();

        backend
            .set("entity:p1:v1", b"doc".to_vec(), Duration::from_secs(60))
            .await
            .unwrap();
        backend
            .set("entity:p2:v1", b"doc".to_vec(), Duration::ZERO)
            .await
            .unwrap();

        assert_eq!(
            backend.get("entity:p1:v1").await.unwrap(),
            Some(b"doc".to_vec())
        );
        assert_eq!(backend.get("entity:p2:v1").await.unwrap(), None);
        assert_eq!(backend.purge_expired().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_sled_unbounded_ttl_is_clamped() {
        let temp_dir = TempDir::new().unwrap();
        let backend = SledCacheBackend::open(temp_dir.path()).unwrap();

        backend
            .set("facets:abc1234:v1", vec![7], Duration::MAX)
            .await
            .unwrap();
        assert_eq!(backend.get("facets:abc1234:v1").await.unwrap(), Some(vec![7]));
    }

    #[tokio::test]
    async fn test_sled_counters() {
        let temp_dir = TempDir::new().unwrap();
        let backend = SledCacheBackend::open(temp_dir.path()).unwrap();
        assert_eq!(backend.counter("version:search").await.unwrap(), None);
        assert_eq!(backend.incr("version:search").await.unwrap(), 1);
        assert_eq!(backend.incr("version:search").await.unwrap(), 2);
        backend.flush().unwrap();
        assert_eq!(backend.counter("version:search").await.unwrap(), Some(2));
        assert_eq!(backend.counter("version:listing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_sled_del_pattern() {
        let temp_dir = TempDir::new().unwrap();
        let backend = SledCacheBackend::open(temp_dir.path()).unwrap();
        let ttl = Duration::from_secs(60);
        backend.set("facets:a:v1", vec![1], ttl).await.unwrap();
        backend.set("facets:b:v1", vec![1], ttl).await.unwrap();
        backend.set("search:a:v1", vec![1], ttl).await.unwrap();

        assert_eq!(backend.del_pattern("facets:*").await.unwrap(), 2);
        assert!(backend.del("search:a:v1").await.unwrap());
    }
}
