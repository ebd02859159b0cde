// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Two-level cache: in-process L1 in front of a shared L2
//!
//! L1 lifetimes are capped at `l1_ttl`, which bounds how long one process can
//! serve a value another process already deleted from L2. Counters are owned
//! by L2.

use async_trait::async_trait;
use log::debug;
use std::sync::Arc;
use std::time::Duration;

use super::memory::MemoryCacheBackend;
use super::traits::CacheBackend;
use crate::cache::errors::CacheResult;

pub struct TieredCacheBackend {
    l1: MemoryCacheBackend,
    l2: Arc<dyn CacheBackend>,
    l1_ttl: Duration,
}

impl TieredCacheBackend {
    pub fn new(l1_max_entries: usize, l1_ttl: Duration, l2: Arc<dyn CacheBackend>) -> Self {
        Self {
            l1: MemoryCacheBackend::new(l1_max_entries),
            l2,
            l1_ttl,
        }
    }

    pub fn l1(&self) -> &MemoryCacheBackend {
        &self.l1
    }
}

#[async_trait]
impl CacheBackend for TieredCacheBackend {
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        if let Some(value) = self.l1.get(key).await? {
            return Ok(Some(value));
        }
        let value = self.l2.get(key).await?;
        if let Some(value) = &value {
            debug!("Promoting '{}' from {} to L1", key, self.l2.name());
            self.l1.set(key, value.clone(), self.l1_ttl).await?;
        }
        Ok(value)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> CacheResult<()> {
        self.l1.set(key, value.clone(), ttl.min(self.l1_ttl)).await?;
        self.l2.set(key, value, ttl).await
    }

    async fn del(&self, key: &str) -> CacheResult<bool> {
        let in_l1 = self.l1.del(key).await?;
        let in_l2 = self.l2.del(key).await?;
        Ok(in_l1 || in_l2)
    }

    async fn del_pattern(&self, pattern: &str) -> CacheResult<usize> {
        self.l1.del_pattern(pattern).await?;
        self.l2.del_pattern(pattern).await
    }

    async fn incr(&self, key: &str) -> CacheResult<u64> {
        self.l2.incr(key).await
    }

    async fn counter(&self, key: &str) -> CacheResult<Option<u64>> {
        self.l2.counter(key).await
    }

    fn name(&self) -> &'static str {
        "tiered"
    }
}
