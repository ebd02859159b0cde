// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Cache backend capability

use async_trait::async_trait;
use std::time::Duration;

use crate::cache::errors::CacheResult;

/// Key/value store with TTLs, glob deletion and counters
///
/// Counters live apart from TTL entries and never expire.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>>;

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> CacheResult<()>;

    /// Returns whether the key existed
    async fn del(&self, key: &str) -> CacheResult<bool>;

    /// Delete every key matching a glob (`*` and `?`); returns the count
    async fn del_pattern(&self, pattern: &str) -> CacheResult<usize>;

    /// Increment a counter (missing counters start at 0) and return the new value
    async fn incr(&self, key: &str) -> CacheResult<u64>;

    /// Read a counter without changing it
    async fn counter(&self, key: &str) -> CacheResult<Option<u64>>;

    fn name(&self) -> &'static str;
}
