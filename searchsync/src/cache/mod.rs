// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Read-through cache layer
//!
//! - [`key_builder`]: deterministic keys and namespace version counters
//! - [`backend`]: memory, sled and tiered backends
//! - [`store`]: timeout-bounded, failure-swallowing facade
//! - [`invalidation`]: entity and namespace invalidation

pub mod backend;
pub mod cache_config;
pub mod errors;
pub mod invalidation;
pub mod key_builder;
pub mod store;

pub use backend::{create_cache_backend, CacheBackend};
pub use cache_config::{
    CacheBackendKind, CacheConfig, ContentTier, TierPolicy, TierTable, MAX_TTL,
};
pub use errors::{CacheError, CacheResult};
pub use invalidation::{
    InvalidationDispatcher, InvalidationEvent, InvalidationResult, InvalidationStats,
};
pub use key_builder::{CacheKeyBuilder, VersionCounters};
pub use store::{CacheStatsSnapshot, CacheStore};
