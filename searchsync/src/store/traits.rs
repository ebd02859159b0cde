// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Primary store capability
//!
//! The primary store is the authoritative source of entity rows. The index
//! manager pages through it during rebuilds, the listener re-reads rows for
//! events without a snapshot, and the router queries it directly when the
//! search engine is down.

use async_trait::async_trait;

use super::types::{StoreKind, StoreResult};
use crate::changefeed::ChangeFeedSender;
use crate::document::EntityRow;
use crate::search::{FacetCounts, FacetQuery, SearchPage, SearchQuery};

#[async_trait]
pub trait PrimaryStore: Send + Sync {
    /// Fetch one row by id
    async fn get(&self, id: &str) -> StoreResult<Option<EntityRow>>;

    /// Keyset page ordered by id, starting strictly after `after`
    async fn page(&self, after: Option<&str>, limit: usize) -> StoreResult<Vec<EntityRow>>;

    /// Fallback search: case-insensitive substring match on name and brand
    async fn search(&self, query: &SearchQuery) -> StoreResult<SearchPage>;

    /// Fallback facet counts over active rows
    async fn facets(&self, query: &FacetQuery) -> StoreResult<FacetCounts>;

    /// Insert or replace a row, emitting an upsert change event
    async fn upsert(&self, row: EntityRow) -> StoreResult<()>;

    /// Hard-delete a row, emitting a delete change event.
    /// Returns false if no such row existed.
    async fn delete(&self, id: &str) -> StoreResult<bool>;

    /// Number of stored rows
    async fn count(&self) -> StoreResult<usize>;

    /// Route change events for subsequent writes to `feed`
    fn set_change_feed(&self, feed: ChangeFeedSender);

    fn kind(&self) -> StoreKind;
}
