// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! In-memory primary store

use async_trait::async_trait;
use log::warn;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

use super::fallback;
use super::traits::PrimaryStore;
use super::types::{StoreError, StoreKind, StoreResult};
use crate::changefeed::{ChangeEvent, ChangeFeedSender};
use crate::document::EntityRow;
use crate::search::{FacetCounts, FacetQuery, SearchPage, SearchQuery};

/// Rows kept in an ordered map keyed by trimmed id
pub struct MemoryPrimaryStore {
    rows: RwLock<BTreeMap<String, EntityRow>>,
    feed: RwLock<Option<ChangeFeedSender>>,
    available: AtomicBool,
    /// Held from commit through publish so events leave in commit order
    write_order: Mutex<()>,
}

impl Default for MemoryPrimaryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryPrimaryStore {
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(BTreeMap::new()),
            feed: RwLock::new(None),
            available: AtomicBool::new(true),
            write_order: Mutex::new(()),
        }
    }

    /// Seed rows without emitting change events. Rows without an id are ignored.
    pub fn with_rows(rows: impl IntoIterator<Item = EntityRow>) -> Self {
        let store = Self::new();
        {
            let mut map = store.rows.write();
            for row in rows {
                if let Some(id) = row.entity_id().map(str::to_string) {
                    map.insert(id, row);
                }
            }
        }
        store
    }

    /// Write a row without emitting a change event, as a direct SQL
    /// write that bypasses change capture would.
    pub fn put_silent(&self, row: EntityRow) -> StoreResult<()> {
        let id = row.entity_id().ok_or(StoreError::MissingId)?.to_string();
        self.rows.write().insert(id, row);
        Ok(())
    }

    /// Simulate an outage
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn check(&self) -> StoreResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable(
                "memory store marked unavailable".to_string(),
            ))
        }
    }

    async fn emit(&self, event: ChangeEvent) {
        let feed = self.feed.read().clone();
        if let Some(feed) = feed {
            if let Err(e) = feed.send(event).await {
                warn!("Failed to publish change event: {}", e);
            }
        }
    }
}

#[async_trait]
impl PrimaryStore for MemoryPrimaryStore {
    async fn get(&self, id: &str) -> StoreResult<Option<EntityRow>> {
        self.check()?;
        Ok(self.rows.read().get(id.trim()).cloned())
    }

    async fn page(&self, after: Option<&str>, limit: usize) -> StoreResult<Vec<EntityRow>> {
        self.check()?;
        let rows = self.rows.read();
        let lower = match after {
            Some(after) => Bound::Excluded(after.to_string()),
            None => Bound::Unbounded,
        };
        Ok(rows
            .range((lower, Bound::Unbounded))
            .take(limit)
            .map(|(_, row)| row.clone())
            .collect())
    }

    async fn search(&self, query: &SearchQuery) -> StoreResult<SearchPage> {
        self.check()?;
        let rows = self.rows.read();
        Ok(fallback::search_rows(rows.values(), query))
    }

    async fn facets(&self, query: &FacetQuery) -> StoreResult<FacetCounts> {
        self.check()?;
        let rows = self.rows.read();
        Ok(fallback::facet_rows(rows.values(), query))
    }

    async fn upsert(&self, row: EntityRow) -> StoreResult<()> {
        self.check()?;
        let id = row.entity_id().ok_or(StoreError::MissingId)?.to_string();
        let _ordered = self.write_order.lock().await;
        self.rows.write().insert(id.clone(), row.clone());
        self.emit(ChangeEvent::upsert(id, Some(row))).await;
        Ok(())
    }

    async fn delete(&self, id: &str) -> StoreResult<bool> {
        self.check()?;
        let id = id.trim().to_string();
        let _ordered = self.write_order.lock().await;
        let removed = self.rows.write().remove(&id).is_some();
        if removed {
            self.emit(ChangeEvent::delete(id)).await;
        }
        Ok(removed)
    }

    async fn count(&self) -> StoreResult<usize> {
        self.check()?;
        Ok(self.rows.read().len())
    }

    fn set_change_feed(&self, feed: ChangeFeedSender) {
        *self.feed.write() = Some(feed);
    }

    fn kind(&self) -> StoreKind {
        StoreKind::Memory
    }
}
