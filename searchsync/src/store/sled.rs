// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Sled-backed primary store
//!
//! Rows are stored as JSON in a single tree keyed by id. sled keeps keys
//! sorted, so keyset paging is a range scan. Tree access runs on the blocking
//! pool so router and cache timeouts can abandon a slow call.

use async_trait::async_trait;
use log::warn;
use parking_lot::RwLock;
use std::ops::Bound;
use std::path::Path;
use tokio::sync::Mutex;

use super::fallback;
use super::traits::PrimaryStore;
use super::types::{StoreError, StoreKind, StoreResult};
use crate::blocking::run_blocking;
use crate::changefeed::{ChangeEvent, ChangeFeedSender};
use crate::document::EntityRow;
use crate::search::{FacetCounts, FacetQuery, SearchPage, SearchQuery};

const ENTITY_TREE: &str = "entities";

pub struct SledPrimaryStore {
    db: sled::Db,
    tree: sled::Tree,
    feed: RwLock<Option<ChangeFeedSender>>,
    /// Held from commit through publish so events leave in commit order
    write_order: Mutex<()>,
}

impl SledPrimaryStore {
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let db = sled::open(path)?;
        let tree = db.open_tree(ENTITY_TREE)?;
        Ok(Self {
            db,
            tree,
            feed: RwLock::new(None),
            write_order: Mutex::new(()),
        })
    }

    pub fn flush(&self) -> StoreResult<()> {
        self.db.flush()?;
        Ok(())
    }

    fn decode(bytes: &[u8]) -> StoreResult<EntityRow> {
        Ok(serde_json::from_slice(bytes)?)
    }

    fn all_rows(tree: &sled::Tree) -> StoreResult<Vec<EntityRow>> {
        tree.iter()
            .values()
            .map(|value| Self::decode(&value?))
            .collect()
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
impl PrimaryStore for SledPrimaryStore {
    async fn get(&self, id: &str) -> StoreResult<Option<EntityRow>> {
        let tree = self.tree.clone();
        let id = id.trim().to_string();
        run_blocking(move || -> StoreResult<Option<EntityRow>> {
            match tree.get(id.as_bytes())? {
                Some(bytes) => Ok(Some(SledPrimaryStore::decode(&bytes)?)),
                None => Ok(None),
            }
        })
        .await
    }

    async fn page(&self, after: Option<&str>, limit: usize) -> StoreResult<Vec<EntityRow>> {
        let tree = self.tree.clone();
        let lower = match after {
            Some(after) => Bound::Excluded(after.as_bytes().to_vec()),
            None => Bound::Unbounded,
        };
        run_blocking(move || -> StoreResult<Vec<EntityRow>> {
            tree.range::<Vec<u8>, _>((lower, Bound::Unbounded))
                .values()
                .take(limit)
                .map(|value| SledPrimaryStore::decode(&value?))
                .collect()
        })
        .await
    }

    async fn search(&self, query: &SearchQuery) -> StoreResult<SearchPage> {
        let tree = self.tree.clone();
        let query = query.clone();
        run_blocking(move || -> StoreResult<SearchPage> {
            let rows = SledPrimaryStore::all_rows(&tree)?;
            Ok(fallback::search_rows(&rows, &query))
        })
        .await
    }

    async fn facets(&self, query: &FacetQuery) -> StoreResult<FacetCounts> {
        let tree = self.tree.clone();
        let query = query.clone();
        run_blocking(move || -> StoreResult<FacetCounts> {
            let rows = SledPrimaryStore::all_rows(&tree)?;
            Ok(fallback::facet_rows(&rows, &query))
        })
        .await
    }

    async fn upsert(&self, row: EntityRow) -> StoreResult<()> {
        let id = row.entity_id().ok_or(StoreError::MissingId)?.to_string();
        let bytes = serde_json::to_vec(&row)?;

        let _ordered = self.write_order.lock().await;
        let tree = self.tree.clone();
        let key = id.clone();
        run_blocking(move || -> StoreResult<()> {
            tree.insert(key.as_bytes(), bytes)?;
            Ok(())
        })
        .await?;
        self.emit(ChangeEvent::upsert(id, Some(row))).await;
        Ok(())
    }

    async fn delete(&self, id: &str) -> StoreResult<bool> {
        let id = id.trim().to_string();

        let _ordered = self.write_order.lock().await;
        let tree = self.tree.clone();
        let key = id.clone();
        let removed = run_blocking(move || -> StoreResult<bool> {
            Ok(tree.remove(key.as_bytes())?.is_some())
        })
        .await?;
        if removed {
            self.emit(ChangeEvent::delete(id)).await;
        }
        Ok(removed)
    }

    async fn count(&self) -> StoreResult<usize> {
        let tree = self.tree.clone();
        run_blocking(move || -> StoreResult<usize> { Ok(tree.len()) }).await
    }

    fn set_change_feed(&self, feed: ChangeFeedSender) {
        *self.feed.write() = Some(feed);
    }

    fn kind(&self) -> StoreKind {
        StoreKind::Sled
    }
}
