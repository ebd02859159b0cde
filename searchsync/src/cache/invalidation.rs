// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Invalidation dispatcher
//!
//! Single entry point for making cached reads stale. Collaborators describe
//! what changed with an [`InvalidationEvent`]; the dispatcher turns it into
//! direct key deletes and namespace version bumps on the [`CacheStore`].

use chrono::{DateTime, Utc};
use log::{debug, info};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::cache_config::ContentTier;
use super::store::CacheStore;

/// What changed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InvalidationEvent {
    /// One entity was written
    Entity { id: String },

    /// Every cached read in one namespace is stale
    Namespace { namespace: String },

    /// A category's products changed: listings, searches and facets
    Category { category: String },

    /// A tag's products changed: listings and searches
    Tag { tag: String },

    /// Bump every known namespace
    All,

    /// Physically delete a namespace's entries
    Purge { namespace: String },
}

/// Outcome of handling one event
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InvalidationResult {
    /// Physical keys removed
    pub keys_deleted: usize,
    /// Namespaces bumped, with their new version
    pub bumped: Vec<(String, u64)>,
    pub duration: Duration,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InvalidationStats {
    pub total_events: u64,
    pub entity_invalidations: u64,
    pub namespace_bumps: u64,
    pub keys_deleted: u64,
}

pub struct InvalidationDispatcher {
    cache: Arc<CacheStore>,

    /// Invalidation event history
    event_history: RwLock<VecDeque<(InvalidationEvent, InvalidationResult, DateTime<Utc>)>>,
    max_history_size: usize,

    stats: RwLock<InvalidationStats>,
}

impl InvalidationDispatcher {
    pub fn new(cache: Arc<CacheStore>, max_history_size: usize) -> Self {
        Self {
            cache,
            event_history: RwLock::new(VecDeque::new()),
            max_history_size,
            stats: RwLock::new(InvalidationStats::default()),
        }
    }

    pub fn cache(&self) -> &Arc<CacheStore> {
        &self.cache
    }

    /// Delete the entity's direct key
    pub async fn invalidate_entity(&self, id: &str) -> InvalidationResult {
        self.handle(InvalidationEvent::Entity { id: id.to_string() })
            .await
    }

    /// Bump one namespace; returns the new version
    pub async fn invalidate_namespace(&self, namespace: &str) -> u64 {
        let result = self
            .handle(InvalidationEvent::Namespace {
                namespace: namespace.to_string(),
            })
            .await;
        result.bumped.first().map(|(_, v)| *v).unwrap_or_default()
    }

    /// Bump every known namespace
    pub async fn invalidate_all(&self) -> InvalidationResult {
        self.handle(InvalidationEvent::All).await
    }

    /// Remove a namespace's entries from the backend
    pub async fn purge_namespace(&self, namespace: &str) -> usize {
        self.handle(InvalidationEvent::Purge {
            namespace: namespace.to_string(),
        })
        .await
        .keys_deleted
    }

    /// Namespaces bumped by [`InvalidationEvent::All`]: every content tier
    /// plus any namespace a counter exists for
    pub fn known_namespaces(&self) -> Vec<String> {
        let mut names: BTreeSet<String> = ContentTier::ALL
            .iter()
            .map(|t| t.namespace().to_string())
            .collect();
        names.extend(self.cache.versions().namespaces());
        names.into_iter().collect()
    }

    pub async fn handle(&self, event: InvalidationEvent) -> InvalidationResult {
        let start_time = Instant::now();
        let mut result = InvalidationResult::default();

        match &event {
            InvalidationEvent::Entity { id } => {
                let key = self.cache.key_builder().entity_key(id);
                if self.cache.del(&key).await {
                    result.keys_deleted = 1;
                }
                debug!("Invalidated entity '{}' ({})", id, key);
            }
            InvalidationEvent::Namespace { namespace } => {
                self.bump(namespace, &mut result).await;
            }
            InvalidationEvent::Category { .. } => {
                for tier in [ContentTier::Listing, ContentTier::Search, ContentTier::Facets] {
                    self.bump(tier.namespace(), &mut result).await;
                }
            }
            InvalidationEvent::Tag { .. } => {
                for tier in [ContentTier::Listing, ContentTier::Search] {
                    self.bump(tier.namespace(), &mut result).await;
                }
            }
            InvalidationEvent::All => {
                for namespace in self.known_namespaces() {
                    self.bump(&namespace, &mut result).await;
                }
                info!("Invalidated all cache namespaces");
            }
            InvalidationEvent::Purge { namespace } => {
                result.keys_deleted = self.cache.del_pattern(&format!("{}:*", namespace)).await;
                info!(
                    "Purged {} entries from namespace '{}'",
                    result.keys_deleted, namespace
                );
            }
        }

        result.duration = start_time.elapsed();

        {
            let mut stats = self.stats.write();
            stats.total_events += 1;
            if matches!(event, InvalidationEvent::Entity { .. }) {
                stats.entity_invalidations += 1;
            }
            stats.namespace_bumps += result.bumped.len() as u64;
            stats.keys_deleted += result.keys_deleted as u64;
        }
        self.record_event_result(event, result.clone());

        result
    }

    async fn bump(&self, namespace: &str, result: &mut InvalidationResult) {
        let version = self.cache.incr_version(namespace).await;
        debug!("Namespace '{}' now at v{}", namespace, version);
        result.bumped.push((namespace.to_string(), version));
    }

    fn record_event_result(&self, event: InvalidationEvent, result: InvalidationResult) {
        let mut history = self.event_history.write();
        history.push_back((event, result, Utc::now()));
        while history.len() > self.max_history_size {
            history.pop_front();
        }
    }

    pub fn stats(&self) -> InvalidationStats {
        self.stats.read().clone()
    }

    /// Most recent events first
    pub fn recent_events(
        &self,
        limit: usize,
    ) -> Vec<(InvalidationEvent, InvalidationResult, DateTime<Utc>)> {
        let history = self.event_history.read();
        history.iter().rev().take(limit).cloned().collect()
    }
}
