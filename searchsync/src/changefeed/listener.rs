// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Change capture listener
//!
//! One worker per feed partition applies events to the current index
//! generation, then invalidates the cache for what changed. Delivery is
//! at-least-once: upserts are idempotent by id and deleting a missing
//! document is not an error. An event that cannot be mapped or applied is
//! logged in full and counted as a dead letter; the worker moves on.

use log::{debug, error, info};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use super::event::{ChangeEvent, ChangeOperation};
use crate::cache::{ContentTier, InvalidationDispatcher};
use crate::document::{DocumentMapper, MapError};
use crate::index::{IndexManager, IndexManagerError};
use crate::store::{PrimaryStore, StoreError};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Number of feed partitions (one worker each)
    pub partitions: usize,

    /// Bounded capacity per partition
    pub channel_capacity: usize,

    /// Invalidate the entity key and bump `bump_namespaces` after each apply.
    /// When off, cached reads stay stale until an explicit revalidate or TTL.
    pub invalidate_on_apply: bool,

    pub bump_namespaces: Vec<String>,

    /// Upper bound for applying one event
    pub apply_timeout: Duration,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            partitions: 4,
            channel_capacity: 1024,
            invalidate_on_apply: true,
            bump_namespaces: vec![
                ContentTier::Search.namespace().to_string(),
                ContentTier::Listing.namespace().to_string(),
            ],
            apply_timeout: Duration::from_secs(5),
        }
    }
}

impl ListenerConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.partitions == 0 {
            return Err("Listener partitions must be > 0".to_string());
        }
        if self.channel_capacity == 0 {
            return Err("Listener channel_capacity must be > 0".to_string());
        }
        if self.apply_timeout.is_zero() {
            return Err("Listener apply_timeout must be > 0".to_string());
        }
        Ok(())
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ListenerError {
    #[error("Mapping failed: {0}")]
    Map(#[from] MapError),

    #[error("Index write failed: {0}")]
    Index(#[from] IndexManagerError),

    #[error("Primary store read failed: {0}")]
    Store(#[from] StoreError),

    #[error("Apply timed out after {0:?}")]
    Timeout(Duration),
}

/// What applying an event did to the index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Upserted,
    Deleted,
    /// Delete of a document that was not indexed
    AlreadyAbsent,
}

#[derive(Debug, Default)]
pub struct ListenerStats {
    received: AtomicU64,
    upserts: AtomicU64,
    deletes: AtomicU64,
    row_fetches: AtomicU64,
    dead_letters: AtomicU64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ListenerStatsSnapshot {
    pub received: u64,
    pub upserts: u64,
    pub deletes: u64,
    pub row_fetches: u64,
    pub dead_letters: u64,
}

impl ListenerStats {
    pub fn snapshot(&self) -> ListenerStatsSnapshot {
        ListenerStatsSnapshot {
            received: self.received.load(Ordering::Relaxed),
            upserts: self.upserts.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
            row_fetches: self.row_fetches.load(Ordering::Relaxed),
            dead_letters: self.dead_letters.load(Ordering::Relaxed),
        }
    }
}

pub struct ChangeCaptureListener {
    manager: Arc<IndexManager>,
    store: Arc<dyn PrimaryStore>,
    dispatcher: Arc<InvalidationDispatcher>,
    mapper: DocumentMapper,
    config: ListenerConfig,
    stats: ListenerStats,
}

impl ChangeCaptureListener {
    pub fn new(
        manager: Arc<IndexManager>,
        store: Arc<dyn PrimaryStore>,
        dispatcher: Arc<InvalidationDispatcher>,
        config: ListenerConfig,
    ) -> Self {
        Self {
            manager,
            store,
            dispatcher,
            mapper: DocumentMapper::new(),
            config,
            stats: ListenerStats::default(),
        }
    }

    pub fn config(&self) -> &ListenerConfig {
        &self.config
    }

    pub fn stats(&self) -> ListenerStatsSnapshot {
        self.stats.snapshot()
    }

    /// Apply one event to the current generation, without invalidation.
    ///
    /// An upsert without a snapshot re-reads the row; if the row is gone the
    /// event is treated as a delete.
    pub async fn apply_event(&self, event: &ChangeEvent) -> Result<ApplyOutcome, ListenerError> {
        let id = event.entity_id.trim();
        match event.operation {
            ChangeOperation::Delete => self.delete(id).await,
            ChangeOperation::Upsert => {
                let row = match &event.row {
                    Some(row) => Some(row.clone()),
                    None => {
                        self.stats.row_fetches.fetch_add(1, Ordering::Relaxed);
                        self.store.get(id).await?
                    }
                };
                let Some(row) = row else {
                    debug!("Row '{}' vanished before upsert; deleting", id);
                    return self.delete(id).await;
                };
                let document = self.mapper.map(&row)?;
                self.manager.apply_upsert(document).await?;
                Ok(ApplyOutcome::Upserted)
            }
        }
    }

    async fn delete(&self, id: &str) -> Result<ApplyOutcome, ListenerError> {
        if self.manager.apply_delete(id).await? {
            Ok(ApplyOutcome::Deleted)
        } else {
            Ok(ApplyOutcome::AlreadyAbsent)
        }
    }

    /// Apply, invalidate and account for one event. Never fails: a broken
    /// event is dead-lettered.
    pub async fn process(&self, event: ChangeEvent) -> Option<ApplyOutcome> {
        self.stats.received.fetch_add(1, Ordering::Relaxed);

        let timeout = self.config.apply_timeout;
        let result = tokio::time::timeout(timeout, self.apply_event(&event))
            .await
            .unwrap_or(Err(ListenerError::Timeout(timeout)));

        match result {
            Ok(outcome) => {
                match outcome {
                    ApplyOutcome::Upserted => self.stats.upserts.fetch_add(1, Ordering::Relaxed),
                    ApplyOutcome::Deleted | ApplyOutcome::AlreadyAbsent => {
                        self.stats.deletes.fetch_add(1, Ordering::Relaxed)
                    }
                };
                if self.config.invalidate_on_apply {
                    self.dispatcher.invalidate_entity(event.entity_id.trim()).await;
                    for namespace in &self.config.bump_namespaces {
                        self.dispatcher.invalidate_namespace(namespace).await;
                    }
                }
                Some(outcome)
            }
            Err(e) => {
                self.stats.dead_letters.fetch_add(1, Ordering::Relaxed);
                error!(
                    "Dropping change event for '{}' ({}): {} | event={}",
                    event.entity_id,
                    event.operation,
                    e,
                    event.to_log_json()
                );
                None
            }
        }
    }

    /// Start one worker per receiver
    pub fn spawn(self: &Arc<Self>, receivers: Vec<mpsc::Receiver<ChangeEvent>>) -> ListenerHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let tasks = receivers
            .into_iter()
            .enumerate()
            .map(|(partition, rx)| {
                let listener = Arc::clone(self);
                let shutdown = shutdown_rx.clone();
                tokio::spawn(listener.run_partition(partition, rx, shutdown))
            })
            .collect();
        info!("Change capture listener started");
        ListenerHandle {
            listener: Arc::clone(self),
            shutdown: shutdown_tx,
            tasks,
        }
    }

    async fn run_partition(
        self: Arc<Self>,
        partition: usize,
        mut rx: mpsc::Receiver<ChangeEvent>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        debug!("Listener partition {} running", partition);
        loop {
            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                event = rx.recv() => match event {
                    Some(event) => {
                        self.process(event).await;
                    }
                    None => break,
                },
            }
        }
        debug!("Listener partition {} stopped", partition);
    }
}

/// Running listener workers
pub struct ListenerHandle {
    listener: Arc<ChangeCaptureListener>,
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl ListenerHandle {
    pub fn listener(&self) -> &Arc<ChangeCaptureListener> {
        &self.listener
    }

    pub fn stats(&self) -> ListenerStatsSnapshot {
        self.listener.stats()
    }

    /// Signal workers to stop after their current event
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }

    /// Wait for every worker to exit
    pub async fn join(self) {
        for task in self.tasks {
            let _ = task.await;
        }
        info!("Change capture listener stopped");
    }
}
