// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Blue/green index generations
//!
//! The manager owns the current-generation pointer. User reads go through
//! the engine alias (the base name); incremental writes from the change
//! listener go to the generation the pointer holds at the time of the write.
//!
//! A rebuild populates `{base}_{v}_temp` from the primary store, waits for
//! every bulk write to be acknowledged, then promotes it in one engine call
//! (rename + alias swap). Any entity the listener touched while the rebuild
//! ran is re-read from the primary store and re-applied to the new
//! generation after the swap.

use arc_swap::ArcSwapOption;
use chrono::Utc;
use log::{debug, error, info, warn};
use parking_lot::{Mutex, RwLock};
use std::collections::HashSet;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::errors::{IndexManagerError, IndexResult};
use super::generation::{generation_name, parse_name, temp_name, Generation};
use super::index_config::IndexConfig;
use super::report::{RebuildOutcome, RebuildReport, RebuildStatus, RebuildStep, RebuildTrigger};
use crate::cache::InvalidationDispatcher;
use crate::document::{DocumentMapper, SearchDocument};
use crate::search::{BulkHandle, SearchEngine, SearchError};
use crate::store::PrimaryStore;

/// Holds the single rebuild slot; releases it on drop
pub struct RebuildGuard {
    flag: Arc<AtomicBool>,
}

impl Drop for RebuildGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

pub struct IndexManager {
    engine: Arc<dyn SearchEngine>,
    store: Arc<dyn PrimaryStore>,
    mapper: DocumentMapper,
    config: IndexConfig,
    current: ArcSwapOption<Generation>,
    rebuilding: Arc<AtomicBool>,
    cancel_requested: AtomicBool,
    pending_replay: Mutex<HashSet<String>>,
    last_report: RwLock<Option<RebuildReport>>,
    dispatcher: Option<Arc<InvalidationDispatcher>>,
}

impl IndexManager {
    pub fn new(
        engine: Arc<dyn SearchEngine>,
        store: Arc<dyn PrimaryStore>,
        config: IndexConfig,
    ) -> Self {
        Self {
            engine,
            store,
            mapper: DocumentMapper::new(),
            config,
            current: ArcSwapOption::empty(),
            rebuilding: Arc::new(AtomicBool::new(false)),
            cancel_requested: AtomicBool::new(false),
            pending_replay: Mutex::new(HashSet::new()),
            last_report: RwLock::new(None),
            dispatcher: None,
        }
    }

    /// Invalidate every cache namespace after each successful swap
    pub fn with_dispatcher(mut self, dispatcher: Arc<InvalidationDispatcher>) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// Name user reads go through
    pub fn alias(&self) -> &str {
        &self.config.base_name
    }

    pub fn engine(&self) -> &Arc<dyn SearchEngine> {
        &self.engine
    }

    pub fn current(&self) -> Option<Arc<Generation>> {
        self.current.load_full()
    }

    pub fn is_rebuilding(&self) -> bool {
        self.rebuilding.load(Ordering::SeqCst)
    }

    pub fn status(&self) -> RebuildStatus {
        RebuildStatus {
            running: self.is_rebuilding(),
            current: self.current().map(|g| (*g).clone()),
            last_report: self.last_report.read().clone(),
        }
    }

    /// Adopt the generation the alias points to, or create an empty first one
    pub async fn bootstrap(&self) -> IndexResult<Arc<Generation>> {
        let base = self.config.base_name.clone();

        if let Some(target) = self.engine.resolve_alias(&base).await? {
            if let Some(parsed) = parse_name(&base, &target) {
                let generation = Arc::new(Generation {
                    name: target.clone(),
                    version: parsed.version,
                    activated_at: Utc::now(),
                });
                self.current.store(Some(generation.clone()));
                info!("Adopted index generation '{}'", target);
                return Ok(generation);
            }
            warn!(
                "Alias '{}' points to unrecognized index '{}'; creating a new generation",
                base, target
            );
        }

        let version = self.next_version().await?;
        let name = generation_name(&base, version);
        match self.engine.create_index(&name).await {
            Ok(()) | Err(SearchError::IndexExists(_)) => {}
            Err(e) => return Err(e.into()),
        }
        self.engine.promote(&base, &name, &name).await?;

        let generation = Arc::new(Generation::new(&base, version));
        self.current.store(Some(generation.clone()));
        info!("Created initial index generation '{}'", name);
        Ok(generation)
    }

    fn try_begin(&self) -> Option<RebuildGuard> {
        self.rebuilding
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| {
                self.cancel_requested.store(false, Ordering::SeqCst);
                self.pending_replay.lock().clear();
                RebuildGuard {
                    flag: self.rebuilding.clone(),
                }
            })
    }

    /// Run a rebuild to completion on the calling task
    pub async fn rebuild(&self) -> IndexResult<RebuildReport> {
        let guard = self
            .try_begin()
            .ok_or(IndexManagerError::RebuildInProgress)?;
        self.run_guarded(guard).await
    }

    /// Start a rebuild in the background. Coalesces with a running one.
    pub fn trigger(self: &Arc<Self>) -> RebuildTrigger {
        let Some(guard) = self.try_begin() else {
            debug!("Rebuild already running; trigger coalesced");
            return RebuildTrigger::AlreadyRunning;
        };
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            // Outcome is logged and kept in the last report
            let _ = manager.run_guarded(guard).await;
        });
        RebuildTrigger::Started
    }

    /// Ask a running rebuild to stop at the next batch boundary
    pub fn cancel(&self) -> bool {
        if self.is_rebuilding() {
            self.cancel_requested.store(true, Ordering::SeqCst);
            true
        } else {
            false
        }
    }

    async fn run_guarded(&self, _guard: RebuildGuard) -> IndexResult<RebuildReport> {
        let start_time = Instant::now();
        let mut report = RebuildReport::started(Utc::now());
        info!("Index rebuild started for '{}'", self.config.base_name);

        let result = self.run_steps(&mut report).await;
        report.duration_ms = start_time.elapsed().as_millis() as u64;

        match &result {
            Ok(()) => {
                info!(
                    "Index rebuild finished: '{}' with {} documents ({} skipped, {} replayed) in {} ms",
                    report.generation.as_deref().unwrap_or("?"),
                    report.documents_indexed,
                    report.rows_skipped,
                    report.replayed,
                    report.duration_ms
                );
            }
            Err(IndexManagerError::Cancelled) => {
                report.outcome = RebuildOutcome::Cancelled;
                info!("Index rebuild cancelled after {} ms", report.duration_ms);
            }
            Err(IndexManagerError::RebuildFailed { step, reason }) => {
                report.outcome = RebuildOutcome::Failed {
                    step: *step,
                    reason: reason.clone(),
                };
                error!("Index rebuild failed at step {}: {}", step, reason);
            }
            Err(other) => {
                report.outcome = RebuildOutcome::Failed {
                    step: RebuildStep::Populate,
                    reason: other.to_string(),
                };
                error!("Index rebuild failed: {}", other);
            }
        }

        self.pending_replay.lock().clear();
        *self.last_report.write() = Some(report.clone());
        result.map(|()| report)
    }

    async fn run_steps(&self, report: &mut RebuildReport) -> IndexResult<()> {
        let base = self.config.base_name.clone();
        let version = self
            .with_retries(RebuildStep::CreateTemp, || async {
                self.next_version().await.map_err(|e| e.to_string())
            })
            .await?;
        let temp = temp_name(&base, version);
        let target = generation_name(&base, version);

        // Step 1
        self.with_retries(RebuildStep::CreateTemp, || async {
            if self.engine.delete_index(&temp).await.map_err(|e| e.to_string())? {
                warn!("Removed stale temp generation '{}'", temp);
            }
            self.engine
                .create_index(&temp)
                .await
                .map_err(|e| e.to_string())
        })
        .await?;

        // Steps 2 and 3
        if let Err(e) = self.populate(&temp, report).await {
            self.discard_temp(&temp).await;
            return Err(e);
        }
        if self.cancel_requested.load(Ordering::SeqCst) {
            self.discard_temp(&temp).await;
            return Err(IndexManagerError::Cancelled);
        }

        // Step 4
        let swapped = self
            .with_retries(RebuildStep::Swap, || async {
                self.engine
                    .promote(&base, &temp, &target)
                    .await
                    .map_err(|e| e.to_string())
            })
            .await;
        let replaced = match swapped {
            Ok(replaced) => replaced,
            Err(e) => {
                self.discard_temp(&temp).await;
                return Err(e);
            }
        };
        let previous = replaced.or_else(|| self.current().map(|g| g.name.clone()));
        self.current
            .store(Some(Arc::new(Generation::new(&base, version))));
        info!(
            "Swapped alias '{}' to '{}' (was {:?})",
            base, target, previous
        );
        report.generation = Some(target.clone());
        report.previous = previous.clone();

        // Step 5
        if let Some(old) = previous.filter(|old| *old != target) {
            let deleted = self
                .with_retries(RebuildStep::DeleteOld, || async {
                    self.engine
                        .delete_index(&old)
                        .await
                        .map_err(|e| e.to_string())
                })
                .await;
            if let Err(e) = deleted {
                warn!("Old generation '{}' left behind: {}", old, e);
            }
        }

        // Step 6
        report.replayed = self.replay(&target).await;

        if let Some(dispatcher) = &self.dispatcher {
            dispatcher.invalidate_all().await;
        }
        Ok(())
    }

    async fn populate(&self, temp: &str, report: &mut RebuildReport) -> IndexResult<()> {
        let batch_size = self.config.batch_size;
        let mut after: Option<String> = None;
        let mut pending: Vec<(BulkHandle, Vec<SearchDocument>)> = Vec::new();

        loop {
            if self.cancel_requested.load(Ordering::SeqCst) {
                return Err(IndexManagerError::Cancelled);
            }

            let rows = self
                .with_retries(RebuildStep::Populate, || async {
                    self.store
                        .page(after.as_deref(), batch_size)
                        .await
                        .map_err(|e| e.to_string())
                })
                .await?;
            if rows.is_empty() {
                break;
            }
            let last_id = rows.last().and_then(|r| r.entity_id()).map(str::to_string);

            let (documents, failures) = self.mapper.map_batch(&rows);
            for (id, err) in &failures {
                warn!("Skipping row {:?} during rebuild: {}", id, err);
            }
            report.rows_skipped += failures.len();

            if !documents.is_empty() {
                let handle = self.enqueue(temp, &documents).await?;
                pending.push((handle, documents));
            }

            if rows.len() < batch_size || last_id.is_none() {
                break;
            }
            after = last_id;
        }

        debug!("Waiting for {} bulk operations on '{}'", pending.len(), temp);
        for (handle, documents) in pending {
            report.documents_indexed += self.acknowledge(temp, handle, &documents).await?;
        }
        Ok(())
    }

    async fn enqueue(&self, index: &str, documents: &[SearchDocument]) -> IndexResult<BulkHandle> {
        self.with_retries(RebuildStep::Populate, || async {
            self.engine
                .bulk_upsert(index, documents.to_vec())
                .await
                .map_err(|e| e.to_string())
        })
        .await
    }

    /// Wait for one bulk write; a rejected batch is re-sent
    async fn acknowledge(
        &self,
        index: &str,
        handle: BulkHandle,
        documents: &[SearchDocument],
    ) -> IndexResult<usize> {
        let attempts = self.config.step_retries.max(1);
        let mut handle = handle;
        let mut attempt = 0;
        loop {
            attempt += 1;
            let outcome =
                tokio::time::timeout(self.config.bulk_timeout, self.engine.await_bulk(&handle))
                    .await
                    .unwrap_or(Err(SearchError::Timeout(self.config.bulk_timeout)));
            let reason = match outcome {
                Ok(report) => return Ok(report.applied),
                Err(e) => e.to_string(),
            };
            if attempt >= attempts {
                return Err(IndexManagerError::rebuild_failed(
                    RebuildStep::AwaitBulk,
                    reason,
                ));
            }
            warn!(
                "Bulk operation {} failed (attempt {}/{}): {}",
                handle.id, attempt, attempts, reason
            );
            tokio::time::sleep(self.backoff(attempt)).await;
            handle = self.enqueue(index, documents).await.map_err(|e| match e {
                IndexManagerError::RebuildFailed { reason, .. } => {
                    IndexManagerError::rebuild_failed(RebuildStep::AwaitBulk, reason)
                }
                other => other,
            })?;
        }
    }

    async fn discard_temp(&self, temp: &str) {
        match self.engine.delete_index(temp).await {
            Ok(_) => debug!("Discarded temp generation '{}'", temp),
            Err(e) => warn!("Could not discard temp generation '{}': {}", temp, e),
        }
    }

    /// Re-apply entities changed while the rebuild ran
    async fn replay(&self, target: &str) -> usize {
        let ids: Vec<String> = self.pending_replay.lock().drain().collect();
        let mut replayed = 0;
        for id in ids {
            let applied = match self.store.get(&id).await {
                Ok(Some(row)) => match self.mapper.map(&row) {
                    Ok(doc) => self.engine.upsert(target, doc).await.map(|_| ()),
                    Err(e) => {
                        warn!("Replay of '{}' dropped unmappable row: {}", id, e);
                        self.engine.delete(target, &id).await.map(|_| ())
                    }
                },
                Ok(None) => self.engine.delete(target, &id).await.map(|_| ()),
                Err(e) => {
                    warn!("Replay of '{}' could not read the primary store: {}", id, e);
                    continue;
                }
            };
            match applied {
                Ok(()) => replayed += 1,
                Err(e) => warn!("Replay of '{}' failed: {}", id, e),
            }
        }
        if replayed > 0 {
            info!("Replayed {} entities into '{}'", replayed, target);
        }
        replayed
    }

    async fn next_version(&self) -> IndexResult<u64> {
        let base = &self.config.base_name;
        let existing = self
            .engine
            .list_indexes()
            .await?
            .iter()
            .filter_map(|name| parse_name(base, name))
            .map(|parsed| parsed.version)
            .max()
            .unwrap_or(0);
        let current = self.current().map(|g| g.version).unwrap_or(0);
        Ok(existing.max(current) + 1)
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let base = self.config.retry_backoff.as_millis() as u64;
        let exp = base.saturating_mul(1u64 << attempt.saturating_sub(1).min(10));
        Duration::from_millis(exp + fastrand::u64(0..=base))
    }

    async fn with_retries<T, F, Fut>(&self, step: RebuildStep, mut op: F) -> IndexResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, String>>,
    {
        let attempts = self.config.step_retries.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            match op().await {
                Ok(value) => return Ok(value),
                Err(reason) if attempt >= attempts => {
                    return Err(IndexManagerError::rebuild_failed(step, reason));
                }
                Err(reason) => {
                    warn!(
                        "Rebuild step {} failed (attempt {}/{}): {}",
                        step, attempt, attempts, reason
                    );
                    tokio::time::sleep(self.backoff(attempt)).await;
                }
            }
        }
    }

    /// Remove leftover generations other than the current one
    pub async fn cleanup_orphans(&self) -> IndexResult<Vec<String>> {
        let Some(_guard) = self.try_begin() else {
            return Err(IndexManagerError::RebuildInProgress);
        };
        let base = &self.config.base_name;
        let current = self.current().map(|g| g.name.clone());
        let aliased = self.engine.resolve_alias(base).await?;

        let mut removed = Vec::new();
        for name in self.engine.list_indexes().await? {
            if parse_name(base, &name).is_none()
                || Some(&name) == current.as_ref()
                || Some(&name) == aliased.as_ref()
            {
                continue;
            }
            if self.engine.delete_index(&name).await? {
                info!("Removed orphan generation '{}'", name);
                removed.push(name);
            }
        }
        Ok(removed)
    }

    fn note_change(&self, id: &str) {
        if self.is_rebuilding() {
            self.pending_replay.lock().insert(id.to_string());
        }
    }

    /// Upsert into the current generation (listener write path)
    pub async fn apply_upsert(&self, document: SearchDocument) -> IndexResult<()> {
        self.note_change(&document.id);
        let generation = self
            .current()
            .ok_or(IndexManagerError::NoCurrentGeneration)?;
        match self
            .engine
            .upsert(&generation.name, document.clone())
            .await
        {
            Err(SearchError::IndexNotFound(_)) => {
                let latest = self.swapped_since(&generation)?;
                Ok(self.engine.upsert(&latest.name, document).await?)
            }
            other => Ok(other?),
        }
    }

    /// Delete from the current generation (listener write path)
    pub async fn apply_delete(&self, id: &str) -> IndexResult<bool> {
        self.note_change(id);
        let generation = self
            .current()
            .ok_or(IndexManagerError::NoCurrentGeneration)?;
        match self.engine.delete(&generation.name, id).await {
            Err(SearchError::IndexNotFound(_)) => {
                let latest = self.swapped_since(&generation)?;
                Ok(self.engine.delete(&latest.name, id).await?)
            }
            other => Ok(other?),
        }
    }

    /// The generation that replaced `seen`, if a swap happened meanwhile
    fn swapped_since(&self, seen: &Generation) -> IndexResult<Arc<Generation>> {
        match self.current() {
            Some(latest) if latest.name != seen.name => Ok(latest),
            _ => Err(SearchError::IndexNotFound(seen.name.clone()).into()),
        }
    }
}
