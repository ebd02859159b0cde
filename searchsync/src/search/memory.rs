// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! In-memory search engine
//!
//! Reference implementation of [`SearchEngine`] used by the default service
//! wiring and by tests. Bulk writes are applied on a spawned task and
//! acknowledged through a oneshot channel, the same shape real engines expose
//! as task ids. Availability and latency can be toggled at runtime to
//! exercise fallback and timeout paths.

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use uuid::Uuid;

use super::errors::{SearchError, SearchResult};
use super::query::{FacetCounts, FacetQuery, SearchPage, SearchQuery};
use super::traits::{BulkHandle, BulkReport, SearchEngine};
use crate::document::SearchDocument;

type IndexData = Arc<RwLock<BTreeMap<String, SearchDocument>>>;

/// In-memory engine with named indexes and aliases
pub struct MemorySearchEngine {
    indexes: Arc<RwLock<HashMap<String, IndexData>>>,
    aliases: Arc<RwLock<HashMap<String, String>>>,
    pending: Mutex<HashMap<Uuid, oneshot::Receiver<SearchResult<usize>>>>,
    available: AtomicBool,
    fail_bulk: Arc<AtomicBool>,
    latency_ms: AtomicU64,
}

impl Default for MemorySearchEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySearchEngine {
    pub fn new() -> Self {
        Self {
            indexes: Arc::new(RwLock::new(HashMap::new())),
            aliases: Arc::new(RwLock::new(HashMap::new())),
            pending: Mutex::new(HashMap::new()),
            available: AtomicBool::new(true),
            fail_bulk: Arc::new(AtomicBool::new(false)),
            latency_ms: AtomicU64::new(0),
        }
    }

    /// Simulate an outage: every call fails with `Unavailable`
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Make acknowledged bulk writes fail
    pub fn set_fail_bulk(&self, fail: bool) {
        self.fail_bulk.store(fail, Ordering::SeqCst);
    }

    /// Delay every call by `latency`
    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms
            .store(latency.as_millis() as u64, Ordering::SeqCst);
    }

    async fn gate(&self) -> SearchResult<()> {
        let latency = self.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(SearchError::unavailable("memory engine marked unavailable"))
        }
    }

    fn resolve(&self, name: &str) -> SearchResult<IndexData> {
        // Lock order: aliases, then indexes (same as promote)
        let aliases = self.aliases.read();
        let target = aliases.get(name).map(String::as_str).unwrap_or(name);
        self.indexes
            .read()
            .get(target)
            .cloned()
            .ok_or_else(|| SearchError::IndexNotFound(name.to_string()))
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Every query token must prefix-match a token of some field. Returns the
/// accumulated weight, or `None` when the document does not match.
fn score(doc: &SearchDocument, query_tokens: &[String]) -> Option<u32> {
    if query_tokens.is_empty() {
        return Some(0);
    }

    let fields: Vec<(Vec<String>, u32)> = doc
        .weighted_fields()
        .into_iter()
        .map(|(text, weight)| (tokenize(text), weight))
        .collect();

    let mut total = 0;
    for query_token in query_tokens {
        let mut best = 0;
        for (tokens, weight) in &fields {
            for token in tokens {
                if token == query_token {
                    best = best.max(weight * 2);
                } else if token.starts_with(query_token.as_str()) {
                    best = best.max(*weight);
                }
            }
        }
        if best == 0 {
            return None;
        }
        total += best;
    }
    Some(total)
}

#[async_trait]
impl SearchEngine for MemorySearchEngine {
    async fn create_index(&self, name: &str) -> SearchResult<()> {
        self.gate().await?;
        let mut indexes = self.indexes.write();
        if indexes.contains_key(name) {
            return Err(SearchError::IndexExists(name.to_string()));
        }
        indexes.insert(name.to_string(), Arc::new(RwLock::new(BTreeMap::new())));
        Ok(())
    }

    async fn delete_index(&self, name: &str) -> SearchResult<bool> {
        self.gate().await?;
        Ok(self.indexes.write().remove(name).is_some())
    }

    async fn list_indexes(&self) -> SearchResult<Vec<String>> {
        self.gate().await?;
        let mut names: Vec<String> = self.indexes.read().keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn resolve_alias(&self, alias: &str) -> SearchResult<Option<String>> {
        self.gate().await?;
        Ok(self.aliases.read().get(alias).cloned())
    }

    async fn promote(&self, alias: &str, from: &str, to: &str) -> SearchResult<Option<String>> {
        self.gate().await?;
        let mut aliases = self.aliases.write();
        let mut indexes = self.indexes.write();

        if from != to {
            if indexes.contains_key(to) {
                return Err(SearchError::IndexExists(to.to_string()));
            }
            let data = indexes
                .remove(from)
                .ok_or_else(|| SearchError::IndexNotFound(from.to_string()))?;
            indexes.insert(to.to_string(), data);
        } else if !indexes.contains_key(to) {
            return Err(SearchError::IndexNotFound(to.to_string()));
        }

        Ok(aliases.insert(alias.to_string(), to.to_string()))
    }

    async fn bulk_upsert(
        &self,
        index: &str,
        documents: Vec<SearchDocument>,
    ) -> SearchResult<BulkHandle> {
        self.gate().await?;
        let data = self
            .indexes
            .read()
            .get(index)
            .cloned()
            .ok_or_else(|| SearchError::IndexNotFound(index.to_string()))?;

        let handle = BulkHandle {
            id: Uuid::new_v4(),
            index: index.to_string(),
            documents: documents.len(),
        };

        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(handle.id, rx);

        let fail = self.fail_bulk.clone();
        tokio::spawn(async move {
            tokio::task::yield_now().await;
            let result = if fail.load(Ordering::SeqCst) {
                Err(SearchError::BulkFailed("rejected by engine".to_string()))
            } else {
                let mut guard = data.write();
                let applied = documents.len();
                for doc in documents {
                    guard.insert(doc.id.clone(), doc);
                }
                Ok(applied)
            };
            let _ = tx.send(result);
        });

        Ok(handle)
    }

    async fn await_bulk(&self, handle: &BulkHandle) -> SearchResult<BulkReport> {
        let rx = self
            .pending
            .lock()
            .remove(&handle.id)
            .ok_or_else(|| SearchError::UnknownBulkOperation(handle.id.to_string()))?;

        let applied = rx
            .await
            .map_err(|_| SearchError::BulkFailed("bulk task dropped".to_string()))??;

        Ok(BulkReport {
            index: handle.index.clone(),
            applied,
        })
    }

    async fn upsert(&self, index: &str, document: SearchDocument) -> SearchResult<()> {
        self.gate().await?;
        let data = self.resolve(index)?;
        data.write().insert(document.id.clone(), document);
        Ok(())
    }

    async fn delete(&self, index: &str, id: &str) -> SearchResult<bool> {
        self.gate().await?;
        let data = self.resolve(index)?;
        let removed = data.write().remove(id).is_some();
        Ok(removed)
    }

    async fn get(&self, index: &str, id: &str) -> SearchResult<Option<SearchDocument>> {
        self.gate().await?;
        let data = self.resolve(index)?;
        let doc = data.read().get(id).cloned();
        Ok(doc)
    }

    async fn search(&self, index: &str, query: &SearchQuery) -> SearchResult<SearchPage> {
        self.gate().await?;
        let data = self.resolve(index)?;
        let tokens = query.text.as_deref().map(tokenize).unwrap_or_default();

        let scored: Vec<(u32, SearchDocument)> = data
            .read()
            .values()
            .filter(|doc| query.filters.matches(doc))
            .filter_map(|doc| score(doc, &tokens).map(|s| (s, doc.clone())))
            .collect();

        Ok(SearchPage::from_scored(scored, query))
    }

    async fn facets(&self, index: &str, query: &FacetQuery) -> SearchResult<FacetCounts> {
        self.gate().await?;
        let data = self.resolve(index)?;
        let mut counts = FacetCounts::default();
        for doc in data.read().values().filter(|doc| query.matches(doc)) {
            counts.accumulate(doc);
        }
        Ok(counts)
    }

    async fn count(&self, index: &str) -> SearchResult<usize> {
        self.gate().await?;
        let data = self.resolve(index)?;
        let len = data.read().len();
        Ok(len)
    }
}
