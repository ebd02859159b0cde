// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Search engine capability
//!
//! The rest of the crate only talks to the engine through [`SearchEngine`], so
//! any product with named indexes, an alias (or rename) primitive and bulk
//! writes can sit behind it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::SearchResult;
use super::query::{FacetCounts, FacetQuery, SearchPage, SearchQuery};
use crate::document::SearchDocument;

/// Handle for an asynchronously applied bulk write
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BulkHandle {
    pub id: Uuid,
    pub index: String,
    pub documents: usize,
}

/// Outcome of an acknowledged bulk write
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkReport {
    pub index: String,
    pub applied: usize,
}

#[async_trait]
pub trait SearchEngine: Send + Sync {
    /// Create an empty index
    async fn create_index(&self, name: &str) -> SearchResult<()>;

    /// Delete an index. Returns false if it did not exist.
    async fn delete_index(&self, name: &str) -> SearchResult<bool>;

    /// List concrete index names (aliases excluded)
    async fn list_indexes(&self) -> SearchResult<Vec<String>>;

    /// Index the alias currently points to
    async fn resolve_alias(&self, alias: &str) -> SearchResult<Option<String>>;

    /// Atomically rename `from` to `to` (when they differ) and point `alias`
    /// at `to`. Returns the index the alias pointed to before.
    async fn promote(&self, alias: &str, from: &str, to: &str) -> SearchResult<Option<String>>;

    /// Enqueue a bulk upsert; completion is observed with [`Self::await_bulk`]
    async fn bulk_upsert(
        &self,
        index: &str,
        documents: Vec<SearchDocument>,
    ) -> SearchResult<BulkHandle>;

    /// Wait until a bulk write is acknowledged
    async fn await_bulk(&self, handle: &BulkHandle) -> SearchResult<BulkReport>;

    /// Insert or replace one document keyed by id
    async fn upsert(&self, index: &str, document: SearchDocument) -> SearchResult<()>;

    /// Remove one document. Returns false if it was not present.
    async fn delete(&self, index: &str, id: &str) -> SearchResult<bool>;

    /// Fetch one document by id (inactive documents included)
    async fn get(&self, index: &str, id: &str) -> SearchResult<Option<SearchDocument>>;

    /// Ranked, filtered query. `index` may be an alias.
    async fn search(&self, index: &str, query: &SearchQuery) -> SearchResult<SearchPage>;

    /// Facet counts over active documents. `index` may be an alias.
    async fn facets(&self, index: &str, query: &FacetQuery) -> SearchResult<FacetCounts>;

    /// Number of documents in an index
    async fn count(&self, index: &str) -> SearchResult<usize>;
}
