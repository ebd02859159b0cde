// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Read strategies tried by the router, in order
//!
//! Each strategy answers any [`QueryRequest`] with the same [`QueryOutput`]
//! contract and declares the freshness its answers carry.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use super::errors::StrategyError;
use super::freshness::Freshness;
use super::request::QueryRequest;
use crate::document::{DocumentMapper, SearchDocument};
use crate::search::{FacetCounts, SearchEngine, SearchPage};
use crate::store::PrimaryStore;

/// Uniform read result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum QueryOutput {
    Page(SearchPage),
    /// `None` when the entity does not exist or is inactive
    Entity(Option<SearchDocument>),
    Facets(FacetCounts),
}

impl QueryOutput {
    /// Negative entity lookups are not cached, so a newly created entity is
    /// visible as soon as it is indexed
    pub fn is_cacheable(&self) -> bool {
        !matches!(self, QueryOutput::Entity(None))
    }
}

#[async_trait]
pub trait ReadStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn freshness(&self) -> Freshness;

    fn timeout(&self) -> Duration;

    async fn execute(&self, request: &QueryRequest) -> Result<QueryOutput, StrategyError>;
}

/// Reads the current generation through the engine alias
pub struct SearchEngineStrategy {
    engine: Arc<dyn SearchEngine>,
    alias: String,
    timeout: Duration,
}

impl SearchEngineStrategy {
    pub fn new(engine: Arc<dyn SearchEngine>, alias: impl Into<String>, timeout: Duration) -> Self {
        Self {
            engine,
            alias: alias.into(),
            timeout,
        }
    }
}

#[async_trait]
impl ReadStrategy for SearchEngineStrategy {
    fn name(&self) -> &'static str {
        "search_engine"
    }

    fn freshness(&self) -> Freshness {
        Freshness::Fresh
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn execute(&self, request: &QueryRequest) -> Result<QueryOutput, StrategyError> {
        let output = match request {
            QueryRequest::Search(query) => {
                QueryOutput::Page(self.engine.search(&self.alias, query).await?)
            }
            QueryRequest::Entity { id } => {
                let doc = self.engine.get(&self.alias, id).await?;
                QueryOutput::Entity(doc.filter(|d| d.is_active))
            }
            QueryRequest::Facets(query) => {
                QueryOutput::Facets(self.engine.facets(&self.alias, query).await?)
            }
        };
        Ok(output)
    }
}

/// Answers from the primary store with substring matching
pub struct PrimaryStoreStrategy {
    store: Arc<dyn PrimaryStore>,
    mapper: DocumentMapper,
    timeout: Duration,
}

impl PrimaryStoreStrategy {
    pub fn new(store: Arc<dyn PrimaryStore>, timeout: Duration) -> Self {
        Self {
            store,
            mapper: DocumentMapper::new(),
            timeout,
        }
    }
}

#[async_trait]
impl ReadStrategy for PrimaryStoreStrategy {
    fn name(&self) -> &'static str {
        "primary_store"
    }

    fn freshness(&self) -> Freshness {
        Freshness::Degraded
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn execute(&self, request: &QueryRequest) -> Result<QueryOutput, StrategyError> {
        let output = match request {
            QueryRequest::Search(query) => QueryOutput::Page(self.store.search(query).await?),
            QueryRequest::Entity { id } => {
                let doc = self
                    .store
                    .get(id)
                    .await?
                    .and_then(|row| self.mapper.map(&row).ok())
                    .filter(|d| d.is_active);
                QueryOutput::Entity(doc)
            }
            QueryRequest::Facets(query) => QueryOutput::Facets(self.store.facets(query).await?),
        };
        Ok(output)
    }
}
