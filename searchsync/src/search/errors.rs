// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Error types for search engine operations

use std::time::Duration;
use thiserror::Error;

/// Errors returned by a [`super::SearchEngine`]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SearchError {
    #[error("Search engine unavailable: {0}")]
    Unavailable(String),

    #[error("Search engine call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Index '{0}' not found")]
    IndexNotFound(String),

    #[error("Index '{0}' already exists")]
    IndexExists(String),

    #[error("Bulk operation {0} not found")]
    UnknownBulkOperation(String),

    #[error("Bulk operation failed: {0}")]
    BulkFailed(String),

    #[error("No current index generation")]
    NoCurrentGeneration,
}

impl SearchError {
    pub fn unavailable<S: Into<String>>(msg: S) -> Self {
        Self::Unavailable(msg.into())
    }

    /// Whether retrying the same call may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, SearchError::Unavailable(_) | SearchError::Timeout(_))
    }
}

pub type SearchResult<T> = Result<T, SearchError>;
