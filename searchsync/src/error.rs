// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Top-level error type

use thiserror::Error;

use crate::cache::CacheError;
use crate::index::IndexManagerError;
use crate::router::RouterError;
use crate::search::SearchError;
use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Search engine error: {0}")]
    Search(#[from] SearchError),

    #[error("Primary store error: {0}")]
    Store(#[from] StoreError),

    #[error("Index error: {0}")]
    Index(#[from] IndexManagerError),

    #[error("Router error: {0}")]
    Router(#[from] RouterError),
}

impl SyncError {
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }
}

pub type SyncResult<T> = Result<T, SyncError>;
