// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Index manager errors

use thiserror::Error;

use super::report::RebuildStep;
use crate::search::SearchError;
use crate::store::StoreError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum IndexManagerError {
    /// The current generation was left untouched
    #[error("Rebuild failed at step {step}: {reason}")]
    RebuildFailed { step: RebuildStep, reason: String },

    #[error("A rebuild is already in progress")]
    RebuildInProgress,

    #[error("Rebuild cancelled")]
    Cancelled,

    #[error("No current index generation")]
    NoCurrentGeneration,

    #[error(transparent)]
    Search(#[from] SearchError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl IndexManagerError {
    pub fn rebuild_failed<S: Into<String>>(step: RebuildStep, reason: S) -> Self {
        Self::RebuildFailed {
            step,
            reason: reason.into(),
        }
    }

    /// Whether the operation can be retried as-is
    pub fn is_retryable(&self) -> bool {
        match self {
            IndexManagerError::RebuildFailed { .. } | IndexManagerError::Cancelled => true,
            IndexManagerError::Search(e) => e.is_transient(),
            IndexManagerError::Store(StoreError::Unavailable(_)) => true,
            _ => false,
        }
    }
}

pub type IndexResult<T> = Result<T, IndexManagerError>;
