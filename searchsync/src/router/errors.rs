// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Router and read strategy errors

use std::time::Duration;
use thiserror::Error;

use crate::search::SearchError;
use crate::store::StoreError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RouterError {
    /// Rejected before touching cache or backends
    #[error("Invalid parameter '{field}': {reason}")]
    InvalidRequest { field: String, reason: String },

    /// Every read strategy failed
    #[error("No read path available: {0}")]
    Unavailable(String),
}

impl RouterError {
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidRequest {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Failure of a single read strategy
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StrategyError {
    #[error(transparent)]
    Search(#[from] SearchError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),
}
