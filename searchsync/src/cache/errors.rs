// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Cache error types
//!
//! These never cross the [`super::CacheStore`] boundary: the store logs them
//! and degrades to a miss or a dropped write.

use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CacheError {
    #[error("Cache backend unavailable: {0}")]
    Unavailable(String),

    #[error("Cache call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Cache serialization error: {0}")]
    Serialization(String),

    #[error("Invalid cache pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

#[cfg(feature = "sled-backend")]
impl From<sled::Error> for CacheError {
    fn from(e: sled::Error) -> Self {
        CacheError::Unavailable(e.to_string())
    }
}

impl From<bincode::Error> for CacheError {
    fn from(e: bincode::Error) -> Self {
        CacheError::Serialization(e.to_string())
    }
}

impl From<JoinError> for CacheError {
    fn from(e: JoinError) -> Self {
        CacheError::Unavailable(format!("blocking cache task failed: {}", e))
    }
}

pub type CacheResult<T> = Result<T, CacheError>;
