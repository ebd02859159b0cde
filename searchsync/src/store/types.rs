// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Primary store types and error handling

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::task::JoinError;

/// Primary store backend selection
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// In-memory rows, lost on restart
    #[default]
    Memory,

    /// Sled - Pure Rust embedded database
    Sled,
}

impl std::str::FromStr for StoreKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(StoreKind::Memory),
            "sled" => Ok(StoreKind::Sled),
            _ => Err(format!(
                "Unknown store kind: {}. Valid options: memory, sled",
                s
            )),
        }
    }
}

impl std::fmt::Display for StoreKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            StoreKind::Memory => "memory",
            StoreKind::Sled => "sled",
        };
        write!(f, "{}", name)
    }
}

/// Errors raised by a [`super::PrimaryStore`]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Primary store unavailable: {0}")]
    Unavailable(String),

    #[error("Row has no usable id")]
    MissingId,

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

#[cfg(feature = "sled-backend")]
impl From<sled::Error> for StoreError {
    fn from(e: sled::Error) -> Self {
        StoreError::Backend(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

impl From<JoinError> for StoreError {
    fn from(e: JoinError) -> Self {
        StoreError::Backend(format!("blocking store task failed: {}", e))
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
