// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Index manager configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Alias user traffic queries; generations are `{base_name}_{version}`
    pub base_name: String,

    /// Rows read from the primary store per page
    pub batch_size: usize,

    /// Attempts per rebuild step before giving up
    pub step_retries: u32,

    /// Base delay between attempts, doubled per attempt and jittered
    pub retry_backoff: Duration,

    /// Upper bound for one bulk acknowledgement
    pub bulk_timeout: Duration,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            base_name: "products".to_string(),
            batch_size: 1000,
            step_retries: 3,
            retry_backoff: Duration::from_millis(200),
            bulk_timeout: Duration::from_secs(60),
        }
    }
}

impl IndexConfig {
    pub fn with_base_name(base_name: impl Into<String>) -> Self {
        Self {
            base_name: base_name.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.base_name.is_empty()
            || !self
                .base_name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-')
        {
            return Err(format!(
                "Index base_name '{}' must be non-empty and contain only [A-Za-z0-9-]",
                self.base_name
            ));
        }
        if self.batch_size == 0 {
            return Err("Index batch_size must be > 0".to_string());
        }
        if self.step_retries == 0 {
            return Err("Index step_retries must be > 0".to_string());
        }
        if self.bulk_timeout.is_zero() {
            return Err("Index bulk_timeout must be > 0".to_string());
        }
        Ok(())
    }
}
