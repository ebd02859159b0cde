// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Query router configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Bound for one search engine call
    pub search_timeout: Duration,

    /// Bound for one primary store fallback call
    pub fallback_timeout: Duration,

    pub default_limit: u32,
    pub max_limit: u32,
    pub max_page: u32,

    /// Maximum query text length in characters
    pub max_query_len: usize,

    /// Maximum values per list filter
    pub max_filter_values: usize,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            search_timeout: Duration::from_millis(800),
            fallback_timeout: Duration::from_secs(2),
            default_limit: 24,
            max_limit: 100,
            max_page: 10_000,
            max_query_len: 200,
            max_filter_values: 50,
        }
    }
}

impl RouterConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.search_timeout.is_zero() || self.fallback_timeout.is_zero() {
            return Err("Router timeouts must be > 0".to_string());
        }
        if self.max_limit == 0 || self.default_limit == 0 || self.default_limit > self.max_limit {
            return Err(format!(
                "Router limits invalid: default_limit {} must be within 1..={}",
                self.default_limit, self.max_limit
            ));
        }
        if self.max_page == 0 || self.max_query_len == 0 || self.max_filter_values == 0 {
            return Err("Router bounds must be > 0".to_string());
        }
        Ok(())
    }
}
