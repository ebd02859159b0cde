// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Response freshness metadata and CDN cache headers

use serde::{Deserialize, Serialize};

use crate::cache::TierPolicy;

/// Where a response came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Freshness {
    /// Served from the cache
    Cached,
    /// Served by the search engine
    Fresh,
    /// Served by the primary store because the engine failed
    Degraded,
}

impl Freshness {
    pub fn as_str(&self) -> &'static str {
        match self {
            Freshness::Cached => "cached",
            Freshness::Fresh => "fresh",
            Freshness::Degraded => "degraded",
        }
    }
}

impl std::fmt::Display for Freshness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CacheStatus {
    Hit,
    Miss,
}

impl CacheStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
        }
    }
}

/// Shared-cache windows in seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheControl {
    pub s_maxage: u64,
    pub stale_while_revalidate: u64,
    pub stale_if_error: u64,
}

impl CacheControl {
    pub fn from_policy(policy: &TierPolicy) -> Self {
        Self {
            s_maxage: policy.s_maxage.as_secs(),
            stale_while_revalidate: policy.stale_while_revalidate.as_secs(),
            stale_if_error: policy.stale_if_error.as_secs(),
        }
    }

    /// Degraded responses must not be cached as fresh by shared caches,
    /// but stale copies stay usable
    pub fn degraded(policy: &TierPolicy) -> Self {
        Self {
            s_maxage: 0,
            ..Self::from_policy(policy)
        }
    }

    /// `Cache-Control` value
    pub fn header_value(&self) -> String {
        format!(
            "public, s-maxage={}, stale-while-revalidate={}, stale-if-error={}",
            self.s_maxage, self.stale_while_revalidate, self.stale_if_error
        )
    }

    /// `CDN-Cache-Control` value (targeted at the CDN only)
    pub fn cdn_header_value(&self) -> String {
        format!(
            "max-age={}, stale-while-revalidate={}, stale-if-error={}",
            self.s_maxage, self.stale_while_revalidate, self.stale_if_error
        )
    }
}
