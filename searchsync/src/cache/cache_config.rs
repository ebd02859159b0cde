// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Cache configuration and per-content tier policies

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Longest lifetime any cache entry or CDN window may carry
pub const MAX_TTL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Content types with their own cache namespace and freshness windows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentTier {
    /// Full-text search results
    Search,
    /// Filter-only listings (category pages, tag pages)
    Listing,
    /// Single entity lookups
    Entity,
    /// Facet / taxonomy counts
    Facets,
}

impl ContentTier {
    pub const ALL: [ContentTier; 4] = [
        ContentTier::Search,
        ContentTier::Listing,
        ContentTier::Entity,
        ContentTier::Facets,
    ];

    /// Cache namespace, also the version counter name
    pub fn namespace(&self) -> &'static str {
        match self {
            ContentTier::Search => "search",
            ContentTier::Listing => "listing",
            ContentTier::Entity => "entity",
            ContentTier::Facets => "facets",
        }
    }
}

impl std::str::FromStr for ContentTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "search" => Ok(ContentTier::Search),
            "listing" => Ok(ContentTier::Listing),
            "entity" => Ok(ContentTier::Entity),
            "facets" => Ok(ContentTier::Facets),
            _ => Err(format!(
                "Unknown namespace: {}. Valid options: search, listing, entity, facets",
                s
            )),
        }
    }
}

impl std::fmt::Display for ContentTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.namespace())
    }
}

/// Cache lifetime and CDN windows for one content tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierPolicy {
    /// Origin cache entry lifetime
    pub ttl: Duration,
    /// Shared (CDN) cache lifetime
    pub s_maxage: Duration,
    pub stale_while_revalidate: Duration,
    pub stale_if_error: Duration,
}

impl TierPolicy {
    pub const fn from_secs(ttl: u64, s_maxage: u64, swr: u64, sie: u64) -> Self {
        Self {
            ttl: Duration::from_secs(ttl),
            s_maxage: Duration::from_secs(s_maxage),
            stale_while_revalidate: Duration::from_secs(swr),
            stale_if_error: Duration::from_secs(sie),
        }
    }
}

/// Tier policies for every content type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierTable {
    pub search: TierPolicy,
    pub listing: TierPolicy,
    pub entity: TierPolicy,
    pub facets: TierPolicy,
}

impl Default for TierTable {
    fn default() -> Self {
        Self {
            search: TierPolicy::from_secs(30, 30, 60, 300),
            listing: TierPolicy::from_secs(60, 60, 120, 600),
            entity: TierPolicy::from_secs(120, 120, 300, 86_400),
            facets: TierPolicy::from_secs(600, 600, 1_800, 86_400),
        }
    }
}

impl TierTable {
    pub fn get(&self, tier: ContentTier) -> &TierPolicy {
        match tier {
            ContentTier::Search => &self.search,
            ContentTier::Listing => &self.listing,
            ContentTier::Entity => &self.entity,
            ContentTier::Facets => &self.facets,
        }
    }
}

/// Cache backend selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackendKind {
    /// Single in-process map
    Memory,
    /// Persistent sled tree (requires a data directory)
    Sled,
    /// In-process L1 in front of a sled L2 (memory L2 without a data directory)
    #[default]
    Tiered,
}

impl std::str::FromStr for CacheBackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(CacheBackendKind::Memory),
            "sled" => Ok(CacheBackendKind::Sled),
            "tiered" => Ok(CacheBackendKind::Tiered),
            _ => Err(format!(
                "Unknown cache backend: {}. Valid options: memory, sled, tiered",
                s
            )),
        }
    }
}

impl std::fmt::Display for CacheBackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CacheBackendKind::Memory => "memory",
            CacheBackendKind::Sled => "sled",
            CacheBackendKind::Tiered => "tiered",
        };
        write!(f, "{}", name)
    }
}

/// Global cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Enable/disable caching entirely
    pub enabled: bool,

    /// Upper bound for every backend call
    pub operation_timeout: Duration,

    /// Maximum entries held by the in-process tier
    pub l1_max_entries: usize,

    /// TTL cap for entries in the in-process tier
    pub l1_ttl: Duration,

    /// Maximum entries for a memory L2
    pub l2_max_entries: usize,

    pub backend: CacheBackendKind,

    pub tiers: TierTable,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            operation_timeout: Duration::from_secs(1),
            l1_max_entries: 10_000,
            l1_ttl: Duration::from_secs(10),
            l2_max_entries: 100_000,
            backend: CacheBackendKind::Tiered,
            tiers: TierTable::default(),
        }
    }
}

impl CacheConfig {
    /// Memory-only configuration, used by tests and the one-shot CLI
    pub fn in_memory() -> Self {
        Self {
            backend: CacheBackendKind::Memory,
            ..Self::default()
        }
    }

    pub fn policy(&self, tier: ContentTier) -> &TierPolicy {
        self.tiers.get(tier)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.enabled {
            return Ok(());
        }

        if self.operation_timeout.is_zero() {
            return Err("Cache operation_timeout must be > 0".to_string());
        }

        if self.l1_max_entries == 0 || self.l2_max_entries == 0 {
            return Err("Cache levels must have max_entries > 0".to_string());
        }

        if self.operation_timeout > MAX_TTL || self.l1_ttl > MAX_TTL {
            return Err(format!(
                "Cache operation_timeout and l1_ttl must not exceed {:?}",
                MAX_TTL
            ));
        }

        for tier in ContentTier::ALL {
            let policy = self.policy(tier);
            if policy.ttl.is_zero() {
                return Err(format!("Tier '{}' must have ttl > 0", tier));
            }
            let windows = [
                policy.ttl,
                policy.s_maxage,
                policy.stale_while_revalidate,
                policy.stale_if_error,
            ];
            if windows.iter().any(|window| *window > MAX_TTL) {
                return Err(format!(
                    "Tier '{}' durations must not exceed {:?}",
                    tier, MAX_TTL
                ));
            }
            if policy.s_maxage > policy.ttl + policy.stale_while_revalidate {
                return Err(format!(
                    "Tier '{}' s_maxage ({:?}) exceeds ttl + stale_while_revalidate",
                    tier, policy.s_maxage
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(CacheConfig::default().validate().is_ok());
        assert!(CacheConfig::in_memory().validate().is_ok());
    }

    #[test]
    fn test_tiers_ordered_by_volatility() {
        let tiers = TierTable::default();
        assert!(tiers.search.ttl < tiers.entity.ttl);
        assert!(tiers.entity.ttl < tiers.facets.ttl);
    }

    #[test]
    fn test_validate_rejects_zero_ttl() {
        let mut config = CacheConfig::default();
        config.tiers.search.ttl = Duration::ZERO;
        assert!(config.validate().unwrap_err().contains("search"));

        config.enabled = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_unbounded_durations() {
        let mut config = CacheConfig::default();
        config.tiers.entity.ttl = Duration::MAX;
        assert!(config.validate().unwrap_err().contains("entity"));

        let mut config = CacheConfig::default();
        config.tiers.facets.stale_while_revalidate = MAX_TTL + Duration::from_secs(1);
        assert!(config.validate().unwrap_err().contains("facets"));

        let mut config = CacheConfig::default();
        config.l1_ttl = Duration::MAX;
        assert!(config.validate().is_err());

        let mut config = CacheConfig::default();
        config.tiers.search = TierPolicy {
            ttl: MAX_TTL,
            s_maxage: MAX_TTL,
            stale_while_revalidate: MAX_TTL,
            stale_if_error: MAX_TTL,
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_content_tier_parse() {
        assert_eq!("Listing".parse::<ContentTier>().unwrap(), ContentTier::Listing);
        assert!("pages".parse::<ContentTier>().is_err());
        assert_eq!(ContentTier::Facets.to_string(), "facets");
    }
}
