// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Cache backends and factory

pub mod memory;
#[cfg(feature = "sled-backend")]
pub mod sled;
pub mod tiered;
pub mod traits;

use regex::Regex;
use std::path::Path;
use std::sync::Arc;

pub use memory::MemoryCacheBackend;
#[cfg(feature = "sled-backend")]
pub use self::sled::SledCacheBackend;
pub use tiered::TieredCacheBackend;
pub use traits::CacheBackend;

use super::cache_config::{CacheBackendKind, CacheConfig};
use super::errors::{CacheError, CacheResult};

/// Translate a glob (`*`, `?`) into an anchored regex
pub fn glob_to_regex(pattern: &str) -> CacheResult<Regex> {
    let mut source = String::with_capacity(pattern.len() + 8);
    source.push('^');
    for c in pattern.chars() {
        match c {
            '*' => source.push_str(".*"),
            '?' => source.push('.'),
            other => source.push_str(&regex::escape(&other.to_string())),
        }
    }
    source.push('$');
    Regex::new(&source).map_err(|e| CacheError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })
}

/// Create the cache backend described by `config`.
///
/// `data_dir` is where persistent tiers keep their files; a tiered backend
/// without one falls back to a memory L2.
pub fn create_cache_backend(
    config: &CacheConfig,
    data_dir: Option<&Path>,
) -> CacheResult<Arc<dyn CacheBackend>> {
    match config.backend {
        CacheBackendKind::Memory => Ok(Arc::new(MemoryCacheBackend::new(config.l2_max_entries))),
        CacheBackendKind::Sled => Ok(open_persistent(data_dir)?),
        CacheBackendKind::Tiered => {
            let l2: Arc<dyn CacheBackend> = match data_dir {
                Some(_) => open_persistent(data_dir)?,
                None => Arc::new(MemoryCacheBackend::new(config.l2_max_entries)),
            };
            Ok(Arc::new(TieredCacheBackend::new(
                config.l1_max_entries,
                config.l1_ttl,
                l2,
            )))
        }
    }
}

#[cfg(feature = "sled-backend")]
fn open_persistent(data_dir: Option<&Path>) -> CacheResult<Arc<dyn CacheBackend>> {
    let dir = data_dir.ok_or_else(|| {
        CacheError::Unavailable("sled cache backend requires a data directory".to_string())
    })?;
    Ok(Arc::new(SledCacheBackend::open(dir.join("cache"))?))
}

#[cfg(not(feature = "sled-backend"))]
fn open_persistent(_data_dir: Option<&Path>) -> CacheResult<Arc<dyn CacheBackend>> {
    Err(CacheError::Unavailable(
        "sled support not compiled in (enable the sled-backend feature)".to_string(),
    ))
}
