// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Service configuration
//!
//! Loaded from an optional JSON file, then overridden from the environment:
//!
//! | Variable | Field |
//! |---|---|
//! | `SEARCHSYNC_CONFIG` | path of the JSON file |
//! | `SEARCHSYNC_BIND` | `server.bind_addr` |
//! | `SEARCHSYNC_ADMIN_TOKEN` | `server.admin_token` |
//! | `SEARCHSYNC_DATA_DIR` | `server.data_dir` |
//! | `SEARCHSYNC_STORE` | `server.store` |

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::cache::{CacheBackendKind, CacheConfig};
use crate::changefeed::ListenerConfig;
use crate::error::{SyncError, SyncResult};
use crate::index::IndexConfig;
use crate::router::RouterConfig;
use crate::store::StoreKind;

pub const ENV_CONFIG: &str = "SEARCHSYNC_CONFIG";
pub const ENV_BIND: &str = "SEARCHSYNC_BIND";
pub const ENV_ADMIN_TOKEN: &str = "SEARCHSYNC_ADMIN_TOKEN";
pub const ENV_DATA_DIR: &str = "SEARCHSYNC_DATA_DIR";
pub const ENV_STORE: &str = "SEARCHSYNC_STORE";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,

    /// Bearer token for admin endpoints; unset rejects every admin call
    pub admin_token: Option<String>,

    /// Directory for persistent stores
    pub data_dir: Option<PathBuf>,

    pub store: StoreKind,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            admin_token: None,
            data_dir: None,
            store: StoreKind::Memory,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub cache: CacheConfig,
    pub index: IndexConfig,
    pub listener: ListenerConfig,
    pub router: RouterConfig,
    pub server: ServerConfig,
}

impl ServiceConfig {
    /// Self-contained configuration: memory store, memory cache
    pub fn in_memory() -> Self {
        Self {
            cache: CacheConfig::in_memory(),
            ..Self::default()
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> SyncResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        serde_json::from_str(&text).map_err(|e| {
            SyncError::config(format!("Invalid config file {}: {}", path.display(), e))
        })
    }

    /// File (explicit path, else `SEARCHSYNC_CONFIG`, else defaults), then
    /// environment overrides, then validation
    pub fn load(path: Option<&Path>) -> SyncResult<Self> {
        let env_path = std::env::var_os(ENV_CONFIG).map(PathBuf::from);
        let mut config = match path.map(Path::to_path_buf).or(env_path) {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides()?;
        config.validate().map_err(SyncError::Config)?;
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) -> SyncResult<()> {
        if let Ok(bind) = std::env::var(ENV_BIND) {
            self.server.bind_addr = bind;
        }
        if let Ok(token) = std::env::var(ENV_ADMIN_TOKEN) {
            self.server.admin_token = Some(token).filter(|t| !t.is_empty());
        }
        if let Some(dir) = std::env::var_os(ENV_DATA_DIR) {
            self.server.data_dir = Some(PathBuf::from(dir));
        }
        if let Ok(store) = std::env::var(ENV_STORE) {
            self.server.store = store.parse().map_err(SyncError::Config)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), String> {
        self.cache.validate()?;
        self.index.validate()?;
        self.listener.validate()?;
        self.router.validate()?;

        if self.server.bind_addr.trim().is_empty() {
            return Err("server.bind_addr must not be empty".to_string());
        }
        if self.server.store == StoreKind::Sled && self.server.data_dir.is_none() {
            return Err("server.data_dir is required for the sled store".to_string());
        }
        if self.cache.enabled
            && self.cache.backend == CacheBackendKind::Sled
            && self.server.data_dir.is_none()
        {
            return Err("server.data_dir is required for the sled cache backend".to_string());
        }
        Ok(())
    }
}
