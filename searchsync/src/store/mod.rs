// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Primary (authoritative) entity store
//!
//! Provides the [`PrimaryStore`] capability with in-memory and sled
//! implementations, plus [`create_primary_store`] to pick one from
//! configuration.

pub mod fallback;
pub mod memory;
#[cfg(feature = "sled-backend")]
pub mod sled;
pub mod traits;
pub mod types;

use std::path::Path;
use std::sync::Arc;

pub use memory::MemoryPrimaryStore;
#[cfg(feature = "sled-backend")]
pub use self::sled::SledPrimaryStore;
pub use traits::PrimaryStore;
pub use types::{StoreError, StoreKind, StoreResult};

/// Create a primary store of the given kind.
///
/// `path` is only used by persistent kinds.
pub fn create_primary_store<P: AsRef<Path>>(
    kind: StoreKind,
    path: P,
) -> StoreResult<Arc<dyn PrimaryStore>> {
    match kind {
        StoreKind::Memory => Ok(Arc::new(MemoryPrimaryStore::new())),
        #[cfg(feature = "sled-backend")]
        StoreKind::Sled => Ok(Arc::new(SledPrimaryStore::open(path)?)),
        #[cfg(not(feature = "sled-backend"))]
        StoreKind::Sled => {
            let _ = path;
            Err(StoreError::Backend(
                "sled support not compiled in (enable the sled-backend feature)".to_string(),
            ))
        }
    }
}
