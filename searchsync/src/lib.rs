// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! searchsync - search index synchronization and read-through cache layer
//!
//! searchsync keeps an external full-text search index eventually consistent
//! with a primary transactional store and serves reads through a versioned,
//! multi-tier cache that degrades to the primary store when the search engine
//! is unreachable.
//!
//! # Components
//!
//! - **Document Mapper**: entity row → search document ([`document`])
//! - **Cache Key Builder / Cache Store**: deterministic keys, timeout-bounded
//!   cache access, namespace version counters ([`cache`])
//! - **Index Manager**: blue/green generation rebuilds ([`index`])
//! - **Change Capture Listener**: partitioned change feed consumer ([`changefeed`])
//! - **Invalidation Dispatcher**: entity and namespace invalidation ([`cache::invalidation`])
//! - **Query Router**: cache → search engine → primary store ([`router`])
//!
//! # Usage
//!
//! ```ignore
//! use searchsync::{ServiceConfig, SyncCoordinator};
//!
//! let coordinator = SyncCoordinator::from_config(ServiceConfig::default()).await?;
//! let response = coordinator.router().entity("p1").await?;
//! println!("{:?} {:?}", response.freshness, response.output);
//! ```

pub mod blocking;
pub mod cache;
pub mod changefeed;
pub mod config;
pub mod coordinator;
pub mod document;
pub mod error;
pub mod index;
pub mod router;
pub mod search;
pub mod store;

pub use cache::{
    CacheConfig, CacheKeyBuilder, CacheStore, ContentTier, InvalidationDispatcher, VersionCounters,
};
pub use changefeed::{ChangeCaptureListener, ChangeEvent, ChangeFeedSender, ChangeOperation};
pub use config::ServiceConfig;
pub use coordinator::SyncCoordinator;
pub use document::{DocumentMapper, EntityRow, MapError, SearchDocument};
pub use error::SyncError;
pub use index::{Generation, IndexManager, RebuildReport, RebuildTrigger};
pub use router::{Freshness, QueryOutput, QueryRequest, QueryRouter, RoutedResponse, SearchParams};
pub use search::{MemorySearchEngine, SearchEngine, SearchPage, SearchQuery};
pub use store::{MemoryPrimaryStore, PrimaryStore};

/// searchsync version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// searchsync crate name
pub const CRATE_NAME: &str = env!("CARGO_PKG_NAME");
