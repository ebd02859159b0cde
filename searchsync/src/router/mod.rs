// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Read path
//!
//! - [`request`]: parameter validation and normalization
//! - [`strategy`]: ordered read strategies (search engine, primary store)
//! - [`freshness`]: freshness, cache status and CDN header values
//! - [`query_router`]: the router tying cache and strategies together

pub mod errors;
pub mod freshness;
pub mod query_router;
pub mod request;
pub mod router_config;
pub mod strategy;

pub use errors::{RouterError, StrategyError};
pub use freshness::{CacheControl, CacheStatus, Freshness};
pub use query_router::{QueryRouter, RoutedResponse, RouterStatsSnapshot};
pub use request::{validate_entity_id, FacetParams, QueryRequest, SearchParams};
pub use router_config::RouterConfig;
pub use strategy::{PrimaryStoreStrategy, QueryOutput, ReadStrategy, SearchEngineStrategy};
