// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Search engine abstraction
//!
//! - [`traits`]: the [`SearchEngine`] capability (indexes, aliases, bulk writes)
//! - [`query`]: query, filter, page and facet types
//! - [`memory`]: in-memory engine with fault injection

pub mod errors;
pub mod memory;
pub mod query;
pub mod traits;

pub use errors::{SearchError, SearchResult};
pub use memory::MemorySearchEngine;
pub use query::{FacetCounts, FacetQuery, SearchFilters, SearchPage, SearchQuery, SortOrder};
pub use traits::{BulkHandle, BulkReport, SearchEngine};
