// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! HTTP handlers
//!
//! - [`read`]: public read endpoints with cache headers
//! - [`admin`]: bearer-protected reindex, revalidate and stats

pub mod admin;
pub mod error;
pub mod read;

pub use error::{ApiError, ErrorBody};
