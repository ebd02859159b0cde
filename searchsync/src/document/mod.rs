// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Document model and row mapping

pub mod mapper;
pub mod types;

pub use mapper::{DocumentMapper, MapError};
pub use types::{EntityRow, ListField, NumericField, SearchDocument, TimestampField};
