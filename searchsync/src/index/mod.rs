// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Index generation management
//!
//! - [`generation`]: `{base}_{version}` naming and parsing
//! - [`manager`]: bootstrap, blue/green rebuild, listener write path
//! - [`report`]: rebuild outcome and status types

pub mod errors;
pub mod generation;
pub mod index_config;
pub mod manager;
pub mod report;

pub use errors::{IndexManagerError, IndexResult};
pub use generation::{generation_name, parse_name, temp_name, Generation};
pub use index_config::IndexConfig;
pub use manager::{IndexManager, RebuildGuard};
pub use report::{RebuildOutcome, RebuildReport, RebuildStatus, RebuildStep, RebuildTrigger};
