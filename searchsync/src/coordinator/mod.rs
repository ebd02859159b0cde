// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Component wiring

pub mod sync_coordinator;

pub use sync_coordinator::{ServiceStats, SyncCoordinator};
