// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! searchsync HTTP service
//!
//! Routes and handlers live in the library so tests can drive the service
//! in-process; the `searchsync` binary adds the CLI and the listener socket.

pub mod api;
pub mod app;
pub mod cli;
pub mod client;

pub use app::{build_router, AppState};
pub use client::AdminClient;
