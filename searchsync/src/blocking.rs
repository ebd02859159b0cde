// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Blocking storage calls off the async runtime
//!
//! sled reads, writes and tree scans block the calling thread. Running them
//! on tokio's blocking pool keeps runtime workers free and gives callers a
//! future that `tokio::time::timeout` can abandon. An abandoned call still
//! runs to completion on the pool; only the caller stops waiting.

use tokio::task::JoinError;

/// Run `op` on the blocking pool and wait for its result
pub async fn run_blocking<T, E, F>(op: F) -> Result<T, E>
where
    F: FnOnce() -> Result<T, E> + Send + 'static,
    T: Send + 'static,
    E: From<JoinError> + Send + 'static,
{
    match tokio::task::spawn_blocking(op).await {
        Ok(result) => result,
        Err(e) => Err(E::from(e)),
    }
}
