// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! HTTP application wiring

use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;

use searchsync::SyncCoordinator;

use crate::api;

#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<SyncCoordinator>,
    /// Admin endpoints reject every request when unset
    pub admin_token: Option<String>,
}

impl AppState {
    pub fn new(coordinator: Arc<SyncCoordinator>) -> Self {
        let admin_token = coordinator.config().server.admin_token.clone();
        Self {
            coordinator,
            admin_token,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(api::read::health))
        .route("/search", get(api::read::search))
        .route("/entity/:id", get(api::read::entity))
        .route("/facets", get(api::read::facets))
        .route("/reindex", post(api::admin::reindex))
        .route("/reindex/status", get(api::admin::reindex_status))
        .route("/revalidate", post(api::admin::revalidate))
        .route("/stats", get(api::admin::stats))
        .with_state(state)
}
