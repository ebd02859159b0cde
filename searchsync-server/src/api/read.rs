// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Public read endpoints
//!
//! Every routed answer carries `X-Cache-Status`, `X-Data-Freshness`,
//! `Cache-Control` and `CDN-Cache-Control`.

use axum::extract::{Path, Query, State};
use axum::http::header::CACHE_CONTROL;
use axum::http::{HeaderMap, HeaderName, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use searchsync::router::FacetParams;
use searchsync::{QueryOutput, RoutedResponse, SearchParams};

use super::error::ApiError;
use crate::app::AppState;

pub const X_CACHE_STATUS: &str = "x-cache-status";
pub const X_DATA_FRESHNESS: &str = "x-data-freshness";
pub const CDN_CACHE_CONTROL: &str = "cdn-cache-control";

#[derive(Debug, Serialize)]
pub struct HealthBody {
    pub status: &'static str,
    pub generation: Option<String>,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthBody> {
    let generation = state
        .coordinator
        .index_manager()
        .current()
        .map(|g| g.name.clone());
    Json(HealthBody {
        status: "ok",
        generation,
    })
}

pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Response, ApiError> {
    let routed = state.coordinator.router().search(&params).await?;
    Ok(into_response(routed))
}

pub async fn entity(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let routed = state.coordinator.router().entity(&id).await?;
    if matches!(routed.output, QueryOutput::Entity(None)) {
        return Err(ApiError::not_found(format!("entity '{}' not found", id)));
    }
    Ok(into_response(routed))
}

pub async fn facets(
    State(state): State<AppState>,
    Query(params): Query<FacetParams>,
) -> Result<Response, ApiError> {
    let routed = state.coordinator.router().facets(&params).await?;
    Ok(into_response(routed))
}

fn into_response(routed: RoutedResponse) -> Response {
    let mut response = match &routed.output {
        QueryOutput::Page(page) => Json(page).into_response(),
        QueryOutput::Entity(doc) => Json(doc).into_response(),
        QueryOutput::Facets(counts) => Json(counts).into_response(),
    };
    apply_headers(response.headers_mut(), &routed);
    response
}

pub fn apply_headers(headers: &mut HeaderMap, routed: &RoutedResponse) {
    let values = [
        (
            HeaderName::from_static(X_CACHE_STATUS),
            routed.cache_status.as_str().to_string(),
        ),
        (
            HeaderName::from_static(X_DATA_FRESHNESS),
            routed.freshness.as_str().to_string(),
        ),
        (CACHE_CONTROL, routed.cache_control.header_value()),
        (
            HeaderName::from_static(CDN_CACHE_CONTROL),
            routed.cache_control.cdn_header_value(),
        ),
    ];
    for (name, value) in values {
        match HeaderValue::from_str(&value) {
            Ok(value) => {
                headers.insert(name, value);
            }
            Err(e) => log::warn!("Skipping header {}: {}", name, e),
        }
    }
}
