// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Bearer-protected admin endpoints

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use searchsync::cache::{ContentTier, InvalidationEvent, InvalidationResult};
use searchsync::coordinator::ServiceStats;
use searchsync::index::RebuildStatus;
use searchsync::RebuildTrigger;

use super::error::ApiError;
use crate::app::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReindexBody {
    pub status: RebuildTrigger,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RevalidateRequest {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: Option<String>,
    pub category: Option<String>,
    pub tag: Option<String>,
    pub namespace: Option<String>,
}

impl RevalidateRequest {
    pub fn to_event(&self) -> Result<InvalidationEvent, ApiError> {
        let event = match self.kind.as_str() {
            "entity" => InvalidationEvent::Entity {
                id: required("id", &self.id)?,
            },
            "search" | "listing" | "facets" => InvalidationEvent::Namespace {
                namespace: self.kind.clone(),
            },
            "category" => InvalidationEvent::Category {
                category: required("category", &self.category)?,
            },
            "tag" => InvalidationEvent::Tag {
                tag: required("tag", &self.tag)?,
            },
            "all" => InvalidationEvent::All,
            "purge" => {
                let tier = required("namespace", &self.namespace)?
                    .parse::<ContentTier>()
                    .map_err(ApiError::invalid_request)?;
                InvalidationEvent::Purge {
                    namespace: tier.namespace().to_string(),
                }
            }
            other => {
                return Err(ApiError::invalid_request(format!(
                    "Unknown revalidate type: {}. Valid options: entity, search, listing, category, tag, facets, all, purge",
                    other
                )))
            }
        };
        Ok(event)
    }
}

fn required(field: &str, value: &Option<String>) -> Result<String, ApiError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ApiError::invalid_request(format!("'{}' is required", field)))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevalidateBody {
    pub event: InvalidationEvent,
    pub keys_deleted: usize,
    pub bumped: BTreeMap<String, u64>,
    pub duration_ms: u64,
}

impl RevalidateBody {
    fn new(event: InvalidationEvent, result: InvalidationResult) -> Self {
        Self {
            event,
            keys_deleted: result.keys_deleted,
            bumped: result.bumped.into_iter().collect(),
            duration_ms: result.duration.as_millis() as u64,
        }
    }
}

pub async fn reindex(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<(StatusCode, Json<ReindexBody>), ApiError> {
    ensure_admin(&state, &headers)?;
    let status = state.coordinator.index_manager().trigger();
    log::info!("Reindex requested: {:?}", status);
    Ok((StatusCode::ACCEPTED, Json(ReindexBody { status })))
}

pub async fn reindex_status(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<RebuildStatus>, ApiError> {
    ensure_admin(&state, &headers)?;
    Ok(Json(state.coordinator.index_manager().status()))
}

pub async fn revalidate(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<RevalidateRequest>,
) -> Result<Json<RevalidateBody>, ApiError> {
    ensure_admin(&state, &headers)?;
    let event = request.to_event()?;
    let result = state.coordinator.dispatcher().handle(event.clone()).await;
    log::info!(
        "Revalidated {:?}: {} keys deleted, {} namespaces bumped",
        event,
        result.keys_deleted,
        result.bumped.len()
    );
    Ok(Json(RevalidateBody::new(event, result)))
}

pub async fn stats(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ServiceStats>, ApiError> {
    ensure_admin(&state, &headers)?;
    Ok(Json(state.coordinator.stats()))
}

fn ensure_admin(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let expected = state
        .admin_token
        .as_deref()
        .ok_or_else(|| ApiError::unauthorized("admin endpoints are disabled"))?;

    let token = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or_else(|| ApiError::unauthorized("missing bearer token"))?
        .to_str()
        .map_err(|_| ApiError::unauthorized("invalid bearer token"))?
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::unauthorized("invalid bearer token"))?;

    if !constant_time_eq(token.trim().as_bytes(), expected.as_bytes()) {
        return Err(ApiError::unauthorized("invalid bearer token"));
    }
    Ok(())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (left, right) in a.iter().zip(b.iter()) {
        diff |= left ^ right;
    }
    diff == 0
}
