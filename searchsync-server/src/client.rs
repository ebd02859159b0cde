// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Admin API client
//!
//! `searchsync reindex` talks to a running service through this client, so
//! the rebuild runs against the live engine, store and cache.

use reqwest::Client;
use std::time::Duration;

use searchsync::index::RebuildStatus;
use searchsync::RebuildTrigger;

use crate::api::admin::ReindexBody;

pub struct AdminClient {
    http: Client,
    base_url: String,
    token: String,
}

impl AdminClient {
    pub fn new(
        base_url: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
    ) -> reqwest::Result<Self> {
        let http = Client::builder().timeout(timeout).no_proxy().build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self {
            http,
            base_url,
            token: token.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// POST /reindex
    pub async fn trigger_reindex(&self) -> reqwest::Result<RebuildTrigger> {
        let body: ReindexBody = self
            .http
            .post(format!("{}/reindex", self.base_url))
            .bearer_auth(&self.token)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(body.status)
    }

    /// GET /reindex/status
    pub async fn reindex_status(&self) -> reqwest::Result<RebuildStatus> {
        self.http
            .get(format!("{}/reindex/status", self.base_url))
            .bearer_auth(&self.token)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }

    /// Poll the status endpoint until no rebuild is running
    pub async fn wait_for_rebuild(&self, poll_interval: Duration) -> reqwest::Result<RebuildStatus> {
        loop {
            let status = self.reindex_status().await?;
            if !status.running {
                return Ok(status);
            }
            tokio::time::sleep(poll_interval).await;
        }
    }
}

/// Base URL for a listen address; wildcard hosts map to loopback
pub fn admin_url(bind_addr: &str) -> String {
    let addr = bind_addr
        .trim()
        .trim_start_matches("http://")
        .trim_end_matches('/');
    let addr = match addr.rsplit_once(':') {
        Some(("0.0.0.0", port)) => format!("127.0.0.1:{}", port),
        Some(("[::]", port)) => format!("[::1]:{}", port),
        _ => addr.to_string(),
    };
    format!("http://{}", addr)
}
