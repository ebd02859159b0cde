// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Rebuild reports and status

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::generation::Generation;

/// Rebuild phases, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RebuildStep {
    CreateTemp,
    Populate,
    AwaitBulk,
    Swap,
    DeleteOld,
    Replay,
}

impl std::fmt::Display for RebuildStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RebuildStep::CreateTemp => "create_temp",
            RebuildStep::Populate => "populate",
            RebuildStep::AwaitBulk => "await_bulk",
            RebuildStep::Swap => "swap",
            RebuildStep::DeleteOld => "delete_old",
            RebuildStep::Replay => "replay",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RebuildOutcome {
    Succeeded,
    Failed { step: RebuildStep, reason: String },
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebuildReport {
    /// Generation promoted by this run
    pub generation: Option<String>,
    /// Generation that was current before the swap
    pub previous: Option<String>,
    pub documents_indexed: usize,
    /// Rows the mapper rejected
    pub rows_skipped: usize,
    /// Entities re-applied after the swap
    pub replayed: usize,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub outcome: RebuildOutcome,
}

impl RebuildReport {
    pub fn started(started_at: DateTime<Utc>) -> Self {
        Self {
            generation: None,
            previous: None,
            documents_indexed: 0,
            rows_skipped: 0,
            replayed: 0,
            started_at,
            duration_ms: 0,
            outcome: RebuildOutcome::Succeeded,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.outcome == RebuildOutcome::Succeeded
    }
}

/// Result of asking for a background rebuild
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RebuildTrigger {
    Started,
    /// A rebuild was already running; the request coalesced into it
    AlreadyRunning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebuildStatus {
    pub running: bool,
    pub current: Option<Generation>,
    pub last_report: Option<RebuildReport>,
}
