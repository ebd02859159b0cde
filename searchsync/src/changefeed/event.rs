// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Row-level change events

use serde::{Deserialize, Serialize};

use crate::document::EntityRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeOperation {
    Upsert,
    Delete,
}

impl std::fmt::Display for ChangeOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChangeOperation::Upsert => write!(f, "upsert"),
            ChangeOperation::Delete => write!(f, "delete"),
        }
    }
}

/// One committed write, in per-row commit order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub entity_id: String,
    pub operation: ChangeOperation,
    /// Row as committed; absent when the feed only carries keys
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row: Option<EntityRow>,
}

impl ChangeEvent {
    pub fn upsert(entity_id: impl Into<String>, row: Option<EntityRow>) -> Self {
        Self {
            entity_id: entity_id.into(),
            operation: ChangeOperation::Upsert,
            row,
        }
    }

    pub fn delete(entity_id: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
            operation: ChangeOperation::Delete,
            row: None,
        }
    }

    /// Single-line JSON used when an event is dropped, so it can be replayed
    pub fn to_log_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(
                "{{\"entity_id\":{:?},\"operation\":\"{}\"}}",
                self.entity_id, self.operation
            )
        })
    }
}
