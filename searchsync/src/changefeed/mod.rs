// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Change data capture
//!
//! - [`event`]: row-level change events
//! - [`feed`]: partitioned, bounded channels keyed by entity id
//! - [`listener`]: per-partition workers applying events to the index

pub mod event;
pub mod feed;
pub mod listener;

pub use event::{ChangeEvent, ChangeOperation};
pub use feed::{change_feed, ChangeFeedError, ChangeFeedSender};
pub use listener::{
    ApplyOutcome, ChangeCaptureListener, ListenerConfig, ListenerError, ListenerHandle,
    ListenerStatsSnapshot,
};
