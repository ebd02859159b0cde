// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Partitioned change feed
//!
//! Events are routed to one of N bounded channels by a hash of the entity
//! id. Each channel has exactly one consumer, so events for the same entity
//! are applied in the order they were published.

use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;

use super::event::ChangeEvent;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChangeFeedError {
    #[error("Change feed partition {0} is closed")]
    Closed(usize),

    #[error("Change feed partition {0} is full")]
    Full(usize),
}

/// Producer side of the feed; cheap to clone
#[derive(Debug, Clone)]
pub struct ChangeFeedSender {
    partitions: Arc<Vec<mpsc::Sender<ChangeEvent>>>,
}

/// Create a feed with `partitions` channels of `capacity` events each
pub fn change_feed(
    partitions: usize,
    capacity: usize,
) -> (ChangeFeedSender, Vec<mpsc::Receiver<ChangeEvent>>) {
    let partitions = partitions.max(1);
    let mut senders = Vec::with_capacity(partitions);
    let mut receivers = Vec::with_capacity(partitions);
    for _ in 0..partitions {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        senders.push(tx);
        receivers.push(rx);
    }
    (
        ChangeFeedSender {
            partitions: Arc::new(senders),
        },
        receivers,
    )
}

impl ChangeFeedSender {
    pub fn partitions(&self) -> usize {
        self.partitions.len()
    }

    pub fn partition_for(&self, entity_id: &str) -> usize {
        crc32fast::hash(entity_id.as_bytes()) as usize % self.partitions.len()
    }

    /// Publish, waiting for capacity
    pub async fn send(&self, event: ChangeEvent) -> Result<(), ChangeFeedError> {
        let partition = self.partition_for(&event.entity_id);
        self.partitions[partition]
            .send(event)
            .await
            .map_err(|_| ChangeFeedError::Closed(partition))
    }

    /// Publish without waiting
    pub fn try_send(&self, event: ChangeEvent) -> Result<(), ChangeFeedError> {
        let partition = self.partition_for(&event.entity_id);
        self.partitions[partition]
            .try_send(event)
            .map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => ChangeFeedError::Full(partition),
                mpsc::error::TrySendError::Closed(_) => ChangeFeedError::Closed(partition),
            })
    }
}
