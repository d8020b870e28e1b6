//! Bounded FIFO of pending broadcasts.
//!
//! Plain data structure; locking and delivery live in the broadcaster.

use serde::Serialize;
use std::collections::{BTreeSet, HashSet, VecDeque};
use std::sync::Arc;

use crate::broadcast::message::Payload;
use crate::broadcast::{BroadcastId, ClientId};
use crate::config::RetryMode;

/// A broadcast awaiting delivery.
#[derive(Debug, Clone)]
pub struct QueuedBroadcast {
    pub id: BroadcastId,
    pub payload: Arc<Payload>,
    pub created_at: u64,
    pub targets: BTreeSet<ClientId>,
    /// Targets that have confirmed delivery; only tracked in pending-only mode.
    pub delivered: HashSet<ClientId>,
    pub retry_count: u32,
    pub max_retries: u32,
}

impl QueuedBroadcast {
    pub fn message_type(&self) -> &str {
        self.payload.message_type()
    }

    /// Targets the next sweep should send to.
    pub fn recipients(&self, mode: RetryMode) -> Vec<ClientId> {
        match mode {
            RetryMode::Coarse => self.targets.iter().cloned().collect(),
            RetryMode::PendingOnly => self
                .targets
                .iter()
                .filter(|id| !self.delivered.contains(*id))
                .cloned()
                .collect(),
        }
    }
}

/// Introspection view of one queued broadcast.
#[derive(Debug, Clone, Serialize)]
pub struct BroadcastInfo {
    pub id: BroadcastId,
    pub message_type: String,
    pub created_at: u64,
    pub target_count: usize,
    pub delivered_count: usize,
    pub retry_count: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueueStats {
    pub size: usize,
    pub max_size: usize,
    pub broadcasts: Vec<BroadcastInfo>,
}

#[derive(Debug)]
pub struct BroadcastQueue {
    entries: VecDeque<QueuedBroadcast>,
    max_size: usize,
}

impl BroadcastQueue {
    pub fn new(max_size: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            max_size,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.max_size
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Append a broadcast, handing it back if the queue is at capacity.
    pub fn push(&mut self, broadcast: QueuedBroadcast) -> Result<(), QueuedBroadcast> {
        if self.is_full() {
            return Err(broadcast);
        }
        self.entries.push_back(broadcast);
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &QueuedBroadcast> {
        self.entries.iter()
    }

    pub fn get_mut(&mut self, id: &BroadcastId) -> Option<&mut QueuedBroadcast> {
        self.entries.iter_mut().find(|b| &b.id == id)
    }

    pub fn remove(&mut self, id: &BroadcastId) -> Option<QueuedBroadcast> {
        let pos = self.entries.iter().position(|b| &b.id == id)?;
        self.entries.remove(pos)
    }

    /// Drop everything; returns how many broadcasts were discarded.
    pub fn clear(&mut self) -> usize {
        let n = self.entries.len();
        self.entries.clear();
        n
    }

    pub fn stats(&self) -> QueueStats {
        QueueStats {
            size: self.entries.len(),
            max_size: self.max_size,
            broadcasts: self
                .entries
                .iter()
                .map(|b| BroadcastInfo {
                    id: b.id,
                    message_type: b.message_type().to_string(),
                    created_at: b.created_at,
                    target_count: b.targets.len(),
                    delivered_count: b.delivered.len(),
                    retry_count: b.retry_count,
                })
                .collect(),
        }
    }
}
