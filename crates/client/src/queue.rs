// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Offline queue for requests made while disconnected.
//!
//! The whole queue is stored as one JSON array under a fixed key in a
//! [`KeyValueStore`]. Every operation re-reads the stored value, so changes
//! made by another process sharing the store are picked up; concurrent
//! writers are not synchronized. Insertion order is replay order.
//!
//! Storage failures are logged and swallowed: the queue never surfaces an
//! error to the caller. Unparseable content reads as an empty queue. A
//! failed read never leads to a write, so stored entries are only removed
//! by `dequeue` and `clear`.

use std::sync::Arc;

use chrono::Utc;
use tend_core::{PendingRequest, QueuedRequest};

use crate::storage::{KeyValueStore, StoreError};

/// Storage key holding the serialized queue.
pub const QUEUE_KEY: &str = "offline_request_queue";

/// Internal error type for queue persistence.
#[derive(Debug, thiserror::Error)]
enum QueueError {
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    #[error("corrupted queue content: {0}")]
    Corrupted(#[source] serde_json::Error),

    #[error("serialization error: {0}")]
    Serialization(#[source] serde_json::Error),
}

/// Persisted, ordered queue of deferred requests.
#[derive(Clone)]
pub struct OfflineQueue {
    store: Arc<dyn KeyValueStore>,
    key: String,
}

impl OfflineQueue {
    /// Create a queue over the given store, using [`QUEUE_KEY`].
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_key(store, QUEUE_KEY)
    }

    /// Create a queue stored under a custom key.
    pub fn with_key(store: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        OfflineQueue {
            store,
            key: key.into(),
        }
    }

    /// Append a request and persist the queue.
    ///
    /// Returns the stored entry with its assigned id and timestamp.
    ///
    /// If the stored queue cannot be read, nothing is written: the entry is
    /// not persisted and the existing queue is left untouched.
    pub fn enqueue(&self, request: PendingRequest) -> QueuedRequest {
        let entry = QueuedRequest::from_pending(request, Utc::now());
        let Some(mut entries) = self.load_for_write() else {
            tracing::error!(id = %entry.id, "offline queue unreadable; request not persisted");
            return entry;
        };
        entries.push(entry.clone());

        match self.save(&entries) {
            Ok(()) => tracing::debug!(id = %entry.id, endpoint = %entry.endpoint, "queued request"),
            Err(e) => tracing::error!(id = %entry.id, error = %e, "failed to persist queued request"),
        }
        entry
    }

    /// All queued requests, in insertion order.
    ///
    /// Empty when nothing is stored or the stored content is unreadable.
    pub fn get_queue(&self) -> Vec<QueuedRequest> {
        match self.load() {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "treating offline queue as empty");
                Vec::new()
            }
        }
    }

    /// Remove the entry with the given id. Absent ids are ignored.
    pub fn dequeue(&self, id: &str) {
        self.update(|entries| {
            let before = entries.len();
            entries.retain(|entry| entry.id != id);
            entries.len() != before
        });
    }

    /// Bump the retry counter of the entry with the given id. Absent ids are
    /// ignored.
    pub fn increment_retries(&self, id: &str) {
        self.update(|entries| match entries.iter_mut().find(|entry| entry.id == id) {
            Some(entry) => {
                entry.retries = entry.retries.saturating_add(1);
                true
            }
            None => false,
        });
    }

    /// Remove every entry.
    pub fn clear(&self) {
        if let Err(e) = self.store.remove(&self.key) {
            tracing::error!(key = %self.key, error = %e, "failed to clear offline queue");
        }
    }

    /// Number of queued entries.
    pub fn size(&self) -> usize {
        self.get_queue().len()
    }

    /// Check if the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    fn load(&self) -> Result<Vec<QueuedRequest>, QueueError> {
        match self.store.get(&self.key)? {
            Some(text) if !text.trim().is_empty() => {
                serde_json::from_str(&text).map_err(QueueError::Corrupted)
            }
            _ => Ok(Vec::new()),
        }
    }

    fn save(&self, entries: &[QueuedRequest]) -> Result<(), QueueError> {
        let json = serde_json::to_string(entries).map_err(QueueError::Serialization)?;
        self.store.set(&self.key, &json)?;
        Ok(())
    }

    /// Current entries as the base of a write.
    ///
    /// Corrupted content starts a fresh queue; a failed read yields `None`
    /// so the caller does not overwrite entries it could not see.
    fn load_for_write(&self) -> Option<Vec<QueuedRequest>> {
        match self.load() {
            Ok(entries) => Some(entries),
            Err(e @ QueueError::Corrupted(_)) => {
                tracing::warn!(key = %self.key, error = %e, "replacing corrupted offline queue");
                Some(Vec::new())
            }
            Err(e) => {
                tracing::error!(key = %self.key, error = %e, "failed to read offline queue");
                None
            }
        }
    }

    /// Read-modify-write; `mutate` returns whether anything changed.
    fn update(&self, mutate: impl FnOnce(&mut Vec<QueuedRequest>) -> bool) {
        let Some(mut entries) = self.load_for_write() else {
            return;
        };
        if mutate(&mut entries) {
            if let Err(e) = self.save(&entries) {
                tracing::error!(key = %self.key, error = %e, "failed to persist offline queue");
            }
        }
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
