// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Replaying the offline queue and the send-or-queue path.
//!
//! [`ResilientClient::submit`] is how application code sends a mutation:
//! it goes through the retry policy and, if the server still cannot be
//! reached, lands in the [`OfflineQueue`]. [`drain_queue`] replays the queue
//! later and [`AutoDrain`] does so whenever connectivity comes back.

use std::sync::Arc;

use serde_json::Value;
use tend_core::{PendingRequest, QueuedRequest};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::connectivity::ConnectivityMonitor;
use crate::http::{HttpError, HttpTransport};
use crate::queue::OfflineQueue;
use crate::retry::{run_with_retry, RetryExecutor, RetryOptions};

/// Policy for one pass over the queue.
#[derive(Debug, Clone, Default)]
pub struct DrainOptions {
    /// Retry policy applied to each entry.
    pub retry: RetryOptions,
    /// Drop an entry once its retry count reaches this value.
    pub discard_after: Option<u32>,
}

/// Outcome of one pass over the queue.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Entries delivered and removed.
    pub sent: usize,
    /// Entries that failed and were kept.
    pub failed: usize,
    /// Entries that failed and were dropped by `discard_after`.
    pub discarded: usize,
    /// Entries left in the queue afterwards.
    pub remaining: usize,
    /// The pass stopped early because the server was unreachable.
    pub interrupted: bool,
}

/// Replay queued requests in insertion order.
///
/// Each entry runs through the retry policy. Delivered entries are removed;
/// failed entries have their retry counter bumped and stay queued. A
/// connectivity failure ends the pass, since later entries would fail the
/// same way. A failure with a status code moves on to the next entry.
pub async fn drain_queue(
    queue: &OfflineQueue,
    transport: &dyn HttpTransport,
    options: &DrainOptions,
) -> DrainReport {
    let mut report = DrainReport::default();

    for entry in queue.get_queue() {
        let request = entry.to_pending();
        match run_with_retry(&options.retry, || transport.send(&request)).await {
            Ok(_) => {
                queue.dequeue(&entry.id);
                report.sent += 1;
                tracing::debug!(id = %entry.id, endpoint = %entry.endpoint, "replayed queued request");
            }
            Err(e) => {
                queue.increment_retries(&entry.id);
                let retries = entry.retries.saturating_add(1);

                if options.discard_after.is_some_and(|cap| retries >= cap) {
                    queue.dequeue(&entry.id);
                    report.discarded += 1;
                    tracing::warn!(id = %entry.id, retries, error = %e, "discarding queued request");
                } else {
                    report.failed += 1;
                    tracing::warn!(id = %entry.id, retries, error = %e, "queued request failed");
                }

                if e.is_connectivity() {
                    report.interrupted = true;
                    break;
                }
            }
        }
    }

    report.remaining = queue.size();
    tracing::info!(
        sent = report.sent,
        failed = report.failed,
        discarded = report.discarded,
        remaining = report.remaining,
        "offline queue drained"
    );
    report
}

/// Background task that drains the queue whenever connectivity returns.
pub struct AutoDrain {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl AutoDrain {
    /// Start draining: once now if online, then after every offline to
    /// online transition.
    pub fn spawn(
        queue: OfflineQueue,
        transport: Arc<dyn HttpTransport>,
        mut monitor: ConnectivityMonitor,
        options: DrainOptions,
    ) -> Self {
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let handle = tokio::spawn(async move {
            if monitor.is_online() && !queue.is_empty() {
                drain_queue(&queue, transport.as_ref(), &options).await;
            }

            loop {
                let change = tokio::select! {
                    _ = token.cancelled() => break,
                    change = monitor.wait_for_change() => change,
                };

                match change {
                    Ok(true) if !queue.is_empty() => {
                        drain_queue(&queue, transport.as_ref(), &options).await;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::debug!(error = %e, "auto drain stopping");
                        break;
                    }
                }
            }
        });

        AutoDrain { cancel, handle }
    }

    /// Stop the task and wait for it to finish.
    pub async fn stop(self) {
        self.cancel.cancel();
        let _ = self.handle.await;
    }
}

/// Result of [`ResilientClient::submit`].
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    /// Delivered; carries the response body.
    Sent(Value),
    /// Deferred to the offline queue.
    Queued(QueuedRequest),
}

/// Sends mutations with retry, falling back to the offline queue.
#[derive(Clone)]
pub struct ResilientClient {
    transport: Arc<dyn HttpTransport>,
    queue: OfflineQueue,
    executor: RetryExecutor,
    discard_after: Option<u32>,
    monitor: Option<ConnectivityMonitor>,
}

impl ResilientClient {
    pub fn new(transport: Arc<dyn HttpTransport>, queue: OfflineQueue, retry: RetryOptions) -> Self {
        ResilientClient {
            transport,
            queue,
            executor: RetryExecutor::new(retry),
            discard_after: None,
            monitor: None,
        }
    }

    /// Queue mutations without attempting them while `monitor` is offline.
    pub fn with_monitor(mut self, monitor: ConnectivityMonitor) -> Self {
        self.monitor = Some(monitor);
        self
    }

    /// Drop queued entries after this many failed replays.
    pub fn with_discard_after(mut self, cap: Option<u32>) -> Self {
        self.discard_after = cap;
        self
    }

    pub fn queue(&self) -> &OfflineQueue {
        &self.queue
    }

    fn drain_options(&self) -> DrainOptions {
        DrainOptions {
            retry: self.executor.options().clone(),
            discard_after: self.discard_after,
        }
    }

    /// Send `request`, queueing it if the server cannot be reached.
    ///
    /// Only mutations are queued; a GET that cannot be delivered returns
    /// its error. Failures with a status code are always returned.
    pub async fn submit(&self, request: PendingRequest) -> Result<Submission, HttpError> {
        let offline = self.monitor.as_ref().is_some_and(|m| !m.is_online());
        if offline && request.method.is_mutation() {
            let entry = self.queue.enqueue(request);
            tracing::info!(id = %entry.id, endpoint = %entry.endpoint, "offline, request queued");
            return Ok(Submission::Queued(entry));
        }

        let transport = self.transport.as_ref();
        match self.executor.run(|| transport.send(&request)).await {
            Ok(value) => Ok(Submission::Sent(value)),
            Err(e) if e.is_connectivity() && request.method.is_mutation() => {
                let entry = self.queue.enqueue(request);
                tracing::info!(id = %entry.id, endpoint = %entry.endpoint, error = %e, "server unreachable, request queued");
                Ok(Submission::Queued(entry))
            }
            Err(e) => Err(e),
        }
    }

    /// Replay the offline queue now.
    pub async fn drain(&self) -> DrainReport {
        drain_queue(&self.queue, self.transport.as_ref(), &self.drain_options()).await
    }

    /// Start an [`AutoDrain`] for this client's queue.
    pub fn auto_drain(&self, monitor: ConnectivityMonitor) -> AutoDrain {
        AutoDrain::spawn(
            self.queue.clone(),
            Arc::clone(&self.transport),
            monitor,
            self.drain_options(),
        )
    }
}

#[cfg(test)]
#[path = "drain_tests.rs"]
mod tests;
