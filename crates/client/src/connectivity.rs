// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Connectivity tracking.
//!
//! A [`ConnectivitySignal`] owns the current reachability bit. Consumers
//! read it and wait on it through [`ConnectivityMonitor`] handles. A
//! [`ReachabilityProbe`] can drive the signal from periodic TCP checks.

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Error type for connectivity waits.
#[derive(Debug, thiserror::Error)]
pub enum ConnectivityError {
    /// The timeout elapsed before the network came back.
    #[error("timed out after {0:?} waiting for connectivity")]
    Timeout(Duration),

    /// The signal owner was dropped while offline.
    #[error("connectivity signal closed")]
    SignalClosed,
}

/// Source of connectivity change events.
pub struct ConnectivitySignal {
    tx: watch::Sender<bool>,
}

impl ConnectivitySignal {
    /// Create a signal with the given initial state.
    pub fn new(online: bool) -> Self {
        let (tx, _rx) = watch::channel(online);
        ConnectivitySignal { tx }
    }

    /// Current state.
    pub fn is_online(&self) -> bool {
        *self.tx.borrow()
    }

    /// Update the state. Waiters are only woken on an actual change.
    ///
    /// Returns `true` if the state changed.
    pub fn set_online(&self, online: bool) -> bool {
        let changed = self.tx.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        });
        if changed {
            tracing::info!(online, "connectivity changed");
        }
        changed
    }

    /// A new monitor observing this signal.
    pub fn monitor(&self) -> ConnectivityMonitor {
        ConnectivityMonitor {
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for ConnectivitySignal {
    fn default() -> Self {
        Self::new(true)
    }
}

/// Read side of a [`ConnectivitySignal`].
#[derive(Clone)]
pub struct ConnectivityMonitor {
    rx: watch::Receiver<bool>,
}

impl ConnectivityMonitor {
    /// Current reachability, with no side effects.
    pub fn is_online(&self) -> bool {
        *self.rx.borrow()
    }

    /// Wait until the signal reports online.
    ///
    /// Returns immediately if already online. Otherwise subscribes once and,
    /// when `timeout` is given, arms one timer; the first to fire wins and
    /// the other is dropped with this future.
    pub async fn wait_for_online(&self, timeout: Option<Duration>) -> Result<(), ConnectivityError> {
        if self.is_online() {
            return Ok(());
        }

        let mut rx = self.rx.clone();
        let became_online = async move {
            rx.wait_for(|online| *online)
                .await
                .map(|_| ())
                .map_err(|_| ConnectivityError::SignalClosed)
        };

        match timeout {
            Some(limit) => tokio::time::timeout(limit, became_online)
                .await
                .map_err(|_| ConnectivityError::Timeout(limit))?,
            None => became_online.await,
        }
    }

    /// Wait for the next state change and return the new state.
    pub async fn wait_for_change(&mut self) -> Result<bool, ConnectivityError> {
        self.rx
            .changed()
            .await
            .map_err(|_| ConnectivityError::SignalClosed)?;
        Ok(*self.rx.borrow_and_update())
    }
}

/// Periodic TCP reachability check feeding a [`ConnectivitySignal`].
#[derive(Debug, Clone)]
pub struct ReachabilityProbe {
    /// `host:port` to connect to.
    pub addr: String,
    pub interval: Duration,
    pub timeout: Duration,
}

impl ReachabilityProbe {
    pub fn new(addr: impl Into<String>, interval: Duration, timeout: Duration) -> Self {
        ReachabilityProbe {
            addr: addr.into(),
            interval,
            timeout,
        }
    }

    /// One check: can a TCP connection be opened within the timeout?
    pub async fn check(&self) -> bool {
        matches!(
            tokio::time::timeout(self.timeout, TcpStream::connect(&self.addr)).await,
            Ok(Ok(_))
        )
    }

    /// Spawn a task that checks every `interval` and publishes the result.
    pub fn spawn(self, signal: Arc<ConnectivitySignal>, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                let online = tokio::select! {
                    _ = cancel.cancelled() => return,
                    online = self.check() => online,
                };
                tracing::debug!(addr = %self.addr, online, "reachability probe");
                signal.set_online(online);

                tokio::select! {
                    _ = cancel.cancelled() => return,
                    _ = tokio::time::sleep(self.interval) => {}
                }
            }
        })
    }
}

#[cfg(test)]
#[path = "connectivity_tests.rs"]
mod tests;
