// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Connection state shared between the driver task and its observers.

use std::fmt;
use std::sync::atomic::{AtomicU32, AtomicU8, Ordering};

use tokio::sync::watch;

/// Lifecycle state of the realtime channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

impl ConnectionState {
    fn to_u8(self) -> u8 {
        match self {
            ConnectionState::Disconnected => 0,
            ConnectionState::Connecting => 1,
            ConnectionState::Connected => 2,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => ConnectionState::Connecting,
            2 => ConnectionState::Connected,
            _ => ConnectionState::Disconnected,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Connection state visible to both the driver task and any handle.
///
/// Reads are lock-free; [`subscribe`](Self::subscribe) gives change
/// notifications for callers that want to wait on a transition.
pub struct SharedConnectionState {
    state: AtomicU8,
    /// Reconnects scheduled since the last successful open.
    attempts: AtomicU32,
    tx: watch::Sender<ConnectionState>,
}

impl SharedConnectionState {
    /// Create a new shared state initialized to disconnected.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ConnectionState::Disconnected);
        Self {
            state: AtomicU8::new(ConnectionState::Disconnected.to_u8()),
            attempts: AtomicU32::new(0),
            tx,
        }
    }

    pub fn get(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Set the state, notifying subscribers if it changed.
    pub fn set(&self, state: ConnectionState) {
        self.state.store(state.to_u8(), Ordering::Release);
        self.tx.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                *current = state;
                true
            }
        });
    }

    pub fn reconnect_attempts(&self) -> u32 {
        self.attempts.load(Ordering::Acquire)
    }

    pub fn set_reconnect_attempts(&self, attempts: u32) {
        self.attempts.store(attempts, Ordering::Release);
    }

    pub fn is_connected(&self) -> bool {
        self.get() == ConnectionState::Connected
    }

    pub fn is_connecting(&self) -> bool {
        self.get() == ConnectionState::Connecting
    }

    /// Receiver that observes every state change.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.tx.subscribe()
    }

    /// Get a human-readable status string.
    pub fn status_string(&self) -> String {
        let attempts = self.reconnect_attempts();
        match self.get() {
            ConnectionState::Connecting if attempts > 0 => {
                format!("connecting (reconnect {})", attempts)
            }
            ConnectionState::Disconnected if attempts > 0 => {
                format!("disconnected (after {} reconnects)", attempts)
            }
            state => state.to_string(),
        }
    }
}

impl Default for SharedConnectionState {
    fn default() -> Self {
        Self::new()
    }
}
