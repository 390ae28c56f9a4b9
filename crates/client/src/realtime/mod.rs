// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Realtime notification channel.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐ commands ┌──────────────┐     ┌─────────────┐
//! │ RealtimeManager │─────────►│ driver task  │────►│  Transport  │
//! │    (handle)     │          │              │◄────│   (trait)   │
//! └─────────────────┘          └──────────────┘     └─────────────┘
//!         ▲                           │
//!         │ state                     ▼
//! ┌─────────────────┐          ┌──────────────┐
//! │ SharedConnection│◄─────────│ChannelMachine│──► NotificationSubscriber
//! │     State       │          │   (events)   │──► SystemAlerts
//! └─────────────────┘          └──────────────┘
//! ```
//!
//! The driver owns the transport and feeds every channel event through the
//! [`ChannelMachine`], which decides state transitions, subscriber callbacks
//! and follow-up work (reply, reconnect, give up). The handle only sends
//! commands and reads shared state.

mod machine;
mod manager;
mod state;
mod transport;

pub use machine::{ChannelEvent, ChannelMachine, Directive, ReconnectPolicy, RecentIds};
pub use manager::{channel_url, RealtimeConfig, RealtimeManager};
pub use state::{ConnectionState, SharedConnectionState};
pub use transport::{
    ChannelFuture, Transport, TransportError, TransportResult, WebSocketTransport,
};

use std::sync::Arc;

use tend_core::Notification;

/// Receives structured events from the realtime channel.
///
/// Callbacks run on the driver task and must not block; long work such as
/// fetching the initial notification list should be spawned.
pub trait NotificationSubscriber: Send + Sync {
    /// A new notification arrived.
    fn add_notification(&self, notification: Notification);

    /// The server reported the unread count.
    fn update_unread_count(&self, count: u64);

    /// The channel opened or was lost.
    fn set_connected(&self, connected: bool);

    /// The channel (re)opened; refresh state that may have been missed.
    fn fetch_initial(&self);
}

/// Operating-system level alerts for new notifications.
pub trait SystemAlerts: Send + Sync {
    fn is_permitted(&self) -> bool;

    /// Show an alert. Failures are the implementation's to swallow.
    fn alert(&self, notification: &Notification);
}

/// Supplies the auth token for each connection attempt.
pub trait TokenSource: Send + Sync {
    fn token(&self) -> Option<String>;
}

/// A fixed token.
#[derive(Debug, Clone, Default)]
pub struct StaticToken(pub Option<String>);

impl TokenSource for StaticToken {
    fn token(&self) -> Option<String> {
        self.0.clone()
    }
}

/// Collaborators of a [`RealtimeManager`].
#[derive(Clone)]
pub struct ChannelHooks {
    pub subscriber: Arc<dyn NotificationSubscriber>,
    pub alerts: Option<Arc<dyn SystemAlerts>>,
    pub token: Arc<dyn TokenSource>,
}

impl ChannelHooks {
    pub fn new(subscriber: Arc<dyn NotificationSubscriber>, token: Arc<dyn TokenSource>) -> Self {
        ChannelHooks {
            subscriber,
            alerts: None,
            token,
        }
    }

    pub fn with_alerts(mut self, alerts: Arc<dyn SystemAlerts>) -> Self {
        self.alerts = Some(alerts);
        self
    }
}

#[cfg(test)]
mod machine_tests;

#[cfg(test)]
mod manager_tests;
