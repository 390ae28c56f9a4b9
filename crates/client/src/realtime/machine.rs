// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Channel event handling.
//!
//! [`ChannelMachine`] owns every state transition of the realtime channel.
//! It is synchronous: the driver task performs the I/O and feeds the
//! outcome in as a [`ChannelEvent`], then carries out the returned
//! [`Directive`].

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tend_core::{InboundMessage, Notification, OutboundMessage, ProtocolError};

use super::state::{ConnectionState, SharedConnectionState};
use super::{NotificationSubscriber, SystemAlerts};

/// Default delay before a scheduled reconnect.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(3000);

/// Default number of reconnects scheduled before giving up.
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 5;

/// Number of notification ids remembered for de-duplication.
const RECENT_ID_CAPACITY: usize = 256;

/// Fixed-delay, bounded reconnect policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub delay: Duration,
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        ReconnectPolicy {
            delay: DEFAULT_RECONNECT_DELAY,
            max_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
        }
    }
}

/// Something that happened on the channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// The channel opened.
    Opened,
    /// A text frame arrived.
    Frame(String),
    /// The channel reported an error. A `Closed` event follows.
    Errored(String),
    /// The channel is gone.
    Closed,
}

/// Follow-up work for the driver.
#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    None,
    /// Send this message on the open channel before reading further.
    Reply(OutboundMessage),
    /// Open the channel again after this delay.
    Reconnect(Duration),
    /// Stop reconnecting until asked explicitly.
    GiveUp,
}

/// Bounded set of recently seen ids, oldest evicted first.
#[derive(Debug)]
pub struct RecentIds {
    order: VecDeque<String>,
    seen: HashSet<String>,
    capacity: usize,
}

impl RecentIds {
    pub fn new(capacity: usize) -> Self {
        RecentIds {
            order: VecDeque::with_capacity(capacity),
            seen: HashSet::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    /// Record `id`. Returns `false` if it was already present.
    pub fn insert(&mut self, id: &str) -> bool {
        if self.seen.contains(id) {
            return false;
        }
        if self.order.len() == self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.seen.remove(&oldest);
            }
        }
        self.order.push_back(id.to_string());
        self.seen.insert(id.to_string());
        true
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl Default for RecentIds {
    fn default() -> Self {
        Self::new(RECENT_ID_CAPACITY)
    }
}

/// State machine for one realtime channel.
pub struct ChannelMachine {
    policy: ReconnectPolicy,
    shared: Arc<SharedConnectionState>,
    subscriber: Arc<dyn NotificationSubscriber>,
    alerts: Option<Arc<dyn SystemAlerts>>,
    recent: RecentIds,
}

impl ChannelMachine {
    pub fn new(
        policy: ReconnectPolicy,
        shared: Arc<SharedConnectionState>,
        subscriber: Arc<dyn NotificationSubscriber>,
        alerts: Option<Arc<dyn SystemAlerts>>,
    ) -> Self {
        ChannelMachine {
            policy,
            shared,
            subscriber,
            alerts,
            recent: RecentIds::default(),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.get()
    }

    pub fn attempts(&self) -> u32 {
        self.shared.reconnect_attempts()
    }

    /// An open attempt is starting.
    pub fn begin_connect(&mut self) {
        self.shared.set(ConnectionState::Connecting);
    }

    /// Forget earlier reconnects, as after an explicit reconnect request.
    pub fn reset_attempts(&mut self) {
        self.shared.set_reconnect_attempts(0);
    }

    /// The channel was closed on purpose; nothing is scheduled.
    pub fn stop(&mut self) {
        self.mark_disconnected();
    }

    pub fn handle(&mut self, event: ChannelEvent) -> Directive {
        match event {
            ChannelEvent::Opened => {
                self.shared.set(ConnectionState::Connected);
                self.shared.set_reconnect_attempts(0);
                tracing::info!("realtime channel connected");
                self.subscriber.set_connected(true);
                self.subscriber.fetch_initial();
                Directive::None
            }
            ChannelEvent::Frame(text) => self.on_frame(&text),
            ChannelEvent::Errored(reason) => {
                tracing::warn!(error = %reason, "realtime channel error");
                self.mark_disconnected();
                Directive::None
            }
            ChannelEvent::Closed => {
                self.mark_disconnected();
                let attempts = self.attempts();
                if attempts < self.policy.max_attempts {
                    let attempt = attempts + 1;
                    self.shared.set_reconnect_attempts(attempt);
                    tracing::info!(
                        attempt,
                        max = self.policy.max_attempts,
                        delay_ms = self.policy.delay.as_millis() as u64,
                        "realtime channel closed, scheduling reconnect"
                    );
                    Directive::Reconnect(self.policy.delay)
                } else {
                    tracing::error!(
                        attempts,
                        "realtime channel closed, reconnect attempts exhausted"
                    );
                    Directive::GiveUp
                }
            }
        }
    }

    fn mark_disconnected(&mut self) {
        let was_connected = self.shared.is_connected();
        self.shared.set(ConnectionState::Disconnected);
        if was_connected {
            self.subscriber.set_connected(false);
        }
    }

    fn on_frame(&mut self, text: &str) -> Directive {
        let message = match InboundMessage::from_json(text) {
            Ok(message) => message,
            Err(ProtocolError::UnknownType(kind)) => {
                tracing::debug!(kind = %kind, "ignoring unrecognized message");
                return Directive::None;
            }
            Err(e) => {
                tracing::warn!(error = %e, "dropping malformed frame");
                return Directive::None;
            }
        };

        match message {
            InboundMessage::Connected(info) => {
                tracing::info!(
                    user_id = ?info.user_id,
                    message = info.message.as_ref().and_then(serde_json::Value::as_str).unwrap_or(""),
                    "server acknowledged connection"
                );
            }
            InboundMessage::Notification(payload) => {
                let notification = Notification::normalize(payload, Utc::now());
                if notification.has_local_id() {
                    tracing::debug!(id = %notification.id, "notification without server id");
                }
                self.deliver(notification);
            }
            InboundMessage::UnreadCount(unread) => {
                self.subscriber.update_unread_count(unread.count);
            }
            InboundMessage::Heartbeat => return Directive::Reply(OutboundMessage::pong()),
            InboundMessage::NotificationRead(receipt) => {
                tracing::debug!(
                    notification_id = ?receipt.notification_id,
                    success = ?receipt.success,
                    "notification marked read"
                );
            }
            InboundMessage::Error(error) => {
                tracing::warn!(
                    message = error
                        .message
                        .as_ref()
                        .and_then(serde_json::Value::as_str)
                        .unwrap_or("unknown error"),
                    code = ?error.code,
                    "server reported error"
                );
            }
        }
        Directive::None
    }

    fn deliver(&mut self, notification: Notification) {
        if !self.recent.insert(&notification.id) {
            tracing::debug!(id = %notification.id, "duplicate notification ignored");
            return;
        }
        tracing::debug!(id = %notification.id, kind = %notification.kind, "notification received");

        if let Some(alerts) = &self.alerts {
            if alerts.is_permitted() {
                alerts.alert(&notification);
            }
        }
        self.subscriber.add_notification(notification);
    }
}
