// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers.

#![allow(clippy::unwrap_used)]

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;

use serde_json::{json, Value};
use tend_core::{Method, Notification, PendingRequest};

use crate::http::{HttpError, HttpResult, HttpTransport};
use crate::realtime::{NotificationSubscriber, SystemAlerts};

/// Outcome scripted for one call of [`MockHttp`].
pub enum Scripted {
    Ok(Value),
    Transport,
    Status(u16),
}

/// HTTP transport that replays a script and records every request.
///
/// When the script runs out, `fallback` is used for every further call.
pub struct MockHttp {
    script: Mutex<VecDeque<Scripted>>,
    fallback: fn() -> Scripted,
    sent: Mutex<Vec<PendingRequest>>,
}

impl MockHttp {
    pub fn new(script: Vec<Scripted>, fallback: fn() -> Scripted) -> Self {
        MockHttp {
            script: Mutex::new(script.into()),
            fallback,
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Always succeeds.
    pub fn ok() -> Self {
        Self::new(Vec::new(), || Scripted::Ok(json!({"ok": true})))
    }

    /// Always fails as if offline.
    pub fn offline() -> Self {
        Self::new(Vec::new(), || Scripted::Transport)
    }

    pub fn sent(&self) -> Vec<PendingRequest> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_endpoints(&self) -> Vec<String> {
        self.sent().into_iter().map(|r| r.endpoint).collect()
    }
}

impl HttpTransport for MockHttp {
    fn send<'a>(
        &'a self,
        request: &'a PendingRequest,
    ) -> Pin<Box<dyn Future<Output = HttpResult<Value>> + Send + 'a>> {
        self.sent.lock().unwrap().push(request.clone());
        let next = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(self.fallback);
        Box::pin(async move {
            match next {
                Scripted::Ok(value) => Ok(value),
                Scripted::Transport => Err(HttpError::Transport("connection refused".into())),
                Scripted::Status(code) => Err(HttpError::status(code, "scripted")),
            }
        })
    }
}

/// A POST to `/habits/{n}/check-ins`.
pub fn check_in(n: u32) -> PendingRequest {
    PendingRequest::new(Method::Post, format!("/habits/{}/check-ins", n)).with_data(json!({"n": n}))
}

/// Callback observed by [`RecordingSubscriber`].
#[derive(Debug, Clone, PartialEq)]
pub enum SubscriberEvent {
    Notification(Notification),
    UnreadCount(u64),
    Connected(bool),
    FetchInitial,
}

/// Subscriber that records every callback in order.
#[derive(Default)]
pub struct RecordingSubscriber {
    events: Mutex<Vec<SubscriberEvent>>,
}

impl RecordingSubscriber {
    pub fn events(&self) -> Vec<SubscriberEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                SubscriberEvent::Notification(n) => Some(n),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, wanted: &SubscriberEvent) -> usize {
        self.events().iter().filter(|e| *e == wanted).count()
    }

    fn push(&self, event: SubscriberEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl NotificationSubscriber for RecordingSubscriber {
    fn add_notification(&self, notification: Notification) {
        self.push(SubscriberEvent::Notification(notification));
    }

    fn update_unread_count(&self, count: u64) {
        self.push(SubscriberEvent::UnreadCount(count));
    }

    fn set_connected(&self, connected: bool) {
        self.push(SubscriberEvent::Connected(connected));
    }

    fn fetch_initial(&self) {
        self.push(SubscriberEvent::FetchInitial);
    }
}

/// Alert sink that records alerted notification ids.
pub struct RecordingAlerts {
    permitted: bool,
    alerted: Mutex<Vec<String>>,
}

impl RecordingAlerts {
    pub fn new(permitted: bool) -> Self {
        RecordingAlerts {
            permitted,
            alerted: Mutex::new(Vec::new()),
        }
    }

    pub fn alerted(&self) -> Vec<String> {
        self.alerted.lock().unwrap().clone()
    }
}

impl SystemAlerts for RecordingAlerts {
    fn is_permitted(&self) -> bool {
        self.permitted
    }

    fn alert(&self, notification: &Notification) {
        self.alerted.lock().unwrap().push(notification.id.clone());
    }
}
