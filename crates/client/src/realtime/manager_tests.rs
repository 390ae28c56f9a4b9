// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::panic)]
#![allow(clippy::unwrap_used)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::json;
use tend_core::Notification;
use yare::parameterized;

use super::manager::{channel_url, RealtimeConfig, RealtimeManager};
use super::state::ConnectionState;
use super::transport_tests::{MockRemote, MockTransport};
use super::{ChannelHooks, NotificationSubscriber, StaticToken};
use crate::test_helpers::{RecordingSubscriber, SubscriberEvent};

const URL: &str = "ws://push.local/ws";
const PONG: &str = r#"{"type":"pong"}"#;

struct Harness {
    manager: RealtimeManager,
    remote: MockRemote,
    subscriber: Arc<RecordingSubscriber>,
}

fn start_with(token: Option<&str>, config: RealtimeConfig) -> Harness {
    let (transport, remote) = MockTransport::new();
    let subscriber = Arc::new(RecordingSubscriber::default());
    let hooks = ChannelHooks::new(
        subscriber.clone(),
        Arc::new(StaticToken(token.map(String::from))),
    );
    let manager = RealtimeManager::spawn(config, transport, hooks);
    Harness {
        manager,
        remote,
        subscriber,
    }
}

fn start(token: Option<&str>) -> Harness {
    start_with(token, RealtimeConfig::new(URL))
}

/// Let the driver task run until it is idle.
async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

async fn connected() -> Harness {
    let h = start(Some("secret"));
    h.manager.connect();
    settle().await;
    assert_eq!(h.manager.state(), ConnectionState::Connected);
    h
}

#[parameterized(
    plain = { "ws://h/ws", "abc", "ws://h/ws?token=abc" },
    encoded = { "ws://h/ws", "a b/c", "ws://h/ws?token=a%20b%2Fc" },
    existing_query = { "ws://h/ws?v=2", "abc", "ws://h/ws?v=2&token=abc" },
)]
fn channel_url_appends_token(base: &str, token: &str, expected: &str) {
    assert_eq!(channel_url(base, token), expected);
}

#[tokio::test(start_paused = true)]
async fn connect_opens_channel_with_token() {
    let h = start(Some("abc 123"));
    h.manager.connect();
    settle().await;

    assert_eq!(h.remote.urls(), vec!["ws://push.local/ws?token=abc%20123"]);
    assert!(h.manager.is_connected());
    assert_eq!(h.manager.reconnect_attempts(), 0);
    assert_eq!(
        h.subscriber.events(),
        vec![SubscriberEvent::Connected(true), SubscriberEvent::FetchInitial]
    );
}

#[tokio::test(start_paused = true)]
async fn connect_without_token_does_nothing() {
    let h = start(None);
    h.manager.connect();
    settle().await;

    assert_eq!(h.remote.connect_count(), 0);
    assert_eq!(h.manager.state(), ConnectionState::Disconnected);
    assert!(h.subscriber.events().is_empty());

    let h = start(Some(""));
    h.manager.connect();
    settle().await;
    assert_eq!(h.remote.connect_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn connect_while_connected_is_ignored() {
    let h = connected().await;
    h.manager.connect();
    settle().await;
    assert_eq!(h.remote.connect_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn heartbeat_gets_exactly_one_pong() {
    let h = connected().await;

    h.remote.send_json(json!({"type": "heartbeat"}));
    settle().await;

    assert_eq!(h.remote.sent(), vec![PONG]);
}

/// Records how many frames the client had sent when each notification
/// arrived.
struct SentAtDelivery {
    remote: MockRemote,
    seen: Mutex<Vec<usize>>,
}

impl NotificationSubscriber for SentAtDelivery {
    fn add_notification(&self, _notification: Notification) {
        self.seen.lock().unwrap().push(self.remote.sent().len());
    }
    fn update_unread_count(&self, _count: u64) {}
    fn set_connected(&self, _connected: bool) {}
    fn fetch_initial(&self) {}
}

#[tokio::test(start_paused = true)]
async fn pong_is_sent_before_next_frame_is_handled() {
    let (transport, remote) = MockTransport::new();
    let subscriber = Arc::new(SentAtDelivery {
        remote: remote.clone(),
        seen: Mutex::new(Vec::new()),
    });
    let hooks = ChannelHooks::new(subscriber.clone(), Arc::new(StaticToken(Some("t".into()))));
    let manager = RealtimeManager::spawn(RealtimeConfig::new(URL), transport, hooks);
    manager.connect();
    settle().await;

    remote.send_json(json!({"type": "heartbeat"}));
    remote.send_json(json!({"type": "notification", "data": {"id": 1}}));
    settle().await;

    assert_eq!(*subscriber.seen.lock().unwrap(), vec![1]);
    manager.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn frames_reach_subscriber_in_order() {
    let h = connected().await;

    h.remote.send_json(json!({"type": "connected", "data": {"user_id": 7}}));
    h.remote.send_text("garbage");
    h.remote
        .send_json(json!({"type": "notification", "data": {"id": "n1", "type": "reminder"}}));
    h.remote.send_json(json!({"type": "unread_count", "data": {"count": 4}}));
    settle().await;

    let events = h.subscriber.events();
    assert_eq!(events.len(), 4);
    let SubscriberEvent::Notification(n) = &events[2] else {
        panic!("expected notification, got {:?}", events[2]);
    };
    assert_eq!(n.id, "n1");
    assert_eq!(n.kind, "reminder");
    assert_eq!(events[3], SubscriberEvent::UnreadCount(4));
    assert!(h.manager.is_connected());
}

#[tokio::test(start_paused = true)]
async fn close_reconnects_after_fixed_delay() {
    let h = connected().await;

    h.remote.close();
    settle().await;
    assert_eq!(h.manager.state(), ConnectionState::Disconnected);
    assert_eq!(h.manager.reconnect_attempts(), 1);
    assert_eq!(h.subscriber.count(&SubscriberEvent::Connected(false)), 1);

    tokio::time::sleep(Duration::from_millis(2999)).await;
    settle().await;
    assert_eq!(h.remote.connect_count(), 1);

    tokio::time::sleep(Duration::from_millis(2)).await;
    settle().await;
    assert_eq!(h.remote.connect_count(), 2);
    assert!(h.manager.is_connected());
    assert_eq!(h.manager.reconnect_attempts(), 0);
    assert_eq!(h.subscriber.count(&SubscriberEvent::FetchInitial), 2);
}

#[tokio::test(start_paused = true)]
async fn gives_up_after_five_reconnects_until_reconnect() {
    let h = connected().await;
    h.remote.refuse_connects(true);

    h.remote.close();
    settle().await;
    for _ in 0..5 {
        tokio::time::sleep(Duration::from_millis(3001)).await;
        settle().await;
    }
    assert_eq!(h.remote.connect_count(), 6);
    assert_eq!(h.manager.reconnect_attempts(), 5);

    tokio::time::sleep(Duration::from_secs(60)).await;
    settle().await;
    assert_eq!(h.remote.connect_count(), 6);
    assert_eq!(h.manager.state(), ConnectionState::Disconnected);

    h.remote.refuse_connects(false);
    h.manager.reconnect();
    settle().await;
    assert_eq!(h.remote.connect_count(), 7);
    assert!(h.manager.is_connected());
    assert_eq!(h.manager.reconnect_attempts(), 0);
}

#[tokio::test(start_paused = true)]
async fn receive_error_disconnects_and_schedules() {
    let h = connected().await;

    h.remote.fail("connection reset");
    settle().await;

    assert_eq!(h.manager.state(), ConnectionState::Disconnected);
    assert_eq!(h.manager.reconnect_attempts(), 1);
    assert_eq!(h.subscriber.count(&SubscriberEvent::Connected(false)), 1);
}

#[tokio::test(start_paused = true)]
async fn disconnect_cancels_pending_reconnect() {
    let h = connected().await;
    h.remote.close();
    settle().await;

    h.manager.disconnect();
    settle().await;
    tokio::time::sleep(Duration::from_secs(10)).await;
    settle().await;

    assert_eq!(h.remote.connect_count(), 1);
    assert_eq!(h.manager.state(), ConnectionState::Disconnected);
}

#[tokio::test(start_paused = true)]
async fn disconnect_is_idempotent() {
    let h = connected().await;
    h.manager.disconnect();
    h.manager.disconnect();
    settle().await;

    assert!(!h.remote.is_connected());
    assert_eq!(h.subscriber.count(&SubscriberEvent::Connected(false)), 1);
}

#[tokio::test(start_paused = true)]
async fn reconnect_replaces_open_channel() {
    let h = connected().await;

    h.manager.reconnect();
    settle().await;

    assert_eq!(h.remote.connect_count(), 2);
    assert!(h.manager.is_connected());
    assert_eq!(
        h.subscriber.events(),
        vec![
            SubscriberEvent::Connected(true),
            SubscriberEvent::FetchInitial,
            SubscriberEvent::Connected(false),
            SubscriberEvent::Connected(true),
            SubscriberEvent::FetchInitial,
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn send_message_only_when_connected() {
    let h = connected().await;
    h.manager.send_message(&json!({"type": "ping"}));
    h.manager.mark_read("n-9");
    settle().await;
    assert_eq!(
        h.remote.sent(),
        vec![
            r#"{"type":"ping"}"#.to_string(),
            r#"{"type":"mark_read","notification_id":"n-9"}"#.to_string(),
        ]
    );

    h.manager.disconnect();
    h.manager.send_message(&json!({"type": "ping"}));
    settle().await;
    assert_eq!(h.remote.sent().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn failed_send_counts_as_lost_channel() {
    let h = connected().await;
    h.remote.fail_sends(true);

    h.manager.send_message(&json!({"type": "ping"}));
    settle().await;

    assert_eq!(h.manager.state(), ConnectionState::Disconnected);
    assert_eq!(h.manager.reconnect_attempts(), 1);
}

#[tokio::test(start_paused = true)]
async fn stalled_connect_times_out() {
    let mut config = RealtimeConfig::new(URL);
    config.connect_timeout = Duration::from_secs(10);
    let h = start_with(Some("t"), config);
    h.remote.stall_connects(true);

    h.manager.connect();
    settle().await;
    assert_eq!(h.manager.state(), ConnectionState::Connecting);

    tokio::time::sleep(Duration::from_millis(10_001)).await;
    settle().await;
    assert_eq!(h.manager.state(), ConnectionState::Disconnected);
    assert_eq!(h.manager.reconnect_attempts(), 1);
}

#[tokio::test(start_paused = true)]
async fn watch_state_observes_transitions() {
    let h = start(Some("t"));
    let mut rx = h.manager.watch_state();

    h.manager.connect();
    rx.wait_for(|s| *s == ConnectionState::Connected)
        .await
        .unwrap();

    h.remote.close();
    rx.wait_for(|s| *s == ConnectionState::Disconnected)
        .await
        .unwrap();
}

#[tokio::test(start_paused = true)]
async fn shutdown_closes_channel_and_stops_driver() {
    let h = connected().await;
    let remote = h.remote.clone();

    h.manager.shutdown().await;

    assert!(!remote.is_connected());
    assert_eq!(h.subscriber.count(&SubscriberEvent::Connected(false)), 1);
}
