// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tend_core::OutboundMessage;
use yare::parameterized;

use super::machine::{ChannelEvent, ChannelMachine, Directive, ReconnectPolicy, RecentIds};
use super::state::{ConnectionState, SharedConnectionState};
use crate::test_helpers::{RecordingAlerts, RecordingSubscriber, SubscriberEvent};

struct Fixture {
    machine: ChannelMachine,
    shared: Arc<SharedConnectionState>,
    subscriber: Arc<RecordingSubscriber>,
}

fn fixture_with(alerts: Option<Arc<RecordingAlerts>>) -> Fixture {
    let shared = Arc::new(SharedConnectionState::new());
    let subscriber = Arc::new(RecordingSubscriber::default());
    let machine = ChannelMachine::new(
        ReconnectPolicy::default(),
        Arc::clone(&shared),
        subscriber.clone(),
        alerts.map(|a| a as Arc<dyn super::SystemAlerts>),
    );
    Fixture {
        machine,
        shared,
        subscriber,
    }
}

fn fixture() -> Fixture {
    fixture_with(None)
}

fn connected() -> Fixture {
    let mut f = fixture();
    f.machine.begin_connect();
    f.machine.handle(ChannelEvent::Opened);
    f
}

fn frame(value: serde_json::Value) -> ChannelEvent {
    ChannelEvent::Frame(value.to_string())
}

#[test]
fn open_marks_connected_and_fetches_initial() {
    let mut f = fixture();
    f.machine.begin_connect();
    assert_eq!(f.shared.get(), ConnectionState::Connecting);

    let directive = f.machine.handle(ChannelEvent::Opened);

    assert_eq!(directive, Directive::None);
    assert_eq!(f.machine.state(), ConnectionState::Connected);
    assert_eq!(
        f.subscriber.events(),
        vec![SubscriberEvent::Connected(true), SubscriberEvent::FetchInitial]
    );
}

#[test]
fn heartbeat_replies_with_pong() {
    let mut f = connected();
    let directive = f.machine.handle(frame(json!({"type": "heartbeat"})));
    assert_eq!(directive, Directive::Reply(OutboundMessage::pong()));
}

#[test]
fn heartbeat_with_payload_replies_with_pong() {
    let mut f = connected();
    let directive = f
        .machine
        .handle(frame(json!({"type": "heartbeat", "data": {"ts": 1}})));
    assert_eq!(directive, Directive::Reply(OutboundMessage::pong()));
}

#[test]
fn notification_is_normalized_and_delivered() {
    let mut f = connected();
    let directive = f.machine.handle(frame(json!({
        "type": "notification",
        "data": {"id": 42, "title": "Streak", "message": "7 days in a row"}
    })));

    assert_eq!(directive, Directive::None);
    let notifications = f.subscriber.notifications();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].id, "42");
    assert_eq!(notifications[0].kind, "info");
    assert_eq!(notifications[0].title, "Streak");
    assert_eq!(notifications[0].body, "7 days in a row");
    assert!(!notifications[0].read);
}

#[test]
fn duplicate_notifications_are_delivered_once() {
    let mut f = connected();
    let event = frame(json!({"type": "notification", "data": {"id": "n-1"}}));

    f.machine.handle(event.clone());
    f.machine.handle(event);

    assert_eq!(f.subscriber.notifications().len(), 1);
}

#[test]
fn notification_without_id_is_delivered_once() {
    let mut f = connected();
    let event = frame(json!({"type": "notification", "data": {"title": "x"}}));

    f.machine.handle(event.clone());
    f.machine.handle(event);

    let notifications = f.subscriber.notifications();
    assert_eq!(notifications.len(), 1);
    assert!(notifications[0].has_local_id());
    assert_eq!(notifications[0].title, "x");
}

#[test]
fn notification_with_numeric_timestamp_is_delivered() {
    let mut f = connected();
    f.machine.handle(frame(json!({
        "type": "notification",
        "data": {"id": 7, "title": "Hi", "created_at": 1700000000}
    })));

    let notifications = f.subscriber.notifications();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].id, "7");
    assert_eq!(notifications[0].title, "Hi");
}

#[parameterized(
    permitted = { true, 1 },
    not_permitted = { false, 0 },
)]
fn alerts_follow_permission(permitted: bool, expected: usize) {
    let alerts = Arc::new(RecordingAlerts::new(permitted));
    let mut f = fixture_with(Some(alerts.clone()));
    f.machine.handle(ChannelEvent::Opened);

    f.machine
        .handle(frame(json!({"type": "notification", "data": {"id": "a"}})));

    assert_eq!(alerts.alerted().len(), expected);
    assert_eq!(f.subscriber.notifications().len(), 1);
}

#[test]
fn unread_count_is_forwarded() {
    let mut f = connected();
    f.machine
        .handle(frame(json!({"type": "unread_count", "data": {"count": 3}})));
    assert_eq!(f.subscriber.count(&SubscriberEvent::UnreadCount(3)), 1);
}

#[parameterized(
    malformed = { "{not json" },
    missing_type = { r#"{"data": {}}"# },
    unknown_type = { r#"{"type": "presence", "data": {}}"# },
    bad_payload = { r#"{"type": "unread_count", "data": {"count": "many"}}"# },
    server_error = { r#"{"type": "error", "data": {"message": "rate limited"}}"# },
    connected_ack = { r#"{"type": "connected", "data": {"user_id": 7}}"# },
    read_receipt = { r#"{"type": "notification_read", "data": {"notification_id": 5}}"# },
)]
fn informational_and_bad_frames_change_nothing(text: &str) {
    let mut f = connected();
    let before = f.subscriber.events();

    let directive = f.machine.handle(ChannelEvent::Frame(text.to_string()));

    assert_eq!(directive, Directive::None);
    assert_eq!(f.subscriber.events(), before);
    assert_eq!(f.machine.state(), ConnectionState::Connected);
}

#[test]
fn close_schedules_bounded_reconnects() {
    let mut f = connected();

    for attempt in 1..=5 {
        let directive = f.machine.handle(ChannelEvent::Closed);
        assert_eq!(directive, Directive::Reconnect(Duration::from_millis(3000)));
        assert_eq!(f.machine.attempts(), attempt);
        f.machine.begin_connect();
    }

    assert_eq!(f.machine.handle(ChannelEvent::Closed), Directive::GiveUp);
    assert_eq!(f.machine.attempts(), 5);
    assert_eq!(f.machine.state(), ConnectionState::Disconnected);
}

#[test]
fn successful_open_resets_attempts() {
    let mut f = connected();
    f.machine.handle(ChannelEvent::Closed);
    f.machine.handle(ChannelEvent::Closed);
    assert_eq!(f.machine.attempts(), 2);

    f.machine.begin_connect();
    f.machine.handle(ChannelEvent::Opened);
    assert_eq!(f.machine.attempts(), 0);
}

#[test]
fn reset_attempts_allows_reconnect_after_giving_up() {
    let mut f = connected();
    for _ in 0..5 {
        f.machine.handle(ChannelEvent::Closed);
    }
    assert_eq!(f.machine.handle(ChannelEvent::Closed), Directive::GiveUp);

    f.machine.reset_attempts();
    assert!(matches!(
        f.machine.handle(ChannelEvent::Closed),
        Directive::Reconnect(_)
    ));
}

#[test]
fn error_disconnects_without_scheduling() {
    let mut f = connected();

    let directive = f.machine.handle(ChannelEvent::Errored("reset by peer".into()));
    assert_eq!(directive, Directive::None);
    assert_eq!(f.machine.state(), ConnectionState::Disconnected);
    assert_eq!(f.machine.attempts(), 0);

    // The close that follows owns the reconnect.
    assert!(matches!(
        f.machine.handle(ChannelEvent::Closed),
        Directive::Reconnect(_)
    ));
    assert_eq!(f.subscriber.count(&SubscriberEvent::Connected(false)), 1);
}

#[test]
fn failed_open_does_not_report_disconnect() {
    let mut f = fixture();
    f.machine.begin_connect();
    f.machine.handle(ChannelEvent::Errored("refused".into()));
    f.machine.handle(ChannelEvent::Closed);

    assert_eq!(f.subscriber.count(&SubscriberEvent::Connected(false)), 0);
    assert_eq!(f.machine.attempts(), 1);
}

#[test]
fn stop_reports_disconnect_once() {
    let mut f = connected();
    f.machine.stop();
    f.machine.stop();

    assert_eq!(f.machine.state(), ConnectionState::Disconnected);
    assert_eq!(f.subscriber.count(&SubscriberEvent::Connected(false)), 1);
}

#[test]
fn recent_ids_evicts_oldest() {
    let mut recent = RecentIds::new(2);
    assert!(recent.insert("a"));
    assert!(recent.insert("b"));
    assert!(!recent.insert("a"));

    assert!(recent.insert("c"));
    assert_eq!(recent.len(), 2);
    // "a" was evicted and counts as new again.
    assert!(recent.insert("a"));
    assert!(!recent.insert("c"));
}
