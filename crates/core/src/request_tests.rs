// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use chrono::TimeZone;
use serde_json::json;
use yare::parameterized;

fn fixed_time() -> DateTime<Utc> {
    Utc.timestamp_millis_opt(1_700_000_000_123).unwrap()
}

#[parameterized(
    get = { "GET", Method::Get },
    post_lower = { "post", Method::Post },
    put_mixed = { "Put", Method::Put },
    patch = { "PATCH", Method::Patch },
    delete = { "delete", Method::Delete },
)]
fn method_from_str(input: &str, expected: Method) {
    assert_eq!(input.parse::<Method>().unwrap(), expected);
}

#[test]
fn method_from_str_rejects_unknown() {
    let err = "TRACE".parse::<Method>().unwrap_err();
    assert!(matches!(err, Error::InvalidMethod(ref m) if m == "TRACE"));
}

#[test]
fn method_serializes_uppercase() {
    assert_eq!(serde_json::to_string(&Method::Patch).unwrap(), "\"PATCH\"");
    assert_eq!(Method::Delete.to_string(), "DELETE");
}

#[test]
fn only_get_is_not_a_mutation() {
    assert!(!Method::Get.is_mutation());
    assert!(Method::Post.is_mutation());
    assert!(Method::Delete.is_mutation());
}

#[test]
fn ids_are_unique_within_the_same_millisecond() {
    let at = fixed_time();
    let a = generate_request_id("/habits", &at);
    let b = generate_request_id("/habits", &at);
    assert_ne!(a, b);
    assert!(a.starts_with("1700000000123-"));
    assert!(b.starts_with("1700000000123-"));
}

#[test]
fn from_pending_starts_with_zero_retries() {
    let pending = PendingRequest::new(Method::Post, "/journal").with_data(json!({"mood": 4}));
    let queued = QueuedRequest::from_pending(pending.clone(), fixed_time());

    assert_eq!(queued.retries, 0);
    assert_eq!(queued.timestamp, fixed_time());
    assert!(!queued.id.is_empty());
    assert_eq!(queued.to_pending(), pending);
}

#[test]
fn queued_request_wire_format() {
    let pending = PendingRequest::new(Method::Put, "/goals/7").with_data(json!({"done": true}));
    let mut queued = QueuedRequest::from_pending(pending, fixed_time());
    queued.id = "abc".to_string();

    let value = serde_json::to_value(&queued).unwrap();
    assert_eq!(
        value,
        json!({
            "id": "abc",
            "endpoint": "/goals/7",
            "method": "PUT",
            "data": {"done": true},
            "timestamp": 1_700_000_000_123_i64,
            "retries": 0,
        })
    );
}

#[test]
fn queued_request_defaults_missing_data_and_retries() {
    let parsed: QueuedRequest = serde_json::from_value(json!({
        "id": "x",
        "endpoint": "/sleep",
        "method": "DELETE",
        "timestamp": 1_700_000_000_000_i64,
    }))
    .unwrap();

    assert_eq!(parsed.data, Value::Null);
    assert_eq!(parsed.retries, 0);
}
