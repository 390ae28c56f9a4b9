// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Notification records delivered over the realtime channel.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

const DEFAULT_KIND: &str = "info";
const DEFAULT_TITLE: &str = "Notification";
const LOCAL_ID_PREFIX: &str = "local-";

/// Raw `data` of a `notification` frame, as the server sends it.
///
/// Fields are kept as raw JSON so that a value of an unexpected type
/// degrades to its default in [`Notification::normalize`] instead of
/// rejecting the whole frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotificationPayload {
    /// String or numeric id.
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default, rename = "type")]
    pub kind: Option<Value>,
    #[serde(default)]
    pub title: Option<Value>,
    #[serde(default, alias = "body")]
    pub message: Option<Value>,
    /// RFC 3339 timestamp.
    #[serde(default)]
    pub created_at: Option<Value>,
    #[serde(default)]
    pub read: Option<Value>,
    #[serde(default, alias = "url")]
    pub link: Option<Value>,
}

/// A notification in the shape handed to subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    /// Category (e.g. `reminder`, `streak`, `info`).
    pub kind: String,
    pub title: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub read: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

impl Notification {
    /// Builds a notification from a raw payload.
    ///
    /// Numeric ids become strings. A payload without a usable id gets a
    /// local id derived from its content, so a replayed copy maps to the
    /// same id. A missing or unparseable `created_at` falls back to
    /// `received_at`; other fields of the wrong type take their defaults.
    pub fn normalize(payload: NotificationPayload, received_at: DateTime<Utc>) -> Self {
        let id = match &payload.id {
            Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => local_id(&payload),
        };

        let created_at = text(payload.created_at.as_ref())
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or(received_at);

        Notification {
            id,
            kind: non_empty(payload.kind.as_ref()).unwrap_or(DEFAULT_KIND).to_string(),
            title: non_empty(payload.title.as_ref()).unwrap_or(DEFAULT_TITLE).to_string(),
            body: text(payload.message.as_ref()).unwrap_or_default().to_string(),
            created_at,
            read: payload.read.as_ref().and_then(Value::as_bool).unwrap_or(false),
            link: non_empty(payload.link.as_ref()).map(str::to_string),
        }
    }

    /// Whether the id was generated locally rather than sent by the server.
    pub fn has_local_id(&self) -> bool {
        self.id.starts_with(LOCAL_ID_PREFIX)
    }
}

fn text(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str)
}

fn non_empty(value: Option<&Value>) -> Option<&str> {
    text(value).filter(|s| !s.is_empty())
}

/// Content hash of the payload. Fields serialize in declaration order and
/// nested objects with sorted keys, so equal payloads hash equally.
fn local_id(payload: &NotificationPayload) -> String {
    let canonical = serde_json::to_string(payload).unwrap_or_default();
    let hash = Sha256::digest(canonical.as_bytes());
    format!("{}{}", LOCAL_ID_PREFIX, hex::encode(&hash[..8]))
}

#[cfg(test)]
#[path = "notification_tests.rs"]
mod tests;
