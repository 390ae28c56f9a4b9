// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Realtime channel protocol messages.
//!
//! Every frame is JSON text of the form `{"type": ..., "data": ...}`.
//! Parsing happens in two steps: text to [`Frame`], then [`Frame`] to
//! [`InboundMessage`] by matching on `type`. An unknown `type` is reported
//! as [`ProtocolError::UnknownType`] rather than guessed at.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ProtocolError;
use crate::notification::NotificationPayload;

/// An untyped frame: the `type` tag plus its raw payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Value,
}

impl Frame {
    pub fn new(kind: impl Into<String>, data: Value) -> Self {
        Frame {
            kind: kind.into(),
            data,
        }
    }

    /// Serializes the frame to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserializes a frame from JSON.
    pub fn from_json(s: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(s).map_err(ProtocolError::Malformed)
    }
}

/// Data of a `connected` frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectedInfo {
    #[serde(default)]
    pub user_id: Option<Value>,
    #[serde(default)]
    pub message: Option<Value>,
}

/// Data of an `unread_count` frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnreadCount {
    pub count: u64,
}

/// Data of a `notification_read` frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReadReceipt {
    #[serde(default)]
    pub notification_id: Option<Value>,
    /// Usually a boolean; kept raw since it is only logged.
    #[serde(default)]
    pub success: Option<Value>,
}

/// Data of an `error` frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerError {
    #[serde(default)]
    pub message: Option<Value>,
    /// String or numeric error code.
    #[serde(default)]
    pub code: Option<Value>,
}

/// Messages received from the notification server.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    /// Server greeting after a successful open.
    Connected(ConnectedInfo),
    /// A new notification for the user.
    Notification(NotificationPayload),
    /// Current number of unread notifications.
    UnreadCount(UnreadCount),
    /// Liveness probe; must be answered with [`OutboundMessage::Pong`].
    Heartbeat,
    /// Acknowledgement of a [`OutboundMessage::MarkRead`].
    NotificationRead(ReadReceipt),
    /// Server-side error report. Does not close the channel.
    Error(ServerError),
}

impl InboundMessage {
    /// Parses a text frame.
    pub fn from_json(text: &str) -> Result<Self, ProtocolError> {
        Self::from_frame(Frame::from_json(text)?)
    }

    /// Interprets an untyped frame by its `type` tag.
    pub fn from_frame(frame: Frame) -> Result<Self, ProtocolError> {
        let Frame { kind, data } = frame;
        match kind.as_str() {
            "connected" => Ok(InboundMessage::Connected(payload(&kind, data)?)),
            "notification" => Ok(InboundMessage::Notification(payload(&kind, data)?)),
            "unread_count" => Ok(InboundMessage::UnreadCount(payload(&kind, data)?)),
            "heartbeat" => Ok(InboundMessage::Heartbeat),
            "notification_read" => Ok(InboundMessage::NotificationRead(payload(&kind, data)?)),
            "error" => Ok(InboundMessage::Error(payload(&kind, data)?)),
            _ => Err(ProtocolError::UnknownType(kind)),
        }
    }

    /// The wire `type` tag of this message.
    pub fn kind(&self) -> &'static str {
        match self {
            InboundMessage::Connected(_) => "connected",
            InboundMessage::Notification(_) => "notification",
            InboundMessage::UnreadCount(_) => "unread_count",
            InboundMessage::Heartbeat => "heartbeat",
            InboundMessage::NotificationRead(_) => "notification_read",
            InboundMessage::Error(_) => "error",
        }
    }
}

/// Deserialize a frame payload; `null` or missing data yields the default.
fn payload<T: DeserializeOwned + Default>(kind: &str, data: Value) -> Result<T, ProtocolError> {
    if data.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(data).map_err(|source| ProtocolError::InvalidPayload {
        kind: kind.to_string(),
        source,
    })
}

/// Messages sent from the client to the notification server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    /// Heartbeat acknowledgement.
    Pong,
    /// Ask the server to mark a notification as read.
    MarkRead { notification_id: String },
}

impl OutboundMessage {
    /// Creates a Pong message.
    pub fn pong() -> Self {
        OutboundMessage::Pong
    }

    /// Creates a MarkRead message.
    pub fn mark_read(notification_id: impl Into<String>) -> Self {
        OutboundMessage::MarkRead {
            notification_id: notification_id.into(),
        }
    }

    /// Serializes the message to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserializes the message from JSON.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
