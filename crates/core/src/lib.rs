// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! tend-core: Shared wire and data types for the tend client.
//!
//! This crate provides the realtime channel protocol, the normalized
//! notification record, and the request types persisted by the offline queue.

pub mod error;
pub mod notification;
pub mod protocol;
pub mod request;

pub use error::{Error, ProtocolError, Result};
pub use notification::{Notification, NotificationPayload};
pub use protocol::{Frame, InboundMessage, OutboundMessage};
pub use request::{Method, PendingRequest, QueuedRequest};
