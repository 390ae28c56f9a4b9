// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Request types for deferred HTTP mutations.
//!
//! A [`PendingRequest`] is what the application wants to send. Once it is
//! deferred it becomes a [`QueuedRequest`] with an id, a creation timestamp
//! and a retry counter.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::Error;

/// Process-wide sequence mixed into request ids.
static ID_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// HTTP method of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }

    /// Whether the request changes server state and may be deferred.
    pub fn is_mutation(&self) -> bool {
        !matches!(self, Method::Get)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "PATCH" => Ok(Method::Patch),
            "DELETE" => Ok(Method::Delete),
            _ => Err(Error::InvalidMethod(s.to_string())),
        }
    }
}

/// A request the application wants delivered to the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingRequest {
    /// Path relative to the API base URL (e.g. `/habits/42/check-ins`).
    pub endpoint: String,
    pub method: Method,
    /// JSON body; `null` when the request has none.
    #[serde(default)]
    pub data: Value,
}

impl PendingRequest {
    /// Creates a request without a body.
    pub fn new(method: Method, endpoint: impl Into<String>) -> Self {
        PendingRequest {
            endpoint: endpoint.into(),
            method,
            data: Value::Null,
        }
    }

    /// Attaches a JSON body.
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }
}

/// A request persisted in the offline queue, waiting for replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedRequest {
    /// Opaque unique id; identity of the entry.
    pub id: String,
    pub endpoint: String,
    pub method: Method,
    #[serde(default)]
    pub data: Value,
    /// Creation time, stored as milliseconds since the epoch.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    /// Number of replays that ended in failure.
    #[serde(default)]
    pub retries: u32,
}

impl QueuedRequest {
    /// Wraps a pending request, assigning a fresh id and zero retries.
    pub fn from_pending(pending: PendingRequest, created_at: DateTime<Utc>) -> Self {
        QueuedRequest {
            id: generate_request_id(&pending.endpoint, &created_at),
            endpoint: pending.endpoint,
            method: pending.method,
            data: pending.data,
            timestamp: created_at,
            retries: 0,
        }
    }

    /// The request as it should be sent on replay.
    pub fn to_pending(&self) -> PendingRequest {
        PendingRequest {
            endpoint: self.endpoint.clone(),
            method: self.method,
            data: self.data.clone(),
        }
    }
}

/// Generate a request id.
///
/// Format: `{millis}-{hash}` where hash is the first 12 hex chars of
/// SHA256(timestamp + pid + sequence + endpoint). The sequence keeps ids
/// distinct for requests created within the same millisecond.
pub fn generate_request_id(endpoint: &str, created_at: &DateTime<Utc>) -> String {
    let sequence = ID_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    let input = format!(
        "{}:{}:{}:{}",
        created_at.to_rfc3339_opts(SecondsFormat::Nanos, true),
        std::process::id(),
        sequence,
        endpoint
    );
    let hash = Sha256::digest(input.as_bytes());
    format!("{}-{}", created_at.timestamp_millis(), hex::encode(&hash[..6]))
}

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;
