// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! `tend send`: one request through the send-or-queue path.

use serde_json::Value;
use tend_core::{Method, PendingRequest};

use crate::config::Config;
use crate::drain::Submission;
use crate::error::{Error, Result};

use super::resilient_client;

/// Parse the `--data` argument. No argument means no body.
pub fn parse_body(data: Option<&str>) -> Result<Value> {
    match data {
        None => Ok(Value::Null),
        Some(text) => serde_json::from_str(text).map_err(Error::InvalidBody),
    }
}

pub async fn run(config: &Config, method: Method, endpoint: String, data: Option<String>) -> Result<()> {
    let body = parse_body(data.as_deref())?;
    let request = PendingRequest::new(method, endpoint).with_data(body);
    let client = resilient_client(config)?;

    match client.submit(request).await? {
        Submission::Sent(Value::Null) => {}
        Submission::Sent(value) => {
            let text = serde_json::to_string_pretty(&value).map_err(tend_core::Error::from)?;
            println!("{}", text);
        }
        Submission::Queued(entry) => {
            println!(
                "Server unreachable; queued {} {} as {} ({} in queue)",
                entry.method,
                entry.endpoint,
                entry.id,
                client.queue().size()
            );
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "send_tests.rs"]
mod tests;
