// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Offline queue commands.

use tend_core::QueuedRequest;

use crate::config::Config;
use crate::drain::DrainReport;
use crate::error::Result;

use super::{open_queue, resilient_client};

pub fn list(config: &Config, json: bool) -> Result<()> {
    let entries = open_queue(config)?.get_queue();
    if json {
        println!("{}", serde_json::to_string_pretty(&entries).map_err(tend_core::Error::from)?);
        return Ok(());
    }
    if entries.is_empty() {
        println!("Queue is empty");
        return Ok(());
    }
    for entry in &entries {
        println!("{}", format_entry(entry));
    }
    Ok(())
}

pub fn size(config: &Config) -> Result<()> {
    println!("{}", open_queue(config)?.size());
    Ok(())
}

pub fn clear(config: &Config) -> Result<()> {
    let queue = open_queue(config)?;
    let count = queue.size();
    queue.clear();
    println!("Cleared {} queued request(s)", count);
    Ok(())
}

pub async fn drain(config: &Config) -> Result<()> {
    let client = resilient_client(config)?;
    let report = client.drain().await;
    println!("{}", format_report(&report));
    Ok(())
}

/// One line per entry: time, method, endpoint, retries, id.
pub(crate) fn format_entry(entry: &QueuedRequest) -> String {
    let mut line = format!(
        "{}  {:<6} {}",
        entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
        entry.method.as_str(),
        entry.endpoint
    );
    if entry.retries > 0 {
        line.push_str(&format!("  (retries: {})", entry.retries));
    }
    line.push_str(&format!("  [{}]", entry.id));
    line
}

pub(crate) fn format_report(report: &DrainReport) -> String {
    let mut line = format!(
        "Sent {}, failed {}, discarded {}; {} remaining",
        report.sent, report.failed, report.discarded, report.remaining
    );
    if report.interrupted {
        line.push_str(" (stopped: server unreachable)");
    }
    line
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
