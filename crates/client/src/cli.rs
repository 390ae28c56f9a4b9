// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tend_core::Method;

/// Parse a string that must not be empty or whitespace-only.
fn non_empty_string(s: &str) -> Result<String, String> {
    if s.trim().is_empty() {
        Err("cannot be empty".to_string())
    } else {
        Ok(s.to_string())
    }
}

#[derive(Parser, Debug)]
#[command(name = "tend")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Resilient API and realtime notification client")]
#[command(
    long_about = "Resilient API and realtime notification client.\n\n\
    Mutations are retried with exponential backoff and queued while offline; \
    the realtime channel reconnects on its own."
)]
pub struct Cli {
    /// Config file (default: $TEND_CONFIG or <config dir>/tend/config.toml)
    #[arg(short, long, global = true, value_name = "path")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Connect to the notification channel and print notifications
    #[command(after_help = "\
Examples:
  TEND_TOKEN=... tend listen          Print notifications until Ctrl-C
  tend listen --bell                  Ring the terminal bell on each notification
  tend listen --no-drain              Do not replay the offline queue")]
    Listen {
        /// Ring the terminal bell for new notifications
        #[arg(long)]
        bell: bool,

        /// Do not replay the offline queue when connectivity returns
        #[arg(long)]
        no_drain: bool,
    },

    /// Inspect or replay the offline queue
    #[command(subcommand)]
    Queue(QueueCommand),

    /// Send an API request, queueing mutations if the server is unreachable
    #[command(after_help = "\
Examples:
  tend send post /habits/3/check-ins --data '{\"done\": true}'
  tend send delete /journal/12
  tend send get /goals")]
    Send {
        /// HTTP method (GET, POST, PUT, PATCH, DELETE)
        method: Method,

        /// Endpoint path, relative to the API base URL
        #[arg(value_parser = non_empty_string)]
        endpoint: String,

        /// JSON request body
        #[arg(short, long, value_name = "json")]
        data: Option<String>,
    },

    /// Check API reachability and queue size
    Status,

    /// Print the effective configuration
    Config,
}

#[derive(Subcommand, Debug)]
pub enum QueueCommand {
    /// List queued requests in replay order
    List {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the number of queued requests
    Size,

    /// Remove every queued request
    Clear,

    /// Replay queued requests now
    Drain,
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
