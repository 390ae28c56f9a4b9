// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! tend-client: network resilience for the tend API and notification channel.
//!
//! # Main Components
//!
//! - [`backoff::BackoffPolicy`] - exponential delay sequences
//! - [`connectivity::ConnectivityMonitor`] - reachability and waiting for it
//! - [`retry::RetryExecutor`] - runs an operation under a retry policy
//! - [`queue::OfflineQueue`] - persisted requests awaiting replay
//! - [`drain::ResilientClient`] - send-or-queue and queue replay
//! - [`realtime::RealtimeManager`] - the self-reconnecting notification channel
//!
//! ```rust,ignore
//! use tend_client::drain::{ResilientClient, Submission};
//!
//! let client = ResilientClient::new(transport, queue, RetryOptions::default());
//! match client.submit(PendingRequest::new(Method::Post, "/habits/3/check-ins")).await? {
//!     Submission::Sent(body) => println!("{body}"),
//!     Submission::Queued(entry) => println!("queued {}", entry.id),
//! }
//! ```

mod cli;
mod commands;

pub mod backoff;
pub mod config;
pub mod connectivity;
pub mod drain;
pub mod env;
pub mod error;
pub mod http;
pub mod logging;
pub mod queue;
pub mod realtime;
pub mod retry;
pub mod storage;

#[cfg(test)]
mod test_helpers;

pub use cli::{Cli, Command, QueueCommand};
pub use config::Config;
pub use error::{Error, Result};

/// Run a parsed command line.
pub async fn run(cli: Cli) -> Result<()> {
    let config = commands::load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Listen { bell, no_drain } => commands::listen::run(&config, bell, no_drain).await,
        Command::Queue(QueueCommand::List { json }) => commands::queue::list(&config, json),
        Command::Queue(QueueCommand::Size) => commands::queue::size(&config),
        Command::Queue(QueueCommand::Clear) => commands::queue::clear(&config),
        Command::Queue(QueueCommand::Drain) => commands::queue::drain(&config).await,
        Command::Send {
            method,
            endpoint,
            data,
        } => commands::send::run(&config, method, endpoint, data).await,
        Command::Status => commands::status::run(&config).await,
        Command::Config => commands::show_config(&config),
    }
}
