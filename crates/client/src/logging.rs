// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Log output for the `tend` binary.

use tracing_subscriber::EnvFilter;

use crate::env;
use crate::error::{Error, Result};

/// The filter directive to use: `TEND_LOG` wins, then `--verbose`.
pub fn filter_directive(verbose: bool, from_env: Option<String>) -> String {
    match from_env {
        Some(directive) => directive,
        None if verbose => "debug".to_string(),
        None => "info".to_string(),
    }
}

/// Install the global subscriber, writing to stderr so stdout stays
/// clean for command output.
pub fn init(verbose: bool) -> Result<()> {
    let directive = filter_directive(verbose, env::log_filter());
    let filter = EnvFilter::try_new(&directive)
        .map_err(|e| Error::Logging(format!("invalid filter '{}': {}", directive, e)))?;

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .finish();
    tracing::subscriber::set_global_default(subscriber).map_err(|e| Error::Logging(e.to_string()))
}

#[cfg(test)]
#[path = "logging_tests.rs"]
mod tests;
