// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

use thiserror::Error;

use crate::connectivity::ConnectivityError;
use crate::http::HttpError;
use crate::storage::StoreError;

/// Errors surfaced by configuration loading and the `tend` binary.
///
/// The resilience components themselves recover from storage and protocol
/// failures; only setup and explicit commands report errors.
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read config file {}: {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {}: {source}\n  hint: check the TOML syntax and field types", path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("no data directory available\n  hint: set [storage] path in the config file")]
    NoDataDir,

    #[error("invalid JSON body: {0}\n  hint: pass a JSON document, e.g. --data '{{\"done\": true}}'")]
    InvalidBody(#[source] serde_json::Error),

    #[error("failed to initialize logging: {0}")]
    Logging(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Http(#[from] HttpError),

    #[error(transparent)]
    Connectivity(#[from] ConnectivityError),

    #[error(transparent)]
    Core(#[from] tend_core::Error),
}

/// A specialized Result type for tend operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
